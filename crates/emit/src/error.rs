use diag::source::Source;
use diag::Report;
use span::Span;
use thiserror::Error;

use crate::lexer::TokenKind;

/// A compile-time failure. The source's own `expect()` swallowed these
/// silently; this core surfaces them instead (see root-level design notes).
#[derive(Debug, Error)]
pub enum ParseError {
  #[error("line {line}: expected {expected:?}, found {found:?}")]
  UnexpectedToken {
    line: u32,
    span: Span,
    expected: TokenKind,
    found: TokenKind,
  },
  #[error("line {line}: undeclared identifier `{name}`")]
  UndeclaredIdentifier {
    line: u32,
    span: Span,
    name: String,
  },
  #[error("line {line}: malformed literal")]
  MalformedLiteral { line: u32, span: Span },
  #[error("line {line}: too many locals live at once")]
  TooManyRegisters { line: u32 },
}

impl ParseError {
  pub fn span(&self) -> Span {
    match self {
      ParseError::UnexpectedToken { span, .. } => *span,
      ParseError::UndeclaredIdentifier { span, .. } => *span,
      ParseError::MalformedLiteral { span, .. } => *span,
      ParseError::TooManyRegisters { .. } => Span { start: 0, end: 0 },
    }
  }

  /// Renders this error as a source-anchored [`Report`], for callers that
  /// want `luac`-style diagnostics instead of the bare `Display` message.
  pub fn report<'a>(&self, source: impl Into<Source<'a>>) -> Report<'a> {
    Report::error()
      .source(source)
      .message(self.to_string())
      .span(self.span())
      .build()
  }
}
