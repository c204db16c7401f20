use std::io;

use diag::source::Source;
use diag::Report;
use span::Span;
use thiserror::Error;

/// A fatal failure during `Context::call`: arithmetic or comparison on
/// incompatible types, or a struct operation on a non-struct. Unwinds the
/// current call; this core has no catch machinery to recover from one.
#[derive(Debug, Error)]
pub enum RuntimeError {
  #[error("attempt to perform arithmetic on a {0} value")]
  NotANumber(&'static str),
  #[error("attempt to compare a {0} with a {1}")]
  Incomparable(&'static str, &'static str),
  #[error("attempt to index a {0} value")]
  NotAStruct(&'static str),
  #[error("program counter ran past the end of the program")]
  RanOffEnd,
  #[error("invalid opcode byte {0}")]
  InvalidOpCode(u8),
  #[error("write to output failed")]
  Io(#[from] io::Error),
}

impl RuntimeError {
  /// Renders this error as a source-anchored report, paralleling
  /// `emit::ParseError::report`. Registers don't carry a span, so this
  /// always points at the start of the source.
  pub fn report<'a>(&self, source: impl Into<Source<'a>>) -> Report<'a> {
    Report::error()
      .source(source)
      .message(self.to_string())
      .span(Span::default())
      .build()
  }
}

impl From<op::RunError<RuntimeError>> for RuntimeError {
  fn from(e: op::RunError<RuntimeError>) -> Self {
    match e {
      op::RunError::Dispatch(op::DispatchError::RanOffEnd) => RuntimeError::RanOffEnd,
      op::RunError::Dispatch(op::DispatchError::InvalidOpCode(b)) => RuntimeError::InvalidOpCode(b),
      op::RunError::Handler(e) => e,
    }
  }
}
