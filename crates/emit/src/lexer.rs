use span::Span;

/// The token kinds the scanner hands the code generator, per the language's
/// external lexical contract. Identifier text and numeric values are
/// recovered with [`Lexer::text`] / [`Lexer::number`] rather than carried
/// inline, matching the scanner's `current_text()`/`current_number()` shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
  Eof,
  Id,
  Number,
  Nil,
  True,
  False,
  Func,
  Task,
  If,
  Elif,
  Else,
  While,
  Ret,
  Print,
  Eq,
  Ne,
  Le,
  Ge,
  And,
  Or,
  Plus,
  Minus,
  Star,
  Slash,
  Assign,
  Bang,
  Lt,
  Gt,
  LParen,
  RParen,
  LBrace,
  RBrace,
  Dot,
  Comma,
  Semi,
  LBracket,
  RBracket,
}

#[derive(Clone, Copy, Debug)]
pub struct Token {
  pub kind: TokenKind,
  pub span: Span,
  pub line: u32,
}

/// Hand-rolled scanner over raw source text. Lexing and parsing are not
/// separated into distinct passes elsewhere in this crate — [`super::Emitter`]
/// pulls tokens from this one at a time as it parses and emits — but the
/// lexer itself is a clean, independently testable unit.
pub struct Lexer<'src> {
  src: &'src str,
  bytes: &'src [u8],
  pos: usize,
  line: u32,
  number: f64,
  number_malformed: bool,
  text_span: Span,
}

impl<'src> Lexer<'src> {
  pub fn new(src: &'src str) -> Self {
    Lexer {
      src,
      bytes: src.as_bytes(),
      pos: 0,
      line: 1,
      number: 0.0,
      number_malformed: false,
      text_span: Span { start: 0, end: 0 },
    }
  }

  pub fn line(&self) -> u32 {
    self.line
  }

  /// Valid only immediately after `next()` returned `TokenKind::Number`.
  pub fn number(&self) -> f64 {
    self.number
  }

  /// True if the last `TokenKind::Number` was a digit run glued directly to
  /// an identifier character (`3abc`, `1.5e10`) with no separator — not a
  /// number this language's grammar can parse, but not a token boundary
  /// either, so the scanner swallows the whole run as one malformed token
  /// rather than silently splitting it into a number and an identifier.
  pub fn number_malformed(&self) -> bool {
    self.number_malformed
  }

  /// Valid only immediately after `next()` returned `TokenKind::Id`.
  pub fn text(&self) -> &'src str {
    &self.src[self.text_span.range()]
  }

  fn peek(&self) -> u8 {
    self.bytes.get(self.pos).copied().unwrap_or(0)
  }

  fn peek_at(&self, offset: usize) -> u8 {
    self.bytes.get(self.pos + offset).copied().unwrap_or(0)
  }

  fn advance(&mut self) -> u8 {
    let b = self.peek();
    self.pos += 1;
    b
  }

  fn skip_trivia(&mut self) {
    loop {
      match self.peek() {
        b' ' | b'\t' | b'\r' => {
          self.pos += 1;
        }
        b'\n' => {
          self.pos += 1;
          self.line += 1;
        }
        b'#' => {
          while self.peek() != b'\n' && self.peek() != 0 {
            self.pos += 1;
          }
        }
        _ => break,
      }
    }
  }

  fn scan_number(&mut self) -> TokenKind {
    let start = self.pos;
    while self.peek().is_ascii_digit() {
      self.pos += 1;
    }
    if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
      self.pos += 1;
      while self.peek().is_ascii_digit() {
        self.pos += 1;
      }
    }
    if self.peek().is_ascii_alphabetic() || self.peek() == b'_' {
      while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
        self.pos += 1;
      }
      self.number = 0.0;
      self.number_malformed = true;
      return TokenKind::Number;
    }
    // The digit-run-then-optional-`.`-digit-run grammar above can only ever
    // produce a substring `f64::parse` accepts, so this never actually fails.
    self.number = self.src[start..self.pos].parse().unwrap_or(0.0);
    self.number_malformed = false;
    TokenKind::Number
  }

  fn scan_ident(&mut self) -> TokenKind {
    let start = self.pos;
    while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
      self.pos += 1;
    }
    self.text_span = Span { start, end: self.pos };
    match &self.src[start..self.pos] {
      "nil" => TokenKind::Nil,
      "true" => TokenKind::True,
      "false" => TokenKind::False,
      "func" => TokenKind::Func,
      "task" => TokenKind::Task,
      "if" => TokenKind::If,
      "elif" => TokenKind::Elif,
      "else" => TokenKind::Else,
      "while" => TokenKind::While,
      "ret" => TokenKind::Ret,
      "print" => TokenKind::Print,
      _ => TokenKind::Id,
    }
  }

  pub fn next(&mut self) -> Token {
    self.skip_trivia();
    let line = self.line;
    let start = self.pos;

    if self.pos >= self.bytes.len() {
      return Token {
        kind: TokenKind::Eof,
        span: Span { start, end: start },
        line,
      };
    }

    let c = self.peek();
    let kind = if c.is_ascii_digit() {
      self.scan_number()
    } else if c.is_ascii_alphabetic() || c == b'_' {
      self.scan_ident()
    } else {
      self.advance();
      match c {
        b'+' => TokenKind::Plus,
        b'-' => TokenKind::Minus,
        b'*' => TokenKind::Star,
        b'/' => TokenKind::Slash,
        b'(' => TokenKind::LParen,
        b')' => TokenKind::RParen,
        b'{' => TokenKind::LBrace,
        b'}' => TokenKind::RBrace,
        b'[' => TokenKind::LBracket,
        b']' => TokenKind::RBracket,
        b'.' => TokenKind::Dot,
        b',' => TokenKind::Comma,
        b';' => TokenKind::Semi,
        b'=' if self.peek() == b'=' => {
          self.advance();
          TokenKind::Eq
        }
        b'=' => TokenKind::Assign,
        b'!' if self.peek() == b'=' => {
          self.advance();
          TokenKind::Ne
        }
        b'!' => TokenKind::Bang,
        b'<' if self.peek() == b'=' => {
          self.advance();
          TokenKind::Le
        }
        b'<' => TokenKind::Lt,
        b'>' if self.peek() == b'=' => {
          self.advance();
          TokenKind::Ge
        }
        b'>' => TokenKind::Gt,
        b'&' if self.peek() == b'&' => {
          self.advance();
          TokenKind::And
        }
        b'|' if self.peek() == b'|' => {
          self.advance();
          TokenKind::Or
        }
        _ => {
          // Not a token the language defines; the parser will reject it via
          // an unexpected-token error rather than the lexer panicking.
          TokenKind::Eof
        }
      }
    };

    Token {
      kind,
      span: Span { start, end: self.pos },
      line,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(src: &str) -> Vec<TokenKind> {
    let mut lex = Lexer::new(src);
    let mut out = Vec::new();
    loop {
      let t = lex.next();
      let done = t.kind == TokenKind::Eof;
      out.push(t.kind);
      if done {
        break;
      }
    }
    out
  }

  #[test]
  fn scans_keywords_and_punctuation() {
    use TokenKind::*;
    assert_eq!(
      kinds("if x == 1 { print 1 } else { print 2 }"),
      vec![
        If, Id, Eq, Number, LBrace, Print, Number, RBrace, Else, LBrace, Print, Number, RBrace,
        Eof
      ]
    );
  }

  #[test]
  fn scans_two_char_operators() {
    use TokenKind::*;
    assert_eq!(kinds("a && b || c"), vec![Id, And, Id, Or, Id, Eof]);
    assert_eq!(kinds("a <= b >= c != d"), vec![Id, Le, Id, Ge, Id, Ne, Id, Eof]);
  }

  #[test]
  fn scans_a_decimal_number() {
    let mut lex = Lexer::new("3.25");
    let t = lex.next();
    assert_eq!(t.kind, TokenKind::Number);
    assert_eq!(lex.number(), 3.25);
    assert!(!lex.number_malformed());
  }

  #[test]
  fn digit_run_glued_to_an_identifier_is_malformed() {
    let mut lex = Lexer::new("3abc");
    let t = lex.next();
    assert_eq!(t.kind, TokenKind::Number);
    assert!(lex.number_malformed());
    // The whole run is consumed as one token, not split at the digit/letter
    // boundary.
    assert_eq!(t.span.range(), 0..4);
  }

  #[test]
  fn tracks_line_numbers_across_newlines() {
    let mut lex = Lexer::new("a\nb\n\nc");
    let tokens: Vec<_> = std::iter::from_fn(|| {
      let t = lex.next();
      (t.kind != TokenKind::Eof).then_some(t)
    })
    .collect();
    assert_eq!(tokens.iter().map(|t| t.line).collect::<Vec<_>>(), vec![1, 2, 4]);
  }
}
