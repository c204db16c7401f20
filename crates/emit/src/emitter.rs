use op::{Builder, Instruction, OpCode, PatchList};
use value::{Function, Key, Value};

use crate::error::ParseError;
use crate::expr::{ExpInfo, ExpKind};
use crate::interner::KeyInterner;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::locals::RegisterFile;

/// Parses and compiles BT source in a single pass: there is no intermediate
/// AST, tokens are consumed and instructions emitted as the grammar is
/// recognized. See the expression-descriptor and patch-chain machinery in
/// [`crate::expr`] and `op::PatchList` for how deferred writes and
/// short-circuit control flow are represented along the way.
pub struct Emitter<'src, 'i, I: KeyInterner> {
  lex: Lexer<'src>,
  cur: Token,
  cur_text: String,
  cur_number: f64,
  cur_number_malformed: bool,
  interner: &'i mut I,
  builder: Builder,
  constants: Vec<Value>,
  keys: Vec<Key>,
  regs: RegisterFile,
}

/// Compiles `src` into a top-level `Function`. `interner` resolves field
/// names used by the source to interned keys.
pub fn compile<I: KeyInterner>(src: &str, interner: &mut I) -> Result<Function, ParseError> {
  let mut e = Emitter::new(src, interner);
  e.program()?;
  Ok(e.finish())
}

impl<'src, 'i, I: KeyInterner> Emitter<'src, 'i, I> {
  fn new(src: &'src str, interner: &'i mut I) -> Self {
    let mut lex = Lexer::new(src);
    let cur = lex.next();
    let mut e = Emitter {
      lex,
      cur,
      cur_text: String::new(),
      cur_number: 0.0,
      cur_number_malformed: false,
      interner,
      builder: Builder::new(),
      constants: Vec::new(),
      keys: Vec::new(),
      regs: RegisterFile::new(),
    };
    e.cache_token_payload();
    e
  }

  fn cache_token_payload(&mut self) {
    match self.cur.kind {
      TokenKind::Id => self.cur_text = self.lex.text().to_string(),
      TokenKind::Number => {
        self.cur_number = self.lex.number();
        self.cur_number_malformed = self.lex.number_malformed();
      }
      _ => {}
    }
  }

  fn bump(&mut self) {
    self.cur = self.lex.next();
    self.cache_token_payload();
  }

  fn check(&self, kind: TokenKind) -> bool {
    self.cur.kind == kind
  }

  fn accept(&mut self, kind: TokenKind) -> bool {
    if self.check(kind) {
      self.bump();
      true
    } else {
      false
    }
  }

  fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
    if self.check(kind) {
      self.bump();
      Ok(())
    } else {
      Err(ParseError::UnexpectedToken {
        line: self.cur.line,
        span: self.cur.span,
        expected: kind,
        found: self.cur.kind,
      })
    }
  }

  fn expect_ident(&mut self) -> Result<String, ParseError> {
    if !self.check(TokenKind::Id) {
      return Err(ParseError::UnexpectedToken {
        line: self.cur.line,
        span: self.cur.span,
        expected: TokenKind::Id,
        found: self.cur.kind,
      });
    }
    let name = self.cur_text.clone();
    self.bump();
    Ok(name)
  }

  fn finish(self) -> Function {
    let mut f = Function::new("<script>");
    f.program = self.builder.finish().into_iter().map(Instruction::to_bits).collect();
    f.constants = self.constants;
    f.keys = self.keys;
    f.params = 0;
    f.registers = self.regs.high_water();
    f
  }

  // ---- constant / key pools -------------------------------------------

  fn add_constant(&mut self, v: Value) -> Result<u8, ParseError> {
    if let Some(i) = self.constants.iter().position(|c| c.value_eq(&v)) {
      return Ok(i as u8);
    }
    let idx = self.constants.len();
    if idx > u8::MAX as usize {
      return Err(ParseError::TooManyRegisters { line: self.cur.line });
    }
    self.constants.push(v);
    Ok(idx as u8)
  }

  fn key_index(&mut self, name: &str) -> u8 {
    let key = self.interner.intern(name);
    if let Some(i) = self.keys.iter().position(|k| *k == key) {
      return i as u8;
    }
    let idx = self.keys.len();
    self.keys.push(key);
    idx as u8
  }

  // ---- expression materialization --------------------------------------

  /// Resolves `e` into an RK operand: `(k, index)`, `k` selecting the
  /// constant pool. Anything that isn't already a constant or a register is
  /// routed into a fresh temporary first.
  fn to_rk(&mut self, e: ExpInfo) -> Result<(bool, u8), ParseError> {
    match &e.kind {
      ExpKind::Const(v) => {
        let v = v.clone();
        Ok((true, self.add_constant(v)?))
      }
      ExpKind::Reg(r) => Ok((false, *r)),
      ExpKind::True => Ok((true, self.add_constant(Value::Bool(true))?)),
      ExpKind::False => Ok((true, self.add_constant(Value::Bool(false))?)),
      ExpKind::Route(_) | ExpKind::Logic => {
        let r = self.reserve()?;
        self.route(e, r);
        Ok((false, r))
      }
    }
  }

  /// Like [`Emitter::to_rk`] but always yields a plain register — used for
  /// operands that can never be a constant-pool reference, such as
  /// `GETSTRUCT`'s base.
  fn to_reg(&mut self, e: ExpInfo) -> Result<u8, ParseError> {
    match &e.kind {
      ExpKind::Reg(r) => Ok(*r),
      _ => {
        let r = self.reserve()?;
        self.route(e, r);
        Ok(r)
      }
    }
  }

  fn reserve(&mut self) -> Result<u8, ParseError> {
    self
      .regs
      .reserve()
      .ok_or(ParseError::TooManyRegisters { line: self.cur.line })
  }

  /// Materializes `e`'s value into register `dst`. See the root-level
  /// design notes for the boolean-materialization epilogue this uses for
  /// `Logic` descriptors.
  fn route(&mut self, e: ExpInfo, dst: u8) {
    match e.kind {
      ExpKind::Const(v) => {
        let idx = self.add_constant(v).unwrap_or(0);
        self.builder.emit(Instruction::abx(OpCode::Load, dst, idx as u16));
      }
      ExpKind::Reg(src) => {
        if src != dst {
          self.builder.emit(Instruction::abx(OpCode::Move, dst, src as u16));
        }
      }
      ExpKind::Route(idx) => self.builder.patch_a(idx, dst),
      ExpKind::True => {
        self.builder.emit(Instruction::abc(OpCode::LoadBool, dst, false, 1, false, 0));
      }
      ExpKind::False => {
        self.builder.emit(Instruction::abc(OpCode::LoadBool, dst, false, 0, false, 0));
      }
      ExpKind::Logic => {
        // Two-instruction epilogue: the false case writes `false` and jumps
        // over the line that would overwrite it with `true`.
        let idx_false = self
          .builder
          .emit(Instruction::abc(OpCode::LoadBool, dst, false, 0, false, 1));
        let idx_true = self
          .builder
          .emit(Instruction::abc(OpCode::LoadBool, dst, false, 1, false, 0));
        e.false_list.resolve(&mut self.builder, idx_false);
        e.true_list.resolve(&mut self.builder, idx_true);
      }
    }
  }

  /// Converts a non-`Logic` descriptor into one, by inserting a `TEST` and
  /// a pair of unconditional jumps (one per outcome) if it isn't one
  /// already.
  fn ensure_logic(&mut self, e: ExpInfo) -> Result<ExpInfo, ParseError> {
    if e.is_logic() {
      return Ok(e);
    }
    let mark = self.regs.next_free();
    let (kc, c) = self.to_rk(e)?;
    self
      .builder
      .emit(Instruction::abc(OpCode::Test, 1, false, 0, kc, c));
    let false_jump = self.builder.emit(Instruction::bx_only(OpCode::Jump, 0));
    let true_jump = self.builder.emit(Instruction::bx_only(OpCode::Jump, 0));
    self.regs.release_to(mark);
    Ok(ExpInfo::logic(
      PatchList::single(true_jump),
      PatchList::single(false_jump),
    ))
  }

  fn emit_compare(
    &mut self,
    op: OpCode,
    sense: u8,
    lhs: ExpInfo,
    rhs: ExpInfo,
  ) -> Result<ExpInfo, ParseError> {
    let mark = self.regs.next_free();
    let (kb, b) = self.to_rk(lhs)?;
    let (kc, c) = self.to_rk(rhs)?;
    self.builder.emit(Instruction::abc(op, sense, kb, b, kc, c));
    let false_jump = self.builder.emit(Instruction::bx_only(OpCode::Jump, 0));
    let true_jump = self.builder.emit(Instruction::bx_only(OpCode::Jump, 0));
    self.regs.release_to(mark);
    Ok(ExpInfo::logic(
      PatchList::single(true_jump),
      PatchList::single(false_jump),
    ))
  }

  fn emit_arith(&mut self, op: OpCode, lhs: ExpInfo, rhs: ExpInfo) -> Result<ExpInfo, ParseError> {
    let mark = self.regs.next_free();
    let (kb, b) = self.to_rk(lhs)?;
    let (kc, c) = self.to_rk(rhs)?;
    self.regs.release_to(mark);
    let idx = self.builder.emit(Instruction::abc(op, 0, kb, b, kc, c));
    Ok(ExpInfo::simple(ExpKind::Route(idx)))
  }

  fn emit_unary(&mut self, op: OpCode, operand: ExpInfo) -> Result<ExpInfo, ParseError> {
    let mark = self.regs.next_free();
    let (kc, c) = self.to_rk(operand)?;
    self.regs.release_to(mark);
    let idx = self.builder.emit(Instruction::abc(op, 0, false, 0, kc, c));
    Ok(ExpInfo::simple(ExpKind::Route(idx)))
  }

  // ---- expressions -------------------------------------------------------

  fn parse_expr(&mut self) -> Result<ExpInfo, ParseError> {
    self.parse_or()
  }

  fn parse_or(&mut self) -> Result<ExpInfo, ParseError> {
    let mut lhs = self.parse_and()?;
    while self.check(TokenKind::Or) {
      self.bump();
      lhs = self.combine_or(lhs)?;
    }
    Ok(lhs)
  }

  fn combine_or(&mut self, lhs: ExpInfo) -> Result<ExpInfo, ParseError> {
    let lhs = self.ensure_logic(lhs)?;
    lhs.false_list.resolve_here(&mut self.builder);
    let rhs = self.parse_and()?;
    let rhs = self.ensure_logic(rhs)?;
    Ok(ExpInfo::logic(lhs.true_list.concat(rhs.true_list), rhs.false_list))
  }

  fn parse_and(&mut self) -> Result<ExpInfo, ParseError> {
    let mut lhs = self.parse_equality()?;
    while self.check(TokenKind::And) {
      self.bump();
      lhs = self.combine_and(lhs)?;
    }
    Ok(lhs)
  }

  fn combine_and(&mut self, lhs: ExpInfo) -> Result<ExpInfo, ParseError> {
    let lhs = self.ensure_logic(lhs)?;
    lhs.true_list.resolve_here(&mut self.builder);
    let rhs = self.parse_equality()?;
    let rhs = self.ensure_logic(rhs)?;
    Ok(ExpInfo::logic(rhs.true_list, lhs.false_list.concat(rhs.false_list)))
  }

  fn parse_equality(&mut self) -> Result<ExpInfo, ParseError> {
    let mut lhs = self.parse_comparison()?;
    loop {
      let sense = match self.cur.kind {
        TokenKind::Eq => 1,
        TokenKind::Ne => 0,
        _ => break,
      };
      self.bump();
      let rhs = self.parse_comparison()?;
      lhs = self.emit_compare(OpCode::Equal, sense, lhs, rhs)?;
    }
    Ok(lhs)
  }

  fn parse_comparison(&mut self) -> Result<ExpInfo, ParseError> {
    let mut lhs = self.parse_additive()?;
    loop {
      let (op, sense) = match self.cur.kind {
        TokenKind::Lt => (OpCode::Less, 1),
        TokenKind::Le => (OpCode::LEqual, 1),
        TokenKind::Gt => (OpCode::LEqual, 0),
        TokenKind::Ge => (OpCode::Less, 0),
        _ => break,
      };
      self.bump();
      let rhs = self.parse_additive()?;
      lhs = self.emit_compare(op, sense, lhs, rhs)?;
    }
    Ok(lhs)
  }

  fn parse_additive(&mut self) -> Result<ExpInfo, ParseError> {
    let mut lhs = self.parse_multiplicative()?;
    loop {
      let op = match self.cur.kind {
        TokenKind::Plus => OpCode::Add,
        TokenKind::Minus => OpCode::Sub,
        _ => break,
      };
      self.bump();
      let rhs = self.parse_multiplicative()?;
      lhs = self.emit_arith(op, lhs, rhs)?;
    }
    Ok(lhs)
  }

  fn parse_multiplicative(&mut self) -> Result<ExpInfo, ParseError> {
    let mut lhs = self.parse_unary()?;
    loop {
      let op = match self.cur.kind {
        TokenKind::Star => OpCode::Mul,
        TokenKind::Slash => OpCode::Div,
        _ => break,
      };
      self.bump();
      let rhs = self.parse_unary()?;
      lhs = self.emit_arith(op, lhs, rhs)?;
    }
    Ok(lhs)
  }

  fn parse_unary(&mut self) -> Result<ExpInfo, ParseError> {
    match self.cur.kind {
      TokenKind::Minus => {
        self.bump();
        let e = self.parse_unary()?;
        self.emit_unary(OpCode::Neg, e)
      }
      TokenKind::Bang => {
        self.bump();
        let e = self.parse_unary()?;
        self.emit_unary(OpCode::Not, e)
      }
      _ => self.parse_postfix(),
    }
  }

  fn parse_postfix(&mut self) -> Result<ExpInfo, ParseError> {
    let mut e = self.parse_atom()?;
    while self.check(TokenKind::Dot) {
      self.bump();
      let field = self.expect_ident()?;
      let key_idx = self.key_index(&field);

      if self.accept(TokenKind::Assign) {
        // A field assignment written inside an expression (e.g. the RHS of
        // a short-circuit `or`) evaluates to the assigned value. Its
        // registers are not reclaimed afterward: the result has to outlive
        // this call, so there's no mark it would be safe to release to.
        let rhs = self.parse_expr()?;
        let base = self.to_reg(e)?;
        let value = self.to_reg(rhs)?;
        self.builder.emit(Instruction::abc(
          OpCode::SetStruct,
          base,
          false,
          key_idx,
          false,
          value,
        ));
        e = ExpInfo::simple(ExpKind::Reg(value));
        continue;
      }

      let mark = self.regs.next_free();
      let base = self.to_reg(e)?;
      let idx = self
        .builder
        .emit(Instruction::abc(OpCode::GetStruct, 0, false, base, false, key_idx));
      self.regs.release_to(mark);
      e = ExpInfo::simple(ExpKind::Route(idx));
    }
    Ok(e)
  }

  fn parse_atom(&mut self) -> Result<ExpInfo, ParseError> {
    match self.cur.kind {
      TokenKind::Number => {
        if self.cur_number_malformed {
          return Err(ParseError::MalformedLiteral {
            line: self.cur.line,
            span: self.cur.span,
          });
        }
        let n = self.cur_number;
        self.bump();
        Ok(ExpInfo::simple(ExpKind::Const(Value::Number(n as value::Number))))
      }
      TokenKind::Nil => {
        self.bump();
        Ok(ExpInfo::simple(ExpKind::Const(Value::Nil)))
      }
      TokenKind::True => {
        self.bump();
        Ok(ExpInfo::simple(ExpKind::True))
      }
      TokenKind::False => {
        self.bump();
        Ok(ExpInfo::simple(ExpKind::False))
      }
      TokenKind::LParen => {
        self.bump();
        let e = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(e)
      }
      TokenKind::LBrace => {
        self.bump();
        self.expect(TokenKind::RBrace)?;
        let r = self.reserve()?;
        let idx = self.builder.emit(Instruction::abc(OpCode::NewStruct, r, false, 0, false, 0));
        // NEWSTRUCT already knows its destination, so there is nothing to
        // route later; hand back a plain register, not `Route`.
        let _ = idx;
        Ok(ExpInfo::simple(ExpKind::Reg(r)))
      }
      TokenKind::Id => {
        let name = self.expect_ident()?;
        match self.regs.resolve(&name) {
          Some(r) => Ok(ExpInfo::simple(ExpKind::Reg(r))),
          None => Err(ParseError::UndeclaredIdentifier {
            line: self.cur.line,
            span: self.cur.span,
            name,
          }),
        }
      }
      _ => Err(ParseError::UnexpectedToken {
        line: self.cur.line,
        span: self.cur.span,
        expected: TokenKind::Number,
        found: self.cur.kind,
      }),
    }
  }

  // ---- statements ----------------------------------------------------

  fn program(&mut self) -> Result<(), ParseError> {
    while !self.check(TokenKind::Eof) {
      self.statement()?;
    }
    self.builder.emit(Instruction::abc(OpCode::Return, 0, false, 0, false, 0));
    Ok(())
  }

  fn block(&mut self) -> Result<(), ParseError> {
    self.expect(TokenKind::LBrace)?;
    self.regs.begin_scope();
    while !self.check(TokenKind::RBrace) {
      self.statement()?;
    }
    self.expect(TokenKind::RBrace)?;
    self.regs.end_scope();
    Ok(())
  }

  fn statement(&mut self) -> Result<(), ParseError> {
    match self.cur.kind {
      TokenKind::Print => {
        self.bump();
        let e = self.parse_expr()?;
        let (kc, c) = self.to_rk(e)?;
        self.builder.emit(Instruction::abc(OpCode::Print, 0, false, 0, kc, c));
        Ok(())
      }
      TokenKind::If => self.if_statement(),
      TokenKind::While => self.while_statement(),
      TokenKind::Semi => {
        self.bump();
        Ok(())
      }
      TokenKind::Id => self.assignment_statement(),
      _ => Err(ParseError::UnexpectedToken {
        line: self.cur.line,
        span: self.cur.span,
        expected: TokenKind::Id,
        found: self.cur.kind,
      }),
    }
  }

  fn assignment_statement(&mut self) -> Result<(), ParseError> {
    let line = self.cur.line;
    let span = self.cur.span;
    let name = self.expect_ident()?;

    if self.check(TokenKind::Dot) {
      let base = self
        .regs
        .resolve(&name)
        .ok_or(ParseError::UndeclaredIdentifier { line, span, name: name.clone() })?;

      let mut fields = Vec::new();
      while self.accept(TokenKind::Dot) {
        let field = self.expect_ident()?;
        fields.push(self.key_index(&field));
      }
      self.expect(TokenKind::Assign)?;
      let value = self.parse_expr()?;

      let mark = self.regs.next_free();
      let mut cur_reg = base;
      for &key_idx in &fields[..fields.len() - 1] {
        let scratch = self.reserve()?;
        self
          .builder
          .emit(Instruction::abc(OpCode::GetStruct, scratch, false, cur_reg, false, key_idx));
        cur_reg = scratch;
      }
      let (kv, cv) = self.to_rk(value)?;
      let last_key = *fields.last().expect("field chain is non-empty");
      self
        .builder
        .emit(Instruction::abc(OpCode::SetStruct, cur_reg, false, last_key, kv, cv));
      self.regs.release_to(mark);
      Ok(())
    } else {
      self.expect(TokenKind::Assign)?;
      let value = self.parse_expr()?;
      let dst = match self.regs.resolve(&name) {
        Some(r) => r,
        None => self
          .regs
          .declare_local(name)
          .ok_or(ParseError::TooManyRegisters { line })?,
      };
      self.route(value, dst);
      Ok(())
    }
  }

  fn if_statement(&mut self) -> Result<(), ParseError> {
    self.expect(TokenKind::If)?;
    self.if_arm()
  }

  /// Compiles one `if`/`elif` arm and, recursively, whatever follows it.
  fn if_arm(&mut self) -> Result<(), ParseError> {
    let cond = self.parse_expr()?;
    let cond = self.ensure_logic(cond)?;
    cond.true_list.resolve_here(&mut self.builder);
    self.block()?;

    if self.check(TokenKind::Elif) || self.check(TokenKind::Else) {
      let end_jump = self.builder.emit(Instruction::bx_only(OpCode::Jump, 0));
      cond.false_list.resolve_here(&mut self.builder);
      if self.accept(TokenKind::Elif) {
        self.if_arm()?;
      } else {
        self.bump(); // Else
        self.block()?;
      }
      PatchList::single(end_jump).resolve_here(&mut self.builder);
    } else {
      cond.false_list.resolve_here(&mut self.builder);
    }
    Ok(())
  }

  fn while_statement(&mut self) -> Result<(), ParseError> {
    self.expect(TokenKind::While)?;
    let start = self.builder.next_index();
    let cond = self.parse_expr()?;
    let cond = self.ensure_logic(cond)?;
    cond.true_list.resolve_here(&mut self.builder);
    self.block()?;
    self.builder.emit(Instruction::bx_only(OpCode::Jump, start as u16));
    cond.false_list.resolve_here(&mut self.builder);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use value::hash_text;

  use super::*;

  struct FakeInterner;

  impl KeyInterner for FakeInterner {
    fn intern(&mut self, name: &str) -> Key {
      Key::new(hash_text(name), name.to_string())
    }
  }

  #[test]
  fn digit_run_glued_to_an_identifier_is_a_malformed_literal() {
    let err = compile("print 3abc", &mut FakeInterner).unwrap_err();
    assert!(matches!(err, ParseError::MalformedLiteral { .. }));
  }

  #[test]
  fn ordinary_numbers_compile() {
    assert!(compile("print 3.25", &mut FakeInterner).is_ok());
  }
}
