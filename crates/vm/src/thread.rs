use std::io::Write;

use op::{ControlFlow, Handler};
use value::{Closure, Function, Key, Number, Ptr, Value};

use crate::context::Context;
use crate::error::RuntimeError;

/// Matches the source's `thread_new`, which allocates a 32-slot value
/// stack up front.
pub const INITIAL_STACK_SIZE: usize = 32;

/// One call's worth of interpreter state: where its registers start in the
/// owning thread's value stack, and the closure it's executing. `ip` mirrors
/// the source's per-frame instruction pointer; this core's dispatch loop
/// (`op::run`) tracks its own program counter rather than reading it back
/// from here, since nothing in the 19-opcode set ever needs to resume a
/// suspended frame mid-instruction.
pub struct Call {
  pub base: usize,
  pub ip: usize,
  pub closure: Ptr<Closure>,
}

/// A thread of BT execution: a value stack shared by every live call frame,
/// plus the frames themselves, reused across calls rather than allocated
/// fresh each time (the context keeps threads on an inactive list for this
/// reason). Indexing the stack by `usize` offset rather than a raw pointer,
/// as the source does, means growing it never needs to relocate anything a
/// live frame holds onto — `base` stays a valid index across a `resize`.
pub struct Thread {
  pub timer: i32,
  stack: Vec<Value>,
  frames: Vec<Call>,
}

impl Thread {
  pub fn new(initial_stack_size: usize) -> Self {
    Thread {
      timer: 0,
      stack: vec![Value::Nil; initial_stack_size.max(1)],
      frames: Vec::new(),
    }
  }

  fn ensure_capacity(&mut self, needed: usize) {
    if needed > self.stack.len() {
      self.stack.resize(needed.next_power_of_two(), Value::Nil);
    }
  }

  /// Pushes a new frame for `closure`, sized for `registers` registers.
  /// Frames stack contiguously in the shared value stack, the way nested
  /// `CALL`s would if this core had one.
  pub fn push_frame(&mut self, closure: Ptr<Closure>, registers: usize) {
    let base = self.frames.last().map_or(0, |c| c.base + registers);
    self.ensure_capacity(base + registers);
    self.frames.push(Call {
      base,
      ip: 0,
      closure,
    });
  }

  pub fn pop_frame(&mut self) -> Call {
    self.frames.pop().expect("pop_frame with no active call")
  }

  pub(crate) fn current(&self) -> &Call {
    self.frames.last().expect("no active call frame")
  }
}

/// Binds a [`Thread`] frame to the [`Context`] and output sink it needs to
/// run one `Function`'s body; implements [`op::Handler`] to drive the
/// dispatch loop in `Context::call`. Lives only for the duration of one
/// call.
pub struct Execution<'a, W> {
  thread: &'a mut Thread,
  ctx: &'a mut Context,
  out: &'a mut W,
  function: &'a Ptr<Function>,
}

impl<'a, W: Write> Execution<'a, W> {
  pub fn new(
    thread: &'a mut Thread,
    ctx: &'a mut Context,
    out: &'a mut W,
    function: &'a Ptr<Function>,
  ) -> Self {
    Execution {
      thread,
      ctx,
      out,
      function,
    }
  }

  fn base(&self) -> usize {
    self.thread.current().base
  }

  fn reg(&self, idx: u8) -> Value {
    self.thread.stack[self.base() + idx as usize].clone()
  }

  fn set_reg(&mut self, idx: u8, value: Value) {
    let i = self.base() + idx as usize;
    self.thread.stack[i] = value;
  }

  fn constant(&self, idx: usize) -> Value {
    self.function.borrow().constants[idx].clone()
  }

  fn key(&self, idx: u8) -> Key {
    self.function.borrow().keys[idx as usize].clone()
  }

  /// Resolves a `B`/`C`-style operand: the constant pool if its `k` flag is
  /// set, otherwise the current frame's register file.
  fn rk(&self, k: bool, idx: u8) -> Value {
    if k {
      self.constant(idx as usize)
    } else {
      self.reg(idx)
    }
  }

  fn numeric_operands(&self, kb: bool, b: u8, kc: bool, c: u8) -> Result<(Number, Number), RuntimeError> {
    let lhs = self.rk(kb, b);
    let rhs = self.rk(kc, c);
    let l = lhs
      .as_number()
      .ok_or_else(|| RuntimeError::NotANumber(lhs.type_name()))?;
    let r = rhs
      .as_number()
      .ok_or_else(|| RuntimeError::NotANumber(rhs.type_name()))?;
    Ok((l, r))
  }
}

impl<'a, W: Write> Handler for Execution<'a, W> {
  type Error = RuntimeError;

  fn op_load(&mut self, a: u8, bx: u16) -> Result<ControlFlow, RuntimeError> {
    let v = self.constant(bx as usize);
    self.set_reg(a, v);
    Ok(ControlFlow::Next)
  }

  fn op_loadbool(&mut self, a: u8, b: u8, c: u8) -> Result<ControlFlow, RuntimeError> {
    self.set_reg(a, Value::Bool(b != 0));
    // The compiler only ever emits `c == 0` (fall through) or `c == 1`
    // (skip the next instruction) — the boolean-materialization epilogue in
    // `emit::Emitter::route` is the only producer of `LOADBOOL`, and it
    // never needs a larger relative jump. `Skip` already is "ip advances by
    // one more than normal", i.e. exactly `ip += 1` on top of the fetch
    // increment, so this is a faithful, pc-independent implementation of
    // "ip += C" for the only values of C this core ever produces.
    if c != 0 {
      Ok(ControlFlow::Skip)
    } else {
      Ok(ControlFlow::Next)
    }
  }

  fn op_move(&mut self, a: u8, bx: u16) -> Result<ControlFlow, RuntimeError> {
    let v = self.reg(bx as u8);
    self.set_reg(a, v);
    Ok(ControlFlow::Next)
  }

  fn op_newstruct(&mut self, a: u8) -> Result<ControlFlow, RuntimeError> {
    let s = self.ctx.new_struct();
    self.set_reg(a, Value::Struct(s));
    Ok(ControlFlow::Next)
  }

  fn op_getstruct(&mut self, a: u8, b: u8, c: u8) -> Result<ControlFlow, RuntimeError> {
    let base = self.reg(b);
    let s = base
      .as_struct()
      .ok_or_else(|| RuntimeError::NotAStruct(base.type_name()))?;
    let key = self.key(c);
    let v = s.borrow().get(&key);
    self.set_reg(a, v);
    Ok(ControlFlow::Next)
  }

  fn op_setstruct(&mut self, a: u8, b: u8, kc: bool, c: u8) -> Result<ControlFlow, RuntimeError> {
    let base = self.reg(a);
    let s = base
      .as_struct()
      .ok_or_else(|| RuntimeError::NotAStruct(base.type_name()))?
      .clone();
    let key = self.key(b);
    let value = self.rk(kc, c);
    s.borrow_mut().set(&key, value);
    Ok(ControlFlow::Next)
  }

  fn op_add(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, RuntimeError> {
    let (l, r) = self.numeric_operands(kb, b, kc, c)?;
    self.set_reg(a, Value::Number(l + r));
    Ok(ControlFlow::Next)
  }

  fn op_sub(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, RuntimeError> {
    let (l, r) = self.numeric_operands(kb, b, kc, c)?;
    self.set_reg(a, Value::Number(l - r));
    Ok(ControlFlow::Next)
  }

  fn op_mul(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, RuntimeError> {
    let (l, r) = self.numeric_operands(kb, b, kc, c)?;
    self.set_reg(a, Value::Number(l * r));
    Ok(ControlFlow::Next)
  }

  fn op_div(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, RuntimeError> {
    let (l, r) = self.numeric_operands(kb, b, kc, c)?;
    self.set_reg(a, Value::Number(l / r));
    Ok(ControlFlow::Next)
  }

  fn op_neg(&mut self, a: u8, kc: bool, c: u8) -> Result<ControlFlow, RuntimeError> {
    let v = self.rk(kc, c);
    let n = v
      .as_number()
      .ok_or_else(|| RuntimeError::NotANumber(v.type_name()))?;
    self.set_reg(a, Value::Number(-n));
    Ok(ControlFlow::Next)
  }

  fn op_not(&mut self, a: u8, kc: bool, c: u8) -> Result<ControlFlow, RuntimeError> {
    let v = self.rk(kc, c);
    self.set_reg(a, Value::Bool(!v.truthy()));
    Ok(ControlFlow::Next)
  }

  fn op_equal(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, RuntimeError> {
    let lhs = self.rk(kb, b);
    let rhs = self.rk(kc, c);
    let sense = u8::from(lhs.value_eq(&rhs));
    Ok(skip_if(sense == a))
  }

  fn op_less(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, RuntimeError> {
    let lhs = self.rk(kb, b);
    let rhs = self.rk(kc, c);
    let l = lhs
      .as_number()
      .ok_or_else(|| RuntimeError::Incomparable(lhs.type_name(), rhs.type_name()))?;
    let r = rhs
      .as_number()
      .ok_or_else(|| RuntimeError::Incomparable(lhs.type_name(), rhs.type_name()))?;
    Ok(skip_if(u8::from(l < r) == a))
  }

  fn op_lequal(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, RuntimeError> {
    let lhs = self.rk(kb, b);
    let rhs = self.rk(kc, c);
    let l = lhs
      .as_number()
      .ok_or_else(|| RuntimeError::Incomparable(lhs.type_name(), rhs.type_name()))?;
    let r = rhs
      .as_number()
      .ok_or_else(|| RuntimeError::Incomparable(lhs.type_name(), rhs.type_name()))?;
    Ok(skip_if(u8::from(l <= r) == a))
  }

  fn op_test(&mut self, a: u8, kc: bool, c: u8) -> Result<ControlFlow, RuntimeError> {
    let v = self.rk(kc, c);
    Ok(skip_if(u8::from(v.truthy()) == a))
  }

  fn op_jump(&mut self, bx: u16) -> Result<ControlFlow, RuntimeError> {
    Ok(ControlFlow::Goto(bx as usize))
  }

  fn op_print(&mut self, kc: bool, c: u8) -> Result<ControlFlow, RuntimeError> {
    let v = self.rk(kc, c);
    writeln!(self.out, "{v}")?;
    Ok(ControlFlow::Next)
  }

  fn op_ret(&mut self) -> Result<ControlFlow, RuntimeError> {
    Ok(ControlFlow::Return)
  }
}

fn skip_if(cond: bool) -> ControlFlow {
  if cond {
    ControlFlow::Skip
  } else {
    ControlFlow::Next
  }
}
