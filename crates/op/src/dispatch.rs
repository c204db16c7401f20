use crate::instruction::Instruction;
use crate::opcode::OpCode;

/// What the dispatch loop should do after an opcode handler returns.
pub enum ControlFlow {
  /// Continue at the given absolute program index.
  Goto(usize),
  /// Continue at the instruction immediately after the one just executed.
  Next,
  /// Skip the instruction immediately after the one just executed, then
  /// continue. Used by the compare/test family (`EQUAL`, `LESS`, `LEQUAL`,
  /// `TEST`), which are always followed by an unconditional `JUMP`.
  Skip,
  /// Stop the dispatch loop; the call has returned.
  Return,
}

/// One method per [`OpCode`](crate::OpCode), implemented by whatever owns
/// the registers, constant pool, and struct heap an instruction stream
/// operates over. [`run`] drives a `Handler` to completion.
pub trait Handler {
  type Error;

  fn op_load(&mut self, a: u8, bx: u16) -> Result<ControlFlow, Self::Error>;
  fn op_loadbool(&mut self, a: u8, b: u8, c: u8) -> Result<ControlFlow, Self::Error>;
  fn op_move(&mut self, a: u8, bx: u16) -> Result<ControlFlow, Self::Error>;
  fn op_newstruct(&mut self, a: u8) -> Result<ControlFlow, Self::Error>;
  fn op_getstruct(&mut self, a: u8, b: u8, c: u8) -> Result<ControlFlow, Self::Error>;
  fn op_setstruct(
    &mut self,
    a: u8,
    b: u8,
    kc: bool,
    c: u8,
  ) -> Result<ControlFlow, Self::Error>;
  fn op_add(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, Self::Error>;
  fn op_sub(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, Self::Error>;
  fn op_mul(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, Self::Error>;
  fn op_div(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, Self::Error>;
  fn op_neg(&mut self, a: u8, kc: bool, c: u8) -> Result<ControlFlow, Self::Error>;
  fn op_not(&mut self, a: u8, kc: bool, c: u8) -> Result<ControlFlow, Self::Error>;
  fn op_equal(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, Self::Error>;
  fn op_less(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, Self::Error>;
  fn op_lequal(&mut self, a: u8, kb: bool, b: u8, kc: bool, c: u8) -> Result<ControlFlow, Self::Error>;
  fn op_test(&mut self, a: u8, kc: bool, c: u8) -> Result<ControlFlow, Self::Error>;
  fn op_jump(&mut self, bx: u16) -> Result<ControlFlow, Self::Error>;
  fn op_print(&mut self, kc: bool, c: u8) -> Result<ControlFlow, Self::Error>;
  fn op_ret(&mut self) -> Result<ControlFlow, Self::Error>;
}

/// Error produced by [`run`] itself, as opposed to one raised by the handler.
#[derive(Debug, PartialEq, Eq)]
pub enum DispatchError {
  /// `pc` advanced past the end of `program` without hitting `RETURN`.
  RanOffEnd,
  InvalidOpCode(u8),
}

impl std::fmt::Display for DispatchError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      DispatchError::RanOffEnd => write!(f, "program counter ran past the end of the program"),
      DispatchError::InvalidOpCode(b) => write!(f, "invalid opcode byte {b}"),
    }
  }
}

impl std::error::Error for DispatchError {}

/// Error raised while dispatching: either the loop itself faulted, or the
/// handler did.
#[derive(Debug)]
pub enum RunError<E> {
  Dispatch(DispatchError),
  Handler(E),
}

impl<E: std::fmt::Display> std::fmt::Display for RunError<E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      RunError::Dispatch(e) => write!(f, "{e}"),
      RunError::Handler(e) => write!(f, "{e}"),
    }
  }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for RunError<E> {}

/// Drives `handler` over `program` starting at `pc`, until a `RETURN`
/// instruction or an error stops it.
pub fn run<H: Handler>(
  handler: &mut H,
  program: &[Instruction],
  mut pc: usize,
) -> Result<(), RunError<H::Error>> {
  loop {
    let instr = *program
      .get(pc)
      .ok_or(RunError::Dispatch(DispatchError::RanOffEnd))?;
    let op = instr
      .op()
      .map_err(|e| RunError::Dispatch(DispatchError::InvalidOpCode(e.0)))?;

    let flow = dispatch_one(handler, op, instr).map_err(RunError::Handler)?;

    pc = match flow {
      ControlFlow::Goto(target) => target,
      ControlFlow::Next => pc + 1,
      ControlFlow::Skip => pc + 2,
      ControlFlow::Return => return Ok(()),
    };
  }
}

fn dispatch_one<H: Handler>(
  handler: &mut H,
  op: OpCode,
  i: Instruction,
) -> Result<ControlFlow, H::Error> {
  match op {
    OpCode::Load => handler.op_load(i.a(), i.bx()),
    OpCode::LoadBool => handler.op_loadbool(i.a(), i.b(), i.c()),
    OpCode::Move => handler.op_move(i.a(), i.bx()),
    OpCode::NewStruct => handler.op_newstruct(i.a()),
    OpCode::GetStruct => handler.op_getstruct(i.a(), i.b(), i.c()),
    OpCode::SetStruct => handler.op_setstruct(i.a(), i.b(), i.kc(), i.c()),
    OpCode::Add => handler.op_add(i.a(), i.kb(), i.b(), i.kc(), i.c()),
    OpCode::Sub => handler.op_sub(i.a(), i.kb(), i.b(), i.kc(), i.c()),
    OpCode::Mul => handler.op_mul(i.a(), i.kb(), i.b(), i.kc(), i.c()),
    OpCode::Div => handler.op_div(i.a(), i.kb(), i.b(), i.kc(), i.c()),
    OpCode::Neg => handler.op_neg(i.a(), i.kc(), i.c()),
    OpCode::Not => handler.op_not(i.a(), i.kc(), i.c()),
    OpCode::Equal => handler.op_equal(i.a(), i.kb(), i.b(), i.kc(), i.c()),
    OpCode::Less => handler.op_less(i.a(), i.kb(), i.b(), i.kc(), i.c()),
    OpCode::LEqual => handler.op_lequal(i.a(), i.kb(), i.b(), i.kc(), i.c()),
    OpCode::Test => handler.op_test(i.a(), i.kc(), i.c()),
    OpCode::Jump => handler.op_jump(i.bx()),
    OpCode::Print => handler.op_print(i.kc(), i.c()),
    OpCode::Return => handler.op_ret(),
  }
}
