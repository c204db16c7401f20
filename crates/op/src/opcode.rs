/// The 19 instructions of the BT bytecode, see the crate-level docs for the
/// word encoding each instruction's operands are packed into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
  /// `R[A] <- constants[Bx]`
  Load = 0,
  /// `R[A] <- (B != 0)`, then `ip += C`
  LoadBool = 1,
  /// `R[A] <- R[Bx]`
  Move = 2,
  /// `R[A] <- new struct at the root shape`
  NewStruct = 3,
  /// `R[A] <- R[B].field(keys[C])`, nil if absent
  GetStruct = 4,
  /// `R[A].field(keys[B]) <- RK(C)`
  SetStruct = 5,
  Add = 6,
  Sub = 7,
  Mul = 8,
  Div = 9,
  /// `R[A] <- -RK(C)`
  Neg = 10,
  /// `R[A] <- logical-not RK(C)`
  Not = 11,
  /// if `equal(RK(B), RK(C)) == A` then skip the next instruction
  Equal = 12,
  /// if `less(RK(B), RK(C)) == A` then skip the next instruction
  Less = 13,
  /// if `lequal(RK(B), RK(C)) == A` then skip the next instruction
  LEqual = 14,
  /// if `truthy(RK(C)) == A` then skip the next instruction
  Test = 15,
  /// `ip <- Bx` (absolute)
  Jump = 16,
  /// write `RK(C)` to stdout followed by a newline
  Print = 17,
  /// terminates the current call
  Return = 18,
}

impl OpCode {
  pub const COUNT: u8 = 19;

  pub const fn name(self) -> &'static str {
    match self {
      OpCode::Load => "load",
      OpCode::LoadBool => "loadbool",
      OpCode::Move => "move",
      OpCode::NewStruct => "newstruct",
      OpCode::GetStruct => "getstruct",
      OpCode::SetStruct => "setstruct",
      OpCode::Add => "add",
      OpCode::Sub => "sub",
      OpCode::Mul => "mul",
      OpCode::Div => "div",
      OpCode::Neg => "neg",
      OpCode::Not => "not",
      OpCode::Equal => "equal",
      OpCode::Less => "less",
      OpCode::LEqual => "lequal",
      OpCode::Test => "test",
      OpCode::Jump => "jump",
      OpCode::Print => "print",
      OpCode::Return => "return",
    }
  }

  /// `true` for instructions that compare and conditionally skip the next
  /// instruction, rather than writing to `A`.
  pub const fn is_skip(self) -> bool {
    matches!(
      self,
      OpCode::Equal | OpCode::Less | OpCode::LEqual | OpCode::Test
    )
  }

  pub const fn is_jump(self) -> bool {
    matches!(self, OpCode::Jump)
  }
}

impl TryFrom<u8> for OpCode {
  type Error = InvalidOpCode;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    if value >= OpCode::COUNT {
      return Err(InvalidOpCode(value));
    }
    // SAFETY: `OpCode` is `repr(u8)` with discriminants `0..COUNT`, which was
    // just checked above.
    Ok(unsafe { std::mem::transmute::<u8, OpCode>(value) })
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidOpCode(pub u8);

impl std::fmt::Display for InvalidOpCode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "invalid opcode byte {}", self.0)
  }
}

impl std::error::Error for InvalidOpCode {}
