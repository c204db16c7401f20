use crate::builder::{Builder, PatchList};
use crate::dispatch::{run, ControlFlow, Handler};
use crate::instruction::Instruction;
use crate::opcode::OpCode;

#[test]
fn abc_round_trips_every_field() {
  let i = Instruction::abc(OpCode::Add, 10, true, 20, false, 30);
  assert_eq!(i.op(), Ok(OpCode::Add));
  assert_eq!(i.a(), 10);
  assert!(i.kb());
  assert_eq!(i.b(), 20);
  assert!(!i.kc());
  assert_eq!(i.c(), 30);
}

#[test]
fn abx_round_trips_a_wide_operand() {
  let i = Instruction::abx(OpCode::Load, 1, 1000);
  assert_eq!(i.a(), 1);
  assert_eq!(i.bx(), 1000);
}

#[test]
fn invalid_opcode_byte_rejected() {
  let i = Instruction::from_bits(0x3F);
  assert!(i.op().is_err());
}

#[test]
fn with_a_patches_only_the_a_field() {
  let i = Instruction::abc(OpCode::Add, 0, true, 1, false, 2);
  let patched = i.with_a(9);
  assert_eq!(patched.a(), 9);
  assert!(patched.kb());
  assert_eq!(patched.b(), 1);
  assert_eq!(patched.c(), 2);
}

/// Minimal handler used to exercise the dispatch loop: it only implements
/// the handful of opcodes a `print 1 + 2; return` style fixture needs, and
/// records what it printed.
struct Recorder {
  printed: Vec<i64>,
  regs: [i64; 4],
}

impl Handler for Recorder {
  type Error = std::convert::Infallible;

  fn op_load(&mut self, a: u8, bx: u16) -> Result<ControlFlow, Self::Error> {
    self.regs[a as usize] = bx as i64;
    Ok(ControlFlow::Next)
  }
  fn op_loadbool(&mut self, _a: u8, _b: u8, _c: u8) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Next)
  }
  fn op_move(&mut self, a: u8, bx: u16) -> Result<ControlFlow, Self::Error> {
    self.regs[a as usize] = self.regs[bx as usize];
    Ok(ControlFlow::Next)
  }
  fn op_newstruct(&mut self, _a: u8) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Next)
  }
  fn op_getstruct(&mut self, _a: u8, _b: u8, _c: u8) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Next)
  }
  fn op_setstruct(
    &mut self,
    _a: u8,
    _b: u8,
    _kc: bool,
    _c: u8,
  ) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Next)
  }
  fn op_add(
    &mut self,
    a: u8,
    _kb: bool,
    b: u8,
    _kc: bool,
    c: u8,
  ) -> Result<ControlFlow, Self::Error> {
    self.regs[a as usize] = self.regs[b as usize] + self.regs[c as usize];
    Ok(ControlFlow::Next)
  }
  fn op_sub(&mut self, _a: u8, _kb: bool, _b: u8, _kc: bool, _c: u8) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Next)
  }
  fn op_mul(&mut self, _a: u8, _kb: bool, _b: u8, _kc: bool, _c: u8) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Next)
  }
  fn op_div(&mut self, _a: u8, _kb: bool, _b: u8, _kc: bool, _c: u8) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Next)
  }
  fn op_neg(&mut self, _a: u8, _kc: bool, _c: u8) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Next)
  }
  fn op_not(&mut self, _a: u8, _kc: bool, _c: u8) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Next)
  }
  fn op_equal(&mut self, _a: u8, _kb: bool, _b: u8, _kc: bool, _c: u8) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Skip)
  }
  fn op_less(&mut self, _a: u8, _kb: bool, _b: u8, _kc: bool, _c: u8) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Skip)
  }
  fn op_lequal(&mut self, _a: u8, _kb: bool, _b: u8, _kc: bool, _c: u8) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Skip)
  }
  fn op_test(&mut self, _a: u8, _kc: bool, _c: u8) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Skip)
  }
  fn op_jump(&mut self, bx: u16) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Goto(bx as usize))
  }
  fn op_print(&mut self, _kc: bool, c: u8) -> Result<ControlFlow, Self::Error> {
    self.printed.push(self.regs[c as usize]);
    Ok(ControlFlow::Next)
  }
  fn op_ret(&mut self) -> Result<ControlFlow, Self::Error> {
    Ok(ControlFlow::Return)
  }
}

#[test]
fn dispatch_runs_a_straight_line_program() {
  let program = vec![
    Instruction::abx(OpCode::Load, 0, 1),
    Instruction::abx(OpCode::Load, 1, 2),
    Instruction::abc(OpCode::Add, 2, false, 0, false, 1),
    Instruction::abc(OpCode::Print, 0, false, false as u8, false, 2),
    Instruction::abc(OpCode::Return, 0, false, 0, false, 0),
  ];
  let mut h = Recorder {
    printed: Vec::new(),
    regs: [0; 4],
  };
  run(&mut h, &program, 0).unwrap();
  assert_eq!(h.printed, vec![3]);
}

#[test]
fn dispatch_follows_an_absolute_jump() {
  let program = vec![
    Instruction::bx_only(OpCode::Jump, 2),
    Instruction::abc(OpCode::Return, 0, false, 0, false, 0), // skipped
    Instruction::abx(OpCode::Load, 0, 9),
    Instruction::abc(OpCode::Print, 0, false, 0, false, 0),
    Instruction::abc(OpCode::Return, 0, false, 0, false, 0),
  ];
  let mut h = Recorder {
    printed: Vec::new(),
    regs: [0; 4],
  };
  run(&mut h, &program, 0).unwrap();
  assert_eq!(h.printed, vec![9]);
}

#[test]
fn dispatch_honors_skip_control_flow() {
  let program = vec![
    Instruction::abc(OpCode::Equal, 1, false, 0, false, 0),
    Instruction::bx_only(OpCode::Jump, 99), // must be skipped
    Instruction::abx(OpCode::Load, 0, 4),
    Instruction::abc(OpCode::Print, 0, false, 0, false, 0),
    Instruction::abc(OpCode::Return, 0, false, 0, false, 0),
  ];
  let mut h = Recorder {
    printed: Vec::new(),
    regs: [0; 4],
  };
  run(&mut h, &program, 0).unwrap();
  assert_eq!(h.printed, vec![4]);
}

#[test]
fn builder_and_patch_list_wire_a_forward_jump() {
  let mut b = Builder::new();
  let jmp = b.emit(Instruction::bx_only(OpCode::Jump, 0));
  let list = PatchList::single(jmp);
  b.emit(Instruction::abc(OpCode::Return, 0, false, 0, false, 0));
  list.resolve_here(&mut b);
  let program = b.finish();
  assert_eq!(program[jmp].bx() as usize, program.len());
}
