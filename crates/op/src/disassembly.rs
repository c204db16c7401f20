use crate::instruction::Instruction;
use crate::opcode::OpCode;

/// Renders `program` as one line per instruction, Lua-`luac`-style:
/// index, opcode mnemonic, then its operands with `k`-flagged operands
/// marked `K`.
pub fn disassemble(program: &[Instruction]) -> String {
  let mut out = String::new();
  for (idx, instr) in program.iter().enumerate() {
    let Ok(op) = instr.op() else {
      out.push_str(&format!("{idx:>4}  <invalid opcode>\n"));
      continue;
    };
    out.push_str(&format!("{idx:>4}  {:<10}", op.name()));
    out.push_str(&operands(op, *instr));
    out.push('\n');
  }
  out
}

fn operands(op: OpCode, i: Instruction) -> String {
  let rk = |k: bool, v: u8| -> String {
    if k {
      format!("K({v})")
    } else {
      format!("R({v})")
    }
  };

  match op {
    OpCode::Load => format!("R({})  constants[{}]", i.a(), i.bx()),
    OpCode::LoadBool => format!("R({})  {}  +{}", i.a(), i.b() != 0, i.c()),
    OpCode::Move => format!("R({})  R({})", i.a(), i.bx()),
    OpCode::NewStruct => format!("R({})", i.a()),
    OpCode::GetStruct => format!("R({})  R({})  keys[{}]", i.a(), i.b(), i.c()),
    OpCode::SetStruct => format!(
      "R({})  keys[{}]  {}",
      i.a(),
      i.b(),
      rk(i.kc(), i.c())
    ),
    OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Equal | OpCode::Less
    | OpCode::LEqual => format!(
      "R({})  {}  {}",
      i.a(),
      rk(i.kb(), i.b()),
      rk(i.kc(), i.c())
    ),
    OpCode::Neg | OpCode::Not => format!("R({})  {}", i.a(), rk(i.kc(), i.c())),
    OpCode::Test => format!("{}  {}", i.a() != 0, rk(i.kc(), i.c())),
    OpCode::Jump => format!("-> {}", i.bx()),
    OpCode::Print => rk(i.kc(), i.c()),
    OpCode::Return => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn disassembles_a_jump_and_a_load() {
    let program = vec![
      Instruction::abx(OpCode::Load, 0, 3),
      Instruction::bx_only(OpCode::Jump, 5),
      Instruction::abc(OpCode::Return, 0, false, 0, false, 0),
    ];
    let text = disassemble(&program);
    assert!(text.contains("load"));
    assert!(text.contains("-> 5"));
    assert!(text.contains("return"));
  }
}
