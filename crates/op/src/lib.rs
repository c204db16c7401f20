//! BT's bytecode instruction encoding and dispatch.
//!
//! Every instruction is a single 32-bit little-endian word:
//!
//! ```text,ignore
//! bits  0–5   opcode
//! bit   6     kB (1 = B references the constant pool)
//! bit   7     kC (1 = C references the constant pool)
//! bits  8–15  A
//! bits 16–23  B
//! bits 24–31  C
//! bits 16–31  Bx  (overlay of B,C for a single 16-bit operand)
//! ```
//!
//! `JUMP`'s `Bx` is an absolute index into the program. `LOADBOOL`'s `C` is a
//! relative skip count applied to the instruction pointer after the write.
//!
//! This crate only knows about bit-level encoding and control flow; it has no
//! notion of `Value`, registers as storage, or the constant pool. Those live
//! one layer up, in `bt_value` and `bt_emit`/`bt_vm`.

mod builder;
mod dispatch;
#[cfg(feature = "disassembly")]
mod disassembly;
mod instruction;
mod opcode;

pub use builder::{Builder, PatchList};
pub use dispatch::{run, ControlFlow, DispatchError, Handler, RunError};
#[cfg(feature = "disassembly")]
pub use disassembly::disassemble;
pub use instruction::Instruction;
pub use opcode::{InvalidOpCode, OpCode};

#[cfg(test)]
mod tests;
