//! Embeddable library surface for BT: compile source into a `Function`,
//! then run it on a `Context`.
//!
//! This crate is a facade over `bt_vm`/`bt_emit`/`bt_value`; the interesting
//! parts live one layer down. The source's C API names each map to a method
//! here: `bt_newcontext` → [`Context::new`], `bt_freecontext` → `Context`'s
//! `Drop`, `bt_compile`/`bt_fcompile` → [`Context::compile`]/
//! [`Context::compile_file`], `bt_call` → [`Context::call`].
//!
//! ```no_run
//! let mut ctx = bt::Context::new();
//! let program = ctx.compile("print 1 + 2").unwrap();
//! ctx.call(&program, &mut std::io::stdout()).unwrap();
//! ```

pub use emit::{KeyInterner, ParseError};
pub use op::{disassemble, ControlFlow, Instruction, OpCode};
pub use value::{Closure, Function, Key, Number, Ptr, Shape, StructObj, Value};
pub use vm::{CompileFileError, Config, Context, RuntimeError};
