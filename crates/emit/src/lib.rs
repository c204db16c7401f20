//! Single-pass compiler from BT source text to a `bt_value::Function`.
//!
//! There is no AST stage: [`emitter::Emitter`] recognizes the grammar and
//! emits `bt_op::Instruction`s as it goes, using the expression descriptors
//! in [`expr`] and the patch chains in `bt_op::PatchList` to defer anything
//! that can't be resolved until later in the source (forward jumps,
//! not-yet-placed destination registers).

mod emitter;
mod error;
mod expr;
mod interner;
mod lexer;
mod locals;

pub use emitter::compile;
pub use error::ParseError;
pub use interner::KeyInterner;
