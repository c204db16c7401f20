use beef::lean::Cow;

use crate::key::Key;
use crate::value::Value;

/// What kind of callable a [`Function`] compiled to. The source declares
/// `Task` and `Gen` for coroutine-flavored bodies but never finishes `CALL`
/// or a yield point for either, so every `Function` this core produces is
/// `Func`; the variants exist so `kind` round-trips through disassembly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FuncKind {
  Func,
  Task,
  Gen,
}

/// A compiled function body: immutable once the code generator hands it
/// back. `program` holds raw instruction words rather than `bt_op::Instruction`
/// so this crate doesn't need to depend on `bt_op` for what is, to `Value`,
/// an opaque blob — decoding belongs to whoever runs it.
#[derive(Debug)]
pub struct Function {
  pub name: Cow<'static, str>,
  pub program: Vec<u32>,
  pub constants: Vec<Value>,
  pub keys: Vec<Key>,
  pub params: u8,
  /// One past the highest register index ever written while compiling this
  /// function; the VM sizes the call frame from this.
  pub registers: u8,
  pub kind: FuncKind,
}

impl Function {
  pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
    Function {
      name: name.into(),
      program: Vec::new(),
      constants: Vec::new(),
      keys: Vec::new(),
      params: 0,
      registers: 0,
      kind: FuncKind::Func,
    }
  }
}

/// A function reference bundled with whatever environment it closed over.
/// Part of the value type system; see [`crate::value::Value::Closure`] for
/// why nothing dispatches through one yet.
pub struct Closure {
  pub function: crate::ptr::Ptr<Function>,
  pub upvalues: Vec<Value>,
}

impl Closure {
  pub fn new(function: crate::ptr::Ptr<Function>) -> Self {
    Closure {
      function,
      upvalues: Vec::new(),
    }
  }
}
