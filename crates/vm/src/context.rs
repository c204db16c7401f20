use std::io::Write;
use std::path::Path;

use value::{Closure, Function, Key, Ptr, Shape, StructObj};

use crate::error::RuntimeError;
use crate::gc::GcList;
use crate::key_table::{KeyTable, DEFAULT_BUCKETS};
use crate::thread::{Execution, Thread, INITIAL_STACK_SIZE};

/// Knobs the source hardcodes as `#define`s: thread stack size
/// (`thread.c`), struct data capacity, and key table bucket count
/// (`context.c`). Exposed here instead so an embedder can tune them without
/// forking the crate.
#[derive(Clone, Debug)]
pub struct Config {
  pub initial_stack_size: usize,
  pub initial_struct_capacity: usize,
  pub key_table_buckets: usize,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      initial_stack_size: INITIAL_STACK_SIZE,
      initial_struct_capacity: value::STRUCT_BUF,
      key_table_buckets: DEFAULT_BUCKETS,
    }
  }
}

/// Everything a running BT program needs outside its own call stack: the
/// interned key table, the root of the shape tree every struct starts from,
/// every tracked GC allocation, and a pool of reusable threads. One
/// `Context` per embedding, matching `bt_newcontext`/`bt_freecontext` — this
/// type's `Drop` (via its owned `Rc`s) plays the role of `bt_freecontext`'s
/// GC-list walk.
pub struct Context {
  config: Config,
  keys: KeyTable,
  root_shape: Shape,
  gc: GcList,
  inactive_threads: Vec<Thread>,
}

impl Context {
  pub fn new() -> Self {
    Context::with_config(Config::default())
  }

  pub fn with_config(config: Config) -> Self {
    Context {
      keys: KeyTable::with_buckets(config.key_table_buckets),
      root_shape: Shape::root(),
      gc: GcList::new(),
      inactive_threads: Vec::new(),
      config,
    }
  }

  #[tracing::instrument(level = "debug", skip_all)]
  pub fn compile(&mut self, source: &str) -> Result<Ptr<Function>, emit::ParseError> {
    tracing::debug!(bytes = source.len(), "compiling source");
    let function = emit::compile(source, self)?;
    Ok(Ptr::new(function))
  }

  pub fn compile_file(&mut self, path: impl AsRef<Path>) -> Result<Ptr<Function>, CompileFileError> {
    let source = std::fs::read_to_string(path.as_ref())?;
    Ok(self.compile(&source)?)
  }

  /// A struct at the root shape, tracked by the context's GC list.
  pub fn new_struct(&mut self) -> Ptr<StructObj> {
    let s = Ptr::new(StructObj::with_capacity(
      self.root_shape.clone(),
      self.config.initial_struct_capacity,
    ));
    self.gc.alloc(s)
  }

  /// Tracks an arbitrary heap allocation so it's discoverable from the
  /// context for the lifetime of a collection pass, mirroring the source's
  /// `bt_gcalloc`; `T`'s own `Drop` impl plays the role its destructor
  /// argument did there.
  pub fn gc_alloc<T: std::any::Any>(&mut self, value: T) -> Ptr<T> {
    self.gc.alloc(Ptr::new(value))
  }

  pub fn gc_block_count(&self) -> usize {
    self.gc.len()
  }

  fn acquire_thread(&mut self) -> Thread {
    self
      .inactive_threads
      .pop()
      .unwrap_or_else(|| Thread::new(self.config.initial_stack_size))
  }

  fn release_thread(&mut self, thread: Thread) {
    self.inactive_threads.push(thread);
  }

  /// Executes `function`'s top-level body to completion, synchronously —
  /// this core never suspends mid-call (see the concurrency design notes).
  #[tracing::instrument(level = "debug", skip_all)]
  pub fn call<W: Write>(&mut self, function: &Ptr<Function>, out: &mut W) -> Result<(), RuntimeError> {
    tracing::debug!(function = %function.borrow().name, "executing function");

    let mut thread = self.acquire_thread();
    let registers = function.borrow().registers as usize;
    let closure = Ptr::new(Closure::new(function.clone()));
    thread.push_frame(closure, registers);

    let program: Vec<op::Instruction> = function
      .borrow()
      .program
      .iter()
      .map(|&bits| op::Instruction::from_bits(bits))
      .collect();

    let result = {
      let mut exec = Execution::new(&mut thread, self, out, function);
      op::run(&mut exec, &program, 0)
    };

    thread.pop_frame();
    self.release_thread(thread);

    result.map_err(RuntimeError::from)
  }
}

impl Default for Context {
  fn default() -> Self {
    Context::new()
  }
}

impl emit::KeyInterner for Context {
  fn intern(&mut self, name: &str) -> Key {
    self.keys.intern(name)
  }
}

#[derive(Debug, thiserror::Error)]
pub enum CompileFileError {
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error(transparent)]
  Parse(#[from] emit::ParseError),
}
