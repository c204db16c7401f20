use std::fmt;

use beef::lean::Cow;

use crate::ptr::Ptr;

/// An interned identifier. Two keys are equal iff they were produced by the
/// same interning call (or two calls that happened to return the same
/// allocation) — see [`crate::shape`] and the context's key registry, which
/// is the only thing that ever constructs one.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key(Ptr<KeyData>);

pub struct KeyData {
  pub hash: u32,
  pub text: Cow<'static, str>,
}

impl Key {
  /// Only the key registry should call this; everyone else interns through
  /// it so that equal text always yields the same `Key` identity.
  pub fn new(hash: u32, text: impl Into<Cow<'static, str>>) -> Self {
    Key(Ptr::new(KeyData {
      hash,
      text: text.into(),
    }))
  }

  pub fn hash(&self) -> u32 {
    self.0.borrow().hash
  }

  pub fn text(&self) -> Cow<'static, str> {
    self.0.borrow().text.clone()
  }
}

impl fmt::Debug for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Key({:?})", self.0.borrow().text)
  }
}

impl fmt::Display for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.borrow().text)
  }
}

/// djb2, matching the hash the context's key table buckets on.
pub fn hash_text(text: &str) -> u32 {
  let mut hash: u32 = 5381;
  for byte in text.bytes() {
    hash = hash.wrapping_mul(33).wrapping_add(byte as u32);
  }
  hash
}
