use value::{hash_text, Key};

/// Matches the source's fixed `BT_REG_SIZE`; `Config::key_table_buckets`
/// overrides it.
pub const DEFAULT_BUCKETS: usize = 127;

/// Interned-identifier registry: hash-chained buckets keyed by djb2 mod
/// `buckets.len()`, guaranteeing equal text always resolves to the same
/// `Key` identity for the lifetime of a context.
pub struct KeyTable {
  buckets: Vec<Vec<Key>>,
}

impl KeyTable {
  pub fn new() -> Self {
    KeyTable::with_buckets(DEFAULT_BUCKETS)
  }

  pub fn with_buckets(buckets: usize) -> Self {
    KeyTable {
      buckets: (0..buckets.max(1)).map(|_| Vec::new()).collect(),
    }
  }

  pub fn intern(&mut self, name: &str) -> Key {
    let hash = hash_text(name);
    let len = self.buckets.len();
    let bucket = &mut self.buckets[hash as usize % len];
    if let Some(existing) = bucket.iter().find(|k| k.text() == name) {
      return existing.clone();
    }
    let key = Key::new(hash, name.to_string());
    bucket.push(key.clone());
    key
  }
}

impl Default for KeyTable {
  fn default() -> Self {
    KeyTable::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn interning_equal_text_returns_the_same_identity() {
    let mut t = KeyTable::new();
    let a = t.intern("x");
    let b = t.intern("x");
    assert_eq!(a, b);
  }

  #[test]
  fn interning_distinct_text_returns_distinct_identity() {
    let mut t = KeyTable::new();
    let a = t.intern("x");
    let b = t.intern("y");
    assert_ne!(a, b);
  }

  #[test]
  fn bucket_count_is_configurable() {
    let mut t = KeyTable::with_buckets(1);
    let a = t.intern("x");
    let b = t.intern("y");
    assert_ne!(a, b);
  }
}
