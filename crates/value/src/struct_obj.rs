use crate::key::Key;
use crate::shape::Shape;
use crate::value::Value;

/// Initial `data` capacity for a freshly allocated struct.
pub const STRUCT_BUF: usize = 4;

/// A struct instance: a shape pointer plus the data array that shape
/// indexes into.
pub struct StructObj {
  shape: Shape,
  data: Vec<Value>,
}

impl StructObj {
  pub fn new(root: Shape) -> Self {
    StructObj::with_capacity(root, STRUCT_BUF)
  }

  pub fn with_capacity(root: Shape, capacity: usize) -> Self {
    StructObj {
      shape: root,
      data: Vec::with_capacity(capacity),
    }
  }

  pub fn shape(&self) -> &Shape {
    &self.shape
  }

  /// Reads `key`, returning `nil` if this instance has never had it
  /// assigned.
  pub fn get(&self, key: &Key) -> Value {
    match self.shape.lookup(key) {
      Some(slot) => self.data[slot].clone(),
      None => Value::Nil,
    }
  }

  /// Assigns `key`, advancing this instance's shape if `key` is new.
  pub fn set(&mut self, key: &Key, value: Value) {
    let next = self.shape.advance(key);
    let slot = next.slot_index() as usize;
    if slot >= self.data.len() {
      debug_assert_eq!(slot, self.data.len());
      self.data.push(value);
    } else {
      self.data[slot] = value;
    }
    self.shape = next;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::key::hash_text;

  fn key(text: &'static str) -> Key {
    Key::new(hash_text(text), text)
  }

  #[test]
  fn new_key_advances_shape_and_new_slot() {
    let mut s = StructObj::new(Shape::root());
    s.set(&key("x"), Value::Number(1.0));
    s.set(&key("y"), Value::Number(2.0));
    assert_eq!(s.get(&key("x")).as_number(), Some(1.0));
    assert_eq!(s.get(&key("y")).as_number(), Some(2.0));
    assert!(s.get(&key("z")).is_nil());
  }

  #[test]
  fn reassigning_an_existing_key_keeps_the_shape() {
    let mut s = StructObj::new(Shape::root());
    s.set(&key("x"), Value::Number(1.0));
    let shape_before = s.shape().clone();
    s.set(&key("x"), Value::Number(9.0));
    assert!(Shape::ptr_eq(&shape_before, s.shape()));
    assert_eq!(s.get(&key("x")).as_number(), Some(9.0));
  }

  #[test]
  fn two_structs_with_the_same_key_history_share_a_shape() {
    let root = Shape::root();
    let mut a = StructObj::new(root.clone());
    let mut b = StructObj::new(root.clone());
    a.set(&key("x"), Value::Number(1.0));
    a.set(&key("y"), Value::Number(2.0));
    b.set(&key("x"), Value::Number(3.0));
    b.set(&key("y"), Value::Number(4.0));
    assert!(Shape::ptr_eq(a.shape(), b.shape()));
  }
}
