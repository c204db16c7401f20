use indexmap::IndexMap;

use crate::key::Key;
use crate::ptr::Ptr;

/// A transition out of a shape: setting the labeling key either lands on an
/// already-owned field, or advances to a child shape that owns one more key.
#[derive(Clone)]
enum Transition {
  Field(usize),
  Child(Shape),
}

struct ShapeNode {
  #[allow(dead_code)]
  parent: Option<Shape>,
  #[allow(dead_code)]
  added_key: Option<Key>,
  slot_index: i32,
  transitions: IndexMap<Key, Transition>,
}

/// A node in the shape tree: the exact ordered set of keys a struct has ever
/// had assigned, shared structurally across every struct with the same
/// history. See the root-level design notes for the tree-shape invariant.
#[derive(Clone)]
pub struct Shape(Ptr<ShapeNode>);

/// Starting transition-table capacity for a freshly created shape node.
pub const INITIAL_CAPACITY: usize = 7;

impl Shape {
  /// The shape with no fields, shared by every freshly created struct.
  pub fn root() -> Shape {
    Shape(Ptr::new(ShapeNode {
      parent: None,
      added_key: None,
      slot_index: -1,
      transitions: IndexMap::with_capacity(INITIAL_CAPACITY),
    }))
  }

  pub fn slot_index(&self) -> i32 {
    self.0.borrow().slot_index
  }

  pub fn ptr_eq(a: &Shape, b: &Shape) -> bool {
    Ptr::ptr_eq(&a.0, &b.0)
  }

  /// Resolves `key` to a data-array slot already owned by this shape, or
  /// `None` if no struct with this shape has ever had `key` assigned.
  pub fn lookup(&self, key: &Key) -> Option<usize> {
    match self.0.borrow().transitions.get(key) {
      Some(Transition::Field(slot)) => Some(*slot),
      // A `Child` entry means `key` would be a *new* field from here, not
      // one this shape already owns — that read is absent, not a slot.
      Some(Transition::Child(_)) | None => None,
    }
  }

  /// Advances from `self` by assigning `key`, returning the shape a struct
  /// transitions to. If `key` is already owned, returns `self` unchanged.
  pub fn advance(&self, key: &Key) -> Shape {
    let existing = self.0.borrow().transitions.get(key).cloned();
    match existing {
      Some(Transition::Field(_)) => self.clone(),
      Some(Transition::Child(child)) => child,
      None => {
        let child = self.new_child(key);
        self
          .0
          .borrow_mut()
          .transitions
          .insert(key.clone(), Transition::Child(child.clone()));
        child
      }
    }
  }

  fn new_child(&self, key: &Key) -> Shape {
    let node = self.0.borrow();
    let slot_index = node.slot_index + 1;
    // Inline every field this shape already owns so the child can resolve
    // them in one step too; a key not yet owned by `self` isn't carried
    // forward, since its eventual child would land at the wrong slot.
    let mut transitions: IndexMap<Key, Transition> = IndexMap::with_capacity(INITIAL_CAPACITY);
    transitions.extend(node.transitions.iter().filter_map(|(k, t)| match t {
      Transition::Field(slot) => Some((k.clone(), Transition::Field(*slot))),
      Transition::Child(_) => None,
    }));
    transitions.insert(key.clone(), Transition::Field(slot_index as usize));
    drop(node);

    Shape(Ptr::new(ShapeNode {
      parent: Some(self.clone()),
      added_key: Some(key.clone()),
      slot_index,
      transitions,
    }))
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
  fn root_has_no_fields() {
    let root = Shape::root();
    assert_eq!(root.slot_index(), -1);
    assert_eq!(root.lookup(&key("x")), None);
  }

  #[test]
  fn advancing_assigns_consecutive_slots() {
    let root = Shape::root();
    let x = root.advance(&key("x"));
    let xy = x.advance(&key("y"));
    assert_eq!(x.slot_index(), 0);
    assert_eq!(xy.slot_index(), 1);
    assert_eq!(xy.lookup(&key("x")), Some(0));
    assert_eq!(xy.lookup(&key("y")), Some(1));
  }

  #[test]
  fn reassigning_an_owned_key_does_not_change_shape() {
    let root = Shape::root();
    let x = root.advance(&key("x"));
    let still_x = x.advance(&key("x"));
    assert!(Shape::ptr_eq(&x, &still_x));
  }

  #[test]
  fn same_key_sequence_from_root_shares_a_shape() {
    let root = Shape::root();
    let a = root.advance(&key("x")).advance(&key("y"));
    let b = root.advance(&key("x")).advance(&key("y"));
    assert!(Shape::ptr_eq(&a, &b));
  }

  #[test]
  fn diverging_keys_produce_diverging_shapes() {
    let root = Shape::root();
    let base = root.advance(&key("x"));
    let via_y = base.advance(&key("y"));
    let via_z = base.advance(&key("z"));
    assert!(!Shape::ptr_eq(&via_y, &via_z));
    assert_eq!(via_y.lookup(&key("z")), None);
  }
}
