use op::PatchList;
use value::Value;

/// How an expression's value is currently represented while it's being
/// compiled. The generator never builds an AST node for "the value of this
/// expression" — this descriptor, and what instruction (if any) it points
/// at, is the only representation.
pub enum ExpKind {
  /// A compile-time-known literal, not yet written anywhere.
  Const(Value),
  /// Already sitting in a register (e.g. a local).
  Reg(u8),
  /// The instruction at this program index wrote its result with `A` left
  /// open; routing this descriptor back-fills `A`.
  Route(usize),
  True,
  False,
  /// The value is determined by which way a chain of comparisons/tests
  /// branches; `true_list`/`false_list` record the still-open jumps for
  /// each outcome.
  Logic,
}

pub struct ExpInfo {
  pub kind: ExpKind,
  pub true_list: PatchList,
  pub false_list: PatchList,
}

impl ExpInfo {
  pub fn simple(kind: ExpKind) -> Self {
    ExpInfo {
      kind,
      true_list: PatchList::new(),
      false_list: PatchList::new(),
    }
  }

  pub fn logic(true_list: PatchList, false_list: PatchList) -> Self {
    ExpInfo {
      kind: ExpKind::Logic,
      true_list,
      false_list,
    }
  }

  pub fn is_logic(&self) -> bool {
    matches!(self.kind, ExpKind::Logic)
  }
}
