//! Diagnostic reporting for BT: pretty-printed, single-line-or-multi-line
//! source snippets attached to parse and runtime errors.

pub mod report;
mod snippet;
pub mod source;
mod style;
mod util;

pub use report::Report;
pub use source::Source;
