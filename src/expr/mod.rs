//! Expression columns using CEL (Common Expression Language).

mod cel;

pub use cel::{CelContext, CelProgram, cel_value_to_column, compile_cel, evaluate_cel};
