//! The compilation environment: symbol table, step context and formulas.

mod formula;
mod step;
mod symbols;

pub use formula::Formula;
pub use step::StepContext;
pub use symbols::{Key, SymbolTable};
