//! An LSTM unrolled by compiling its cell formulas at every step.

pub mod cell;
mod dataset;
mod loss;
mod model;

pub use dataset::{CharSequence, DataSet, Vocabulary};
pub use loss::{accumulate, Loss};
pub use model::{Lstm, LstmConfig, RecurrenceState};
