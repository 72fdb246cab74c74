//! lstm-formula: infix tensor formulas compiled straight into graph nodes.
//!
//! A formula such as `fₜ*cₜ₋₁+iₜ*ĉₜ` is tokenized against a symbol table of
//! live graph nodes and parsed with every reduction calling the graph engine,
//! so the parse result is the node itself. Placeholders `ₜ` and `ₜ₋₁` resolve
//! to the current and previous step, which lets one catalogue of formulas
//! describe every step of a recurrence.
//!
//! # Key pieces
//!
//! - [`syntax`]: identifiers, logos lexer, precedence parser
//! - [`runtime`]: symbol table, step context, formulas
//! - [`graph`]: the engine boundary, with candle and symbolic engines
//! - [`lstm`]: the LSTM cell catalogue, recurrence driver and loss

pub mod error;
pub mod graph;
pub mod lstm;
pub mod runtime;
pub mod syntax;

pub use error::{Error, Result};
pub use graph::{CandleGraph, Graph, TraceGraph, TraceNode};
pub use lstm::{CharSequence, DataSet, Loss, Lstm, LstmConfig, RecurrenceState, Vocabulary};
pub use runtime::{Formula, Key, StepContext, SymbolTable};
pub use syntax::{compile, Identifier, Parser, StepRole, Token, Tokenizer};
