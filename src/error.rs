//! Error types for formula compilation and recurrence unrolling.

use thiserror::Error;

/// The main error type for lstm-formula operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Candle tensor operation failed
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// A graph engine other than candle rejected an operation
    #[error("graph error: {0}")]
    Graph(String),

    /// A formula references a name with no binding for the current step
    #[error("undefined identifier `{name}` (looked up as `{key}`) at offset {offset}")]
    UndefinedIdentifier {
        name: String,
        key: String,
        offset: usize,
    },

    /// The lexer met text that belongs to no token class
    #[error("unexpected character `{text}` at offset {offset}")]
    UnexpectedCharacter { text: String, offset: usize },

    /// The token sequence does not match the formula grammar
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// A formula definition is not of the form `lhs = rhs`
    #[error("malformed formula: {0}")]
    MalformedFormula(String),

    /// The data source failed for a reason other than end of sequence
    #[error("data source error: {0}")]
    DataSource(String),

    /// No expected class is known for a recorded step
    #[error("no expected class index for step {step}")]
    MissingExpectedIndex { step: usize },

    /// A data source still holds outputs recorded by an earlier pass
    #[error("data source already holds {recorded} recorded outputs; reset it before reuse")]
    StaleOutputs { recorded: usize },

    /// The data source kept producing input past the step cap
    #[error("sequence exceeds the step limit of {limit}")]
    StepLimit { limit: usize },
}

/// Result type for lstm-formula operations.
pub type Result<T> = std::result::Result<T, Error>;
