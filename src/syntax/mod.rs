//! Syntax module: identifiers, lexer, and the graph-building parser.

pub mod ident;
mod lexer;
mod parser;
mod token;

pub use ident::{Identifier, StepRole, CURRENT_STEP, PREVIOUS_STEP};
pub use lexer::Tokenizer;
pub use parser::{compile, Parser, MAX_NESTING};
pub use token::{Function, Lexeme, Token};
