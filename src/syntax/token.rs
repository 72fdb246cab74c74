//! Token definitions for the formula lexer.
//!
//! Uses the `logos` crate for the raw scan. Identifiers and numbers come out
//! of logos as text; the [`Tokenizer`](super::Tokenizer) resolves them to
//! graph nodes before the parser sees them.

use logos::Logos;
use std::fmt;

/// Raw lexemes of formula text.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Lexeme {
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    #[token("×")]
    Star,
    #[token("·")]
    Dot,
    #[token("/")]
    #[token("÷")]
    Slash,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    // Only resolvable when the literal text was registered as a constant.
    #[regex(r"[0-9][0-9.eE]*")]
    Number,

    // ASCII, Greek and Latin-1/Extended-A letters, plus subscripts after
    // the first character (`Wᵢ`, `hₜ₋₁`).
    #[regex(r"[a-zA-Zα-ωΑ-ΩÀ-ÖØ-öø-ž][a-zA-Z0-9α-ωΑ-ΩÀ-ÖØ-öø-žₐ-ₜ₀-₉₋ᵢ-ᵪ]*")]
    Ident,
}

/// Built-in unary transforms callable as `f(expr)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sigmoid,
    Tanh,
    Softmax,
    Log,
    Log2,
}

impl Function {
    /// Function named `name`, if it is a built-in.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "σ" | "sigmoid" => Some(Function::Sigmoid),
            "tanh" => Some(Function::Tanh),
            "softmax" => Some(Function::Softmax),
            "log" => Some(Function::Log),
            "log2" => Some(Function::Log2),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Sigmoid => "σ",
            Function::Tanh => "tanh",
            Function::Softmax => "softmax",
            Function::Log => "log",
            Function::Log2 => "log2",
        }
    }
}

/// Resolved tokens handed to the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<N> {
    Plus,
    Minus,
    /// Elementwise product (`*`, `×`)
    Star,
    /// Matrix product (`·`)
    Dot,
    Slash,
    LParen,
    RParen,
    Function(Function),
    /// An identifier or literal already bound to a node
    Value(N),
    End,
}

impl<N> fmt::Display for Token<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Dot => write!(f, "·"),
            Token::Slash => write!(f, "/"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Function(func) => write!(f, "{}", func.name()),
            Token::Value(_) => write!(f, "value"),
            Token::End => write!(f, "end of input"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<(Lexeme, &str)> {
        let mut lexer = Lexeme::lexer(input);
        let mut out = Vec::new();
        while let Some(Ok(lexeme)) = lexer.next() {
            out.push((lexeme, lexer.slice()));
        }
        out
    }

    #[test]
    fn test_gate_formula() {
        let lexemes = lex("σ(Wᵢ·xₜ+Uᵢ·hₜ₋₁+Bᵢ)");
        let texts: Vec<&str> = lexemes.iter().map(|(_, s)| *s).collect();
        assert_eq!(
            texts,
            ["σ", "(", "Wᵢ", "·", "xₜ", "+", "Uᵢ", "·", "hₜ₋₁", "+", "Bᵢ", ")"]
        );
        assert_eq!(lexemes[3].0, Lexeme::Dot);
        assert_eq!(lexemes[8].0, Lexeme::Ident);
    }

    #[test]
    fn test_unicode_operators_normalize() {
        let kinds: Vec<Lexeme> = lex("a × b ÷ c").into_iter().map(|(l, _)| l).collect();
        assert_eq!(
            kinds,
            [Lexeme::Ident, Lexeme::Star, Lexeme::Ident, Lexeme::Slash, Lexeme::Ident]
        );
    }

    #[test]
    fn test_number_and_whitespace() {
        let lexemes = lex(" 2.5e3\t*\r\nĉₜ ");
        assert_eq!(lexemes, [(Lexeme::Number, "2.5e3"), (Lexeme::Star, "*"), (Lexeme::Ident, "ĉₜ")]);
    }

    #[test]
    fn test_unknown_character() {
        let mut lexer = Lexeme::lexer("a % b");
        assert_eq!(lexer.next(), Some(Ok(Lexeme::Ident)));
        assert_eq!(lexer.next(), Some(Err(())));
    }

    #[test]
    fn test_function_names() {
        assert_eq!(Function::from_name("σ"), Some(Function::Sigmoid));
        assert_eq!(Function::from_name("sigmoid"), Some(Function::Sigmoid));
        assert_eq!(Function::from_name("log2"), Some(Function::Log2));
        assert_eq!(Function::from_name("Wy"), None);
    }
}
