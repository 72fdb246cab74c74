//! Parser for formula expressions.
//!
//! Reductions call the graph engine directly; there is no intermediate tree.
//! The result of parsing is the node of the whole expression.
//!
//! Precedence (lowest to highest):
//! 1. +, - (additive, left-associative)
//! 2. *, ·, / (multiplicative, left-associative)
//! 3. unary -, unary +
//! 4. function application, values, parentheses
//!
//! Parentheses, function calls and unary operators may nest at most
//! [`MAX_NESTING`] deep.

use super::lexer::Tokenizer;
use super::token::{Function, Token};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::runtime::{StepContext, SymbolTable};

/// Deepest nesting of parentheses, function calls and unary operators.
pub const MAX_NESTING: usize = 256;

/// Parser state for one formula.
pub struct Parser<'a, G: Graph> {
    tokens: Tokenizer<'a, G::Node>,
    graph: &'a G,
    lookahead: Option<Token<G::Node>>,
    depth: usize,
}

impl<'a, G: Graph> Parser<'a, G> {
    /// Create a parser over `input`, resolving names for the step in `ctx`.
    pub fn new(
        input: &'a str,
        graph: &'a G,
        symbols: &'a SymbolTable<G::Node>,
        ctx: StepContext,
    ) -> Self {
        Self {
            tokens: Tokenizer::new(input, symbols, ctx),
            graph,
            lookahead: None,
            depth: 0,
        }
    }

    /// Peek at the next token without consuming it.
    fn peek(&mut self) -> Result<&Token<G::Node>> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.tokens.next_token()?);
        }
        Ok(self.lookahead.get_or_insert(Token::End))
    }

    /// Consume and return the next token.
    fn next(&mut self) -> Result<Token<G::Node>> {
        match self.lookahead.take() {
            Some(token) => Ok(token),
            None => self.tokens.next_token(),
        }
    }

    fn syntax_error(&self, message: String) -> Error {
        let offset = self.tokens.span().start;
        tracing::warn!(offset, %message, "formula syntax error");
        Error::Syntax { offset, message }
    }

    /// Run `rule` one nesting level deeper.
    fn nested<T>(&mut self, rule: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.syntax_error(format!(
                "expression nests deeper than {} levels",
                MAX_NESTING
            )));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    /// Expect a closing parenthesis.
    fn expect_rparen(&mut self) -> Result<()> {
        match self.next()? {
            Token::RParen => Ok(()),
            t => Err(self.syntax_error(format!("expected ), got {}", t))),
        }
    }

    fn apply(&self, func: Function, arg: &G::Node) -> Result<G::Node> {
        match func {
            Function::Sigmoid => self.graph.sigmoid(arg),
            Function::Tanh => self.graph.tanh(arg),
            Function::Softmax => self.graph.softmax(arg),
            Function::Log => self.graph.log(arg),
            Function::Log2 => self.graph.log2(arg),
        }
    }

    /// Primary: value, parenthesized expression, function application.
    fn parse_primary(&mut self) -> Result<G::Node> {
        match self.next()? {
            Token::Value(node) => Ok(node),

            Token::LParen => self.nested(|p| {
                let inner = p.parse_additive()?;
                p.expect_rparen()?;
                Ok(inner)
            }),

            Token::Function(func) => {
                match self.next()? {
                    Token::LParen => {}
                    t => {
                        return Err(self.syntax_error(format!(
                            "expected ( after {}, got {}",
                            func.name(),
                            t
                        )))
                    }
                }
                let arg = self.nested(|p| {
                    let arg = p.parse_additive()?;
                    p.expect_rparen()?;
                    Ok(arg)
                })?;
                self.apply(func, &arg)
            }

            t => Err(self.syntax_error(format!("unexpected {} in expression", t))),
        }
    }

    /// Unary minus binds to a single factor: `-a*b` is `(-a)*b`.
    fn parse_unary(&mut self) -> Result<G::Node> {
        match self.peek()? {
            Token::Minus => {
                self.next()?;
                let operand = self.nested(Self::parse_unary)?;
                self.graph.neg(&operand)
            }
            Token::Plus => {
                self.next()?;
                self.nested(Self::parse_unary)
            }
            _ => self.parse_primary(),
        }
    }

    /// Parse multiplicative expression (* · /).
    fn parse_multiplicative(&mut self) -> Result<G::Node> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek()? {
                Token::Star | Token::Dot | Token::Slash => self.next()?,
                _ => break,
            };
            let right = self.parse_unary()?;
            left = match op {
                Token::Star => self.graph.mul(&left, &right)?,
                Token::Dot => self.graph.matmul(&left, &right)?,
                Token::Slash => self.graph.div(&left, &right)?,
                _ => unreachable!(),
            };
        }

        Ok(left)
    }

    /// Parse additive expression (+ -).
    fn parse_additive(&mut self) -> Result<G::Node> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek()? {
                Token::Plus | Token::Minus => self.next()?,
                _ => break,
            };
            let right = self.parse_multiplicative()?;
            left = match op {
                Token::Plus => self.graph.add(&left, &right)?,
                Token::Minus => self.graph.sub(&left, &right)?,
                _ => unreachable!(),
            };
        }

        Ok(left)
    }

    /// Parse a whole formula right-hand side; trailing tokens are an error.
    pub fn parse(mut self) -> Result<G::Node> {
        let node = self.parse_additive()?;
        match self.next()? {
            Token::End => Ok(node),
            t => Err(self.syntax_error(format!("unexpected {} after expression", t))),
        }
    }
}

/// Compile `input` into a single graph node.
pub fn compile<G: Graph>(
    graph: &G,
    symbols: &SymbolTable<G::Node>,
    ctx: StepContext,
    input: &str,
) -> Result<G::Node> {
    Parser::new(input, graph, symbols, ctx).parse()
}
