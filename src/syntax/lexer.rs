//! Tokenizer that resolves names against the symbol table as it scans.

use super::ident::Identifier;
use super::token::{Function, Lexeme, Token};
use crate::error::{Error, Result};
use crate::runtime::{StepContext, SymbolTable};
use logos::Logos;
use std::ops::Range;

/// Produces [`Token`]s for one formula.
///
/// Identifiers are resolved for the step in `ctx` the moment they are
/// scanned, so the parser only ever sees operators, function names and
/// nodes. A name with no binding is an error, never a silent end of input.
pub struct Tokenizer<'a, N> {
    lexer: logos::Lexer<'a, Lexeme>,
    symbols: &'a SymbolTable<N>,
    ctx: StepContext,
    done: bool,
}

impl<'a, N: Clone> Tokenizer<'a, N> {
    pub fn new(input: &'a str, symbols: &'a SymbolTable<N>, ctx: StepContext) -> Self {
        Self {
            lexer: Lexeme::lexer(input),
            symbols,
            ctx,
            done: false,
        }
    }

    /// Byte range of the most recently scanned token.
    pub fn span(&self) -> Range<usize> {
        self.lexer.span()
    }

    /// Scan the next token. Returns [`Token::End`] once input is exhausted.
    pub fn next_token(&mut self) -> Result<Token<N>> {
        let lexeme = match self.lexer.next() {
            None => return Ok(Token::End),
            Some(Ok(lexeme)) => lexeme,
            Some(Err(())) => {
                let text = self.lexer.slice().to_string();
                let offset = self.lexer.span().start;
                tracing::warn!(%text, offset, "unexpected character in formula");
                return Err(Error::UnexpectedCharacter { text, offset });
            }
        };

        let token = match lexeme {
            Lexeme::Plus => Token::Plus,
            Lexeme::Minus => Token::Minus,
            Lexeme::Star => Token::Star,
            Lexeme::Dot => Token::Dot,
            Lexeme::Slash => Token::Slash,
            Lexeme::LParen => Token::LParen,
            Lexeme::RParen => Token::RParen,
            Lexeme::Number => self.resolve(Identifier::fixed(self.lexer.slice()))?,
            Lexeme::Ident => {
                let text = self.lexer.slice();
                match Function::from_name(text) {
                    Some(func) => Token::Function(func),
                    None => self.resolve(Identifier::new(text))?,
                }
            }
        };
        Ok(token)
    }

    fn resolve(&self, ident: Identifier) -> Result<Token<N>> {
        let key = self.ctx.resolve(&ident);
        match self.symbols.get(&key) {
            Some(node) => Ok(Token::Value(node.clone())),
            None => {
                tracing::warn!(name = %ident, key = %key, "identifier is not bound");
                Err(Error::UndefinedIdentifier {
                    name: ident.to_string(),
                    key: key.to_string(),
                    offset: self.lexer.span().start,
                })
            }
        }
    }
}

/// Yields tokens up to, not including, [`Token::End`]; stops after an error.
impl<'a, N: Clone> Iterator for Tokenizer<'a, N> {
    type Item = Result<Token<N>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(Token::End) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
            Ok(token) => Some(Ok(token)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Key;

    fn symbols() -> SymbolTable<&'static str> {
        let mut symbols = SymbolTable::new();
        symbols.set(Key::fixed("Wᵢ"), "W");
        symbols.set(Key::at("h", 2), "h2");
        symbols.set(Key::at("x", 3), "x3");
        symbols.set(Key::fixed("2"), "two");
        symbols
    }

    #[test]
    fn test_registered_name_is_one_value() {
        let symbols = symbols();
        let tokens: Vec<_> = Tokenizer::new("Wᵢ", &symbols, StepContext::default())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(tokens, vec![Token::Value("W")]);
    }

    #[test]
    fn test_step_relative_names() {
        let symbols = symbols();
        let tokens: Vec<_> = Tokenizer::new("xₜ + hₜ₋₁", &symbols, StepContext::new(3))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(tokens, vec![Token::Value("x3"), Token::Plus, Token::Value("h2")]);
    }

    #[test]
    fn test_unregistered_name_is_an_error() {
        let symbols = symbols();
        let mut tokenizer = Tokenizer::new("Wᵢ·xₜ", &symbols, StepContext::new(4));
        assert_eq!(tokenizer.next_token().unwrap(), Token::Value("W"));
        assert_eq!(tokenizer.next_token().unwrap(), Token::Dot);
        match tokenizer.next_token() {
            Err(Error::UndefinedIdentifier { name, key, offset }) => {
                assert_eq!(name, "xₜ");
                assert_eq!(key, "x4");
                assert_eq!(offset, "Wᵢ·".len());
            }
            other => panic!("expected undefined identifier, got {:?}", other),
        }
    }

    #[test]
    fn test_literals_resolve_only_when_registered() {
        let symbols = symbols();
        let mut tokenizer = Tokenizer::new("2 3", &symbols, StepContext::default());
        assert_eq!(tokenizer.next_token().unwrap(), Token::Value("two"));
        assert!(matches!(
            tokenizer.next_token(),
            Err(Error::UndefinedIdentifier { .. })
        ));
    }

    #[test]
    fn test_functions_and_end() {
        let symbols = symbols();
        let mut tokenizer = Tokenizer::new("tanh ( )", &symbols, StepContext::default());
        assert_eq!(tokenizer.next_token().unwrap(), Token::Function(Function::Tanh));
        assert_eq!(tokenizer.next_token().unwrap(), Token::LParen);
        assert_eq!(tokenizer.next_token().unwrap(), Token::RParen);
        assert_eq!(tokenizer.next_token().unwrap(), Token::End);
        assert_eq!(tokenizer.next_token().unwrap(), Token::End);
    }

    #[test]
    fn test_unexpected_character() {
        let symbols = symbols();
        let err = Tokenizer::new("Wᵢ % 2", &symbols, StepContext::default())
            .collect::<Result<Vec<_>>>()
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedCharacter { offset, .. } if offset == "Wᵢ ".len()));
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_lexical_errors_are_logged() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let symbols = symbols();
        tracing::subscriber::with_default(subscriber, || {
            let mut tokenizer = Tokenizer::new("% q", &symbols, StepContext::default());
            assert!(tokenizer.next_token().is_err());
            let mut tokenizer = Tokenizer::new("q", &symbols, StepContext::default());
            assert!(tokenizer.next_token().is_err());
        });

        let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("unexpected character in formula"), "{}", log);
        assert!(log.contains("identifier is not bound"), "{}", log);
    }
}
