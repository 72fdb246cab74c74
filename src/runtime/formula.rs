//! Named formulas: `lhs = rhs` templates compiled into the symbol table.

use super::step::StepContext;
use super::symbols::SymbolTable;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::syntax::{compile, Identifier};
use std::fmt;
use std::str::FromStr;

/// A formula template such as `cₜ = fₜ*cₜ₋₁+iₜ*ĉₜ`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    lhs: String,
    rhs: String,
}

impl Formula {
    pub fn new(lhs: impl Into<String>, rhs: impl Into<String>) -> Self {
        Self {
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    /// Parse `lhs = rhs`. The left side must be a single identifier.
    pub fn parse(text: &str) -> Result<Self> {
        let (lhs, rhs) = text
            .split_once('=')
            .ok_or_else(|| Error::MalformedFormula(format!("missing `=` in {:?}", text)))?;
        let lhs = lhs.trim();
        if lhs.is_empty() || lhs.contains(char::is_whitespace) {
            return Err(Error::MalformedFormula(format!(
                "left-hand side {:?} is not an identifier",
                lhs
            )));
        }
        Ok(Self::new(lhs, rhs.trim()))
    }

    pub fn lhs(&self) -> &str {
        &self.lhs
    }

    pub fn rhs(&self) -> &str {
        &self.rhs
    }
}

impl FromStr for Formula {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}

impl<N: Clone> SymbolTable<N> {
    /// Compile `formula` for the step in `ctx` and bind its result.
    ///
    /// Nothing is bound when compilation fails.
    pub fn assign<G: Graph<Node = N>>(
        &mut self,
        graph: &G,
        ctx: StepContext,
        formula: &Formula,
    ) -> Result<N> {
        tracing::debug!(step = ctx.step(), formula = %ctx.rewrite(&formula.to_string()), "compiling");
        let node = compile(graph, self, ctx, &formula.rhs)?;
        self.set(ctx.resolve(&Identifier::new(&formula.lhs)), node.clone());
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TraceGraph;
    use crate::runtime::Key;

    #[test]
    fn test_parse() {
        let formula: Formula = "hₜ = oₜ*tanh(cₜ)".parse().unwrap();
        assert_eq!(formula.lhs(), "hₜ");
        assert_eq!(formula.rhs(), "oₜ*tanh(cₜ)");
        assert_eq!(formula.to_string(), "hₜ = oₜ*tanh(cₜ)");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(Formula::parse("a + b"), Err(Error::MalformedFormula(_))));
        assert!(matches!(Formula::parse(" = b"), Err(Error::MalformedFormula(_))));
        assert!(matches!(Formula::parse("a b = c"), Err(Error::MalformedFormula(_))));
    }

    #[test]
    fn test_assign_binds_step_key() {
        let g = TraceGraph::new();
        let mut symbols = SymbolTable::new();
        symbols.set(Key::at("o", 2), g.parameter("o2", &[]).unwrap());
        symbols.set(Key::at("c", 2), g.parameter("c2", &[]).unwrap());

        let h = symbols
            .assign(&g, StepContext::new(2), &Formula::new("hₜ", "oₜ*tanh(cₜ)"))
            .unwrap();
        assert_eq!(h.to_string(), "(o2 * tanh(c2))");
        assert_eq!(symbols.get(&Key::at("h", 2)), Some(&h));
    }

    #[test]
    fn test_failed_assign_binds_nothing() {
        let g = TraceGraph::new();
        let mut symbols = SymbolTable::new();
        symbols.set(Key::fixed("a"), g.parameter("a", &[]).unwrap());

        let result = symbols.assign(&g, StepContext::default(), &Formula::new("y", "a +"));
        assert!(result.is_err());
        assert!(!symbols.contains(&Key::fixed("y")));
        assert_eq!(symbols.len(), 1);
    }
}
