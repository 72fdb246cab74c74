//! The compiler's environment: step-resolved names bound to graph nodes.

use indexmap::IndexMap;
use std::fmt;

/// A step-resolved symbol name.
///
/// `Key::at("h", 3)` is the hidden state of step 3; `Key::fixed("Wy")` is a
/// parameter shared by all steps. The step of a previous-step reference at
/// step 0 is `-1`, which is where the initial state lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    name: String,
    step: Option<i64>,
}

impl Key {
    /// Key of a name that does not depend on the step.
    pub fn fixed(name: impl Into<String>) -> Self {
        Key {
            name: name.into(),
            step: None,
        }
    }

    /// Key of a name bound at a given step.
    pub fn at(name: impl Into<String>, step: i64) -> Self {
        Key {
            name: name.into(),
            step: Some(step),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step(&self) -> Option<i64> {
        self.step
    }
}

/// Renders the same text the step rewriter produces, e.g. `h-1` or `x12`.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(step) => write!(f, "{}{}", self.name, step),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Mapping from symbol keys to graph nodes.
///
/// Bindings are never removed. Each step writes under its own keys, so a
/// later step supersedes an earlier one by adding entries, not by replacing
/// them.
#[derive(Debug, Clone)]
pub struct SymbolTable<N> {
    bindings: IndexMap<Key, N>,
}

impl<N> SymbolTable<N> {
    pub fn new() -> Self {
        Self {
            bindings: IndexMap::new(),
        }
    }

    /// Bind `key` to `node`, replacing any previous binding.
    pub fn set(&mut self, key: Key, node: N) {
        self.bindings.insert(key, node);
    }

    /// Look up the node bound to `key`.
    pub fn get(&self, key: &Key) -> Option<&N> {
        self.bindings.get(key)
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.bindings.contains_key(key)
    }

    /// Number of distinct keys ever bound.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<N> Default for SymbolTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut symbols = SymbolTable::new();
        symbols.set(Key::fixed("a"), 1);
        symbols.set(Key::fixed("a"), 2);

        assert_eq!(symbols.get(&Key::fixed("a")), Some(&2));
        assert_eq!(symbols.len(), 1);
    }

    #[test]
    fn test_steps_are_distinct_keys() {
        let mut symbols = SymbolTable::new();
        symbols.set(Key::at("h", 0), "h0");
        symbols.set(Key::at("h", 1), "h1");
        symbols.set(Key::fixed("h"), "h");

        assert_eq!(symbols.len(), 3);
        assert_eq!(symbols.get(&Key::at("h", 0)), Some(&"h0"));
        assert!(!symbols.contains(&Key::at("h", 2)));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::at("h", -1).to_string(), "h-1");
        assert_eq!(Key::at("ĉ", 7).to_string(), "ĉ7");
        assert_eq!(Key::fixed("Wᵢ").to_string(), "Wᵢ");
    }
}
