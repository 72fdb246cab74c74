//! Per-step resolution of `ₜ` / `ₜ₋₁` placeholders.

use super::symbols::Key;
use crate::syntax::ident::{Identifier, StepRole, CURRENT_STEP, PREVIOUS_STEP};

/// The step being compiled.
///
/// Resolves step-relative identifiers to typed keys for the symbol table and
/// rewrites template text for diagnostics. Both agree: the rewritten text of
/// an identifier is the `Display` of its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepContext {
    step: usize,
}

impl StepContext {
    pub fn new(step: usize) -> Self {
        Self { step }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Context of the following step.
    pub fn next(&self) -> Self {
        Self::new(self.step + 1)
    }

    /// Key under which `ident` is bound at this step.
    pub fn resolve(&self, ident: &Identifier) -> Key {
        let step = self.step as i64;
        match ident.role {
            StepRole::Fixed => Key::fixed(ident.base.as_str()),
            StepRole::Current => Key::at(ident.base.as_str(), step),
            StepRole::Previous => Key::at(ident.base.as_str(), step - 1),
        }
    }

    /// Key of a single identifier written in template form, e.g. `hₜ₋₁`.
    pub fn key(&self, template: &str) -> Key {
        self.resolve(&Identifier::new(template))
    }

    /// Replace the placeholders of a whole template with step digits.
    ///
    /// `ₜ₋₁` is matched before `ₜ` since the former starts with the latter.
    pub fn rewrite(&self, template: &str) -> String {
        let current = self.step.to_string();
        let previous = (self.step as i64 - 1).to_string();
        template
            .replace(PREVIOUS_STEP, &previous)
            .replace(CURRENT_STEP, &current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_rewrite() {
        let ctx = StepContext::new(3);
        assert_eq!(ctx.rewrite("cₜ = fₜ*cₜ₋₁+iₜ*ĉₜ"), "c3 = f3*c2+i3*ĉ3");
        assert_eq!(StepContext::new(0).rewrite("hₜ₋₁"), "h-1");
    }

    #[test]
    fn test_rewrite_is_repeatable() {
        let ctx = StepContext::new(5);
        let template = "oₜ*tanh(cₜ)";
        assert_eq!(ctx.rewrite(template), ctx.rewrite(template));
    }

    #[test]
    fn test_consecutive_steps_use_disjoint_names() {
        let names = |step: usize| -> HashSet<Key> {
            let ctx = StepContext::new(step);
            ["iₜ", "fₜ", "oₜ", "ĉₜ", "cₜ", "hₜ", "xₜ"]
                .iter()
                .map(|t| ctx.key(t))
                .collect()
        };
        assert!(names(4).is_disjoint(&names(5)));
    }

    #[test]
    fn test_previous_of_next_is_current() {
        let ctx = StepContext::new(2);
        assert_eq!(ctx.next().key("hₜ₋₁"), ctx.key("hₜ"));
    }

    #[test]
    fn test_key_matches_rewritten_text() {
        let ctx = StepContext::new(9);
        for template in ["hₜ₋₁", "xₜ", "Wᵢ"] {
            assert_eq!(ctx.key(template).to_string(), ctx.rewrite(template));
        }
    }
}
