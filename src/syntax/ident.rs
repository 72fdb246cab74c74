//! Step-relative identifiers.
//!
//! Formula text names per-step values with a subscript suffix: `hₜ` is the
//! hidden state of the current step and `hₜ₋₁` the one of the previous step.
//! Everything else (`Wᵢ`, `Bf`, `2`) is a fixed name shared by all steps.

use std::fmt;

/// Placeholder suffix for the current step.
pub const CURRENT_STEP: &str = "ₜ";

/// Placeholder suffix for the previous step.
pub const PREVIOUS_STEP: &str = "ₜ₋₁";

/// Which step an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepRole {
    /// Same binding at every step
    Fixed,
    /// Binding of the step being compiled
    Current,
    /// Binding of the step before the one being compiled
    Previous,
}

/// An identifier split into its base name and step role.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub base: String,
    pub role: StepRole,
}

impl Identifier {
    /// Split `text` into base and role.
    ///
    /// A bare placeholder such as `ₜ` has no base to attach to and stays a
    /// fixed name.
    pub fn new(text: &str) -> Self {
        let split = |suffix: &str, role| {
            text.strip_suffix(suffix)
                .filter(|base| !base.is_empty())
                .map(|base| Identifier {
                    base: base.to_string(),
                    role,
                })
        };

        split(PREVIOUS_STEP, StepRole::Previous)
            .or_else(|| split(CURRENT_STEP, StepRole::Current))
            .unwrap_or_else(|| Identifier {
                base: text.to_string(),
                role: StepRole::Fixed,
            })
    }

    /// Identifier that is the same at every step.
    pub fn fixed(base: impl Into<String>) -> Self {
        Identifier {
            base: base.into(),
            role: StepRole::Fixed,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            StepRole::Fixed => write!(f, "{}", self.base),
            StepRole::Current => write!(f, "{}{}", self.base, CURRENT_STEP),
            StepRole::Previous => write!(f, "{}{}", self.base, PREVIOUS_STEP),
        }
    }
}
