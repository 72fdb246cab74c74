//! The LSTM cell written as formulas.
//!
//! See <https://en.wikipedia.org/wiki/Long_short-term_memory#LSTM_with_a_forget_gate>.
//! `·` is the matrix product and `*` the elementwise product.

use crate::runtime::Formula;

pub const INPUT_GATE: (&str, &str) = ("iₜ", "σ(Wᵢ·xₜ+Uᵢ·hₜ₋₁+Bᵢ)");
pub const FORGET_GATE: (&str, &str) = ("fₜ", "σ(Wf·xₜ+Uf·hₜ₋₁+Bf)");
pub const OUTPUT_GATE: (&str, &str) = ("oₜ", "σ(Wₒ·xₜ+Uₒ·hₜ₋₁+Bₒ)");
pub const CANDIDATE: (&str, &str) = ("ĉₜ", "tanh(Wc·xₜ+Uc·hₜ₋₁+Bc)");
pub const CELL_STATE: (&str, &str) = ("cₜ", "fₜ*cₜ₋₁+iₜ*ĉₜ");
pub const HIDDEN_STATE: (&str, &str) = ("hₜ", "oₜ*tanh(cₜ)");

/// Pre-activation output; softmax is applied by the driver.
pub const OUTPUT_PROJECTION: (&str, &str) = ("yₜ", "Wy·hₜ+By");

pub const INPUT: &str = "xₜ";
pub const HIDDEN: &str = "hₜ";
pub const CELL: &str = "cₜ";
pub const PREVIOUS_HIDDEN: &str = "hₜ₋₁";
pub const PREVIOUS_CELL: &str = "cₜ₋₁";

/// Which dimension a parameter axis has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dim {
    Input,
    Hidden,
    Output,
}

/// Learnable parameters and their shapes.
pub const PARAMETERS: [(&str, &[Dim]); 14] = [
    ("Wᵢ", &[Dim::Hidden, Dim::Input]),
    ("Uᵢ", &[Dim::Hidden, Dim::Hidden]),
    ("Bᵢ", &[Dim::Hidden]),
    ("Wf", &[Dim::Hidden, Dim::Input]),
    ("Uf", &[Dim::Hidden, Dim::Hidden]),
    ("Bf", &[Dim::Hidden]),
    ("Wₒ", &[Dim::Hidden, Dim::Input]),
    ("Uₒ", &[Dim::Hidden, Dim::Hidden]),
    ("Bₒ", &[Dim::Hidden]),
    ("Wc", &[Dim::Hidden, Dim::Input]),
    ("Uc", &[Dim::Hidden, Dim::Hidden]),
    ("Bc", &[Dim::Hidden]),
    ("Wy", &[Dim::Output, Dim::Hidden]),
    ("By", &[Dim::Output]),
];

/// The per-step formulas in dependency order: the four gates and the
/// candidate only read `xₜ` and `hₜ₋₁`, the cell state reads them, and the
/// hidden state reads the new cell state.
pub fn step_formulas() -> [Formula; 6] {
    [
        INPUT_GATE,
        FORGET_GATE,
        OUTPUT_GATE,
        CANDIDATE,
        CELL_STATE,
        HIDDEN_STATE,
    ]
    .map(|(lhs, rhs)| Formula::new(lhs, rhs))
}

pub fn output_projection() -> Formula {
    Formula::new(OUTPUT_PROJECTION.0, OUTPUT_PROJECTION.1)
}
