//! Sequences the recurrence reads from and records into.

use crate::error::{Error, Result};
use crate::graph::Graph;
use std::collections::{BTreeSet, HashMap};

/// A source of per-step input vectors and sink of per-step outputs.
pub trait DataSet<G: Graph> {
    /// Input vector of the next step, or `None` at the end of the sequence.
    fn read_input_vector(&mut self, graph: &G) -> Result<Option<G::Node>>;

    /// Record the output probabilities of the step just compiled.
    fn write_computed_vector(&mut self, vector: G::Node);

    /// Recorded outputs, in step order.
    fn computed_vectors(&self) -> &[G::Node];

    /// Class index the output of `step` should predict.
    fn expected_value(&self, step: usize) -> Result<usize>;

    /// Number of input vectors, when known up front.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}

/// Character vocabulary, sorted for deterministic indices.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    char_to_idx: HashMap<char, usize>,
    idx_to_char: Vec<char>,
}

impl Vocabulary {
    /// Build the vocabulary of the distinct characters of `text`.
    pub fn from_text(text: &str) -> Self {
        let idx_to_char: Vec<char> = text.chars().collect::<BTreeSet<_>>().into_iter().collect();
        let char_to_idx = idx_to_char.iter().enumerate().map(|(i, c)| (*c, i)).collect();
        Self {
            char_to_idx,
            idx_to_char,
        }
    }

    pub fn len(&self) -> usize {
        self.idx_to_char.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idx_to_char.is_empty()
    }

    /// Encode text to indices; characters outside the vocabulary are an error.
    pub fn encode(&self, text: &str) -> Result<Vec<usize>> {
        text.chars()
            .map(|c| {
                self.char_to_idx
                    .get(&c)
                    .copied()
                    .ok_or_else(|| Error::DataSource(format!("character {:?} not in vocabulary", c)))
            })
            .collect()
    }

    /// Decode indices to text.
    pub fn decode(&self, indices: &[usize]) -> String {
        indices
            .iter()
            .filter_map(|&i| self.idx_to_char.get(i))
            .collect()
    }
}

/// Next-character prediction over one string.
///
/// Step `t` reads the one-hot vector of character `t` and is expected to
/// predict character `t + 1`, so a text of `n` characters gives `n - 1` steps.
#[derive(Debug, Clone)]
pub struct CharSequence<N> {
    vocab: Vocabulary,
    indices: Vec<usize>,
    cursor: usize,
    outputs: Vec<N>,
}

impl<N> CharSequence<N> {
    pub fn new(vocab: Vocabulary, text: &str) -> Result<Self> {
        let indices = vocab.encode(text)?;
        Ok(Self {
            vocab,
            indices,
            cursor: 0,
            outputs: Vec::new(),
        })
    }

    /// Sequence over `text` with the vocabulary of `text` itself.
    pub fn from_text(text: &str) -> Result<Self> {
        Self::new(Vocabulary::from_text(text), text)
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Number of steps the sequence yields.
    pub fn steps(&self) -> usize {
        self.indices.len().saturating_sub(1)
    }

    /// Rewind to the first step and drop recorded outputs.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.outputs.clear();
    }
}

impl<G: Graph> DataSet<G> for CharSequence<G::Node> {
    fn read_input_vector(&mut self, graph: &G) -> Result<Option<G::Node>> {
        if self.cursor >= self.steps() {
            return Ok(None);
        }
        let vector = graph.one_hot(self.indices[self.cursor], self.vocab.len())?;
        self.cursor += 1;
        Ok(Some(vector))
    }

    fn write_computed_vector(&mut self, vector: G::Node) {
        self.outputs.push(vector);
    }

    fn computed_vectors(&self) -> &[G::Node] {
        &self.outputs
    }

    fn expected_value(&self, step: usize) -> Result<usize> {
        self.indices
            .get(step + 1)
            .copied()
            .ok_or(Error::MissingExpectedIndex { step })
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.steps())
    }
}
