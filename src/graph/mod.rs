//! Computation graph engines.
//!
//! The compiler never computes anything itself: every reduction of the
//! formula grammar becomes one call on a [`Graph`]. Nodes are opaque handles
//! owned by the engine.

pub mod candle;
pub mod trace;

pub use self::candle::CandleGraph;
pub use self::trace::{TraceGraph, TraceNode, TraceOp};

use crate::error::{Error, Result};

/// Node constructors the compiler and the recurrence need from an engine.
///
/// Every constructor may fail (shape mismatch, device error); failures abort
/// the formula being compiled.
pub trait Graph {
    /// Handle to a node. Cloning a handle never copies the node.
    type Node: Clone;

    /// A named learnable tensor of the given shape.
    fn parameter(&self, name: &str, shape: &[usize]) -> Result<Self::Node>;

    /// A constant tensor. An empty `shape` makes a scalar.
    fn constant(&self, values: &[f32], shape: &[usize]) -> Result<Self::Node>;

    fn add(&self, lhs: &Self::Node, rhs: &Self::Node) -> Result<Self::Node>;
    fn sub(&self, lhs: &Self::Node, rhs: &Self::Node) -> Result<Self::Node>;

    /// Elementwise (Hadamard) product.
    fn mul(&self, lhs: &Self::Node, rhs: &Self::Node) -> Result<Self::Node>;

    /// Matrix product; a vector on either side is treated as a column/row.
    fn matmul(&self, lhs: &Self::Node, rhs: &Self::Node) -> Result<Self::Node>;

    fn div(&self, lhs: &Self::Node, rhs: &Self::Node) -> Result<Self::Node>;
    fn neg(&self, x: &Self::Node) -> Result<Self::Node>;
    fn tanh(&self, x: &Self::Node) -> Result<Self::Node>;
    fn sigmoid(&self, x: &Self::Node) -> Result<Self::Node>;

    /// Natural logarithm.
    fn log(&self, x: &Self::Node) -> Result<Self::Node>;
    fn log2(&self, x: &Self::Node) -> Result<Self::Node>;

    /// Normalized probabilities over the last axis.
    fn softmax(&self, x: &Self::Node) -> Result<Self::Node>;

    /// Entry `index` of a vector.
    fn slice(&self, x: &Self::Node, index: usize) -> Result<Self::Node>;

    /// Tensor of zeros.
    fn zeros(&self, shape: &[usize]) -> Result<Self::Node> {
        let len = shape.iter().product();
        self.constant(&vec![0.0; len], shape)
    }

    /// Vector with a single 1.0 at `index`.
    fn one_hot(&self, index: usize, size: usize) -> Result<Self::Node> {
        let mut values = vec![0.0; size];
        match values.get_mut(index) {
            Some(v) => *v = 1.0,
            None => {
                return Err(Error::Graph(format!(
                    "one-hot index {} out of range for size {}",
                    index, size
                )))
            }
        }
        self.constant(&values, &[size])
    }
}
