//! A symbolic graph engine that only records structure.
//!
//! Nodes render as fully parenthesized expressions, which makes the shape of
//! a compiled formula easy to assert on and to print.

use super::Graph;
use crate::error::Result;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Operation that produced a traced node.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceOp {
    Parameter(String),
    Constant(Vec<f32>),
    Add,
    Sub,
    Mul,
    MatMul,
    Div,
    Neg,
    Tanh,
    Sigmoid,
    Log,
    Log2,
    Softmax,
    Slice(usize),
}

#[derive(Debug)]
struct NodeData {
    id: usize,
    op: TraceOp,
    inputs: Vec<TraceNode>,
}

/// Handle to a traced node. Equality is identity.
#[derive(Debug, Clone)]
pub struct TraceNode(Rc<NodeData>);

impl TraceNode {
    pub fn id(&self) -> usize {
        self.0.id
    }

    pub fn op(&self) -> &TraceOp {
        &self.0.op
    }

    pub fn inputs(&self) -> &[TraceNode] {
        &self.0.inputs
    }
}

impl PartialEq for TraceNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TraceNode {}

impl fmt::Display for TraceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs = self.inputs();
        let binary = |f: &mut fmt::Formatter<'_>, sym: &str| {
            write!(f, "({} {} {})", inputs[0], sym, inputs[1])
        };
        match self.op() {
            TraceOp::Parameter(name) => write!(f, "{}", name),
            TraceOp::Constant(values) if values.len() == 1 => write!(f, "{}", values[0]),
            TraceOp::Constant(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            TraceOp::Add => binary(f, "+"),
            TraceOp::Sub => binary(f, "-"),
            TraceOp::Mul => binary(f, "*"),
            TraceOp::MatMul => binary(f, "·"),
            TraceOp::Div => binary(f, "/"),
            TraceOp::Neg => write!(f, "-{}", inputs[0]),
            TraceOp::Tanh => write!(f, "tanh({})", inputs[0]),
            TraceOp::Sigmoid => write!(f, "σ({})", inputs[0]),
            TraceOp::Log => write!(f, "log({})", inputs[0]),
            TraceOp::Log2 => write!(f, "log2({})", inputs[0]),
            TraceOp::Softmax => write!(f, "softmax({})", inputs[0]),
            TraceOp::Slice(index) => write!(f, "{}[{}]", inputs[0], index),
        }
    }
}

/// Engine whose nodes are symbolic expressions.
#[derive(Debug, Default)]
pub struct TraceGraph {
    next_id: Cell<usize>,
}

impl TraceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes created so far.
    pub fn node_count(&self) -> usize {
        self.next_id.get()
    }

    fn node(&self, op: TraceOp, inputs: Vec<TraceNode>) -> Result<TraceNode> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(TraceNode(Rc::new(NodeData { id, op, inputs })))
    }
}

impl Graph for TraceGraph {
    type Node = TraceNode;

    fn parameter(&self, name: &str, _shape: &[usize]) -> Result<TraceNode> {
        self.node(TraceOp::Parameter(name.to_string()), vec![])
    }

    fn constant(&self, values: &[f32], _shape: &[usize]) -> Result<TraceNode> {
        self.node(TraceOp::Constant(values.to_vec()), vec![])
    }

    fn add(&self, lhs: &TraceNode, rhs: &TraceNode) -> Result<TraceNode> {
        self.node(TraceOp::Add, vec![lhs.clone(), rhs.clone()])
    }

    fn sub(&self, lhs: &TraceNode, rhs: &TraceNode) -> Result<TraceNode> {
        self.node(TraceOp::Sub, vec![lhs.clone(), rhs.clone()])
    }

    fn mul(&self, lhs: &TraceNode, rhs: &TraceNode) -> Result<TraceNode> {
        self.node(TraceOp::Mul, vec![lhs.clone(), rhs.clone()])
    }

    fn matmul(&self, lhs: &TraceNode, rhs: &TraceNode) -> Result<TraceNode> {
        self.node(TraceOp::MatMul, vec![lhs.clone(), rhs.clone()])
    }

    fn div(&self, lhs: &TraceNode, rhs: &TraceNode) -> Result<TraceNode> {
        self.node(TraceOp::Div, vec![lhs.clone(), rhs.clone()])
    }

    fn neg(&self, x: &TraceNode) -> Result<TraceNode> {
        self.node(TraceOp::Neg, vec![x.clone()])
    }

    fn tanh(&self, x: &TraceNode) -> Result<TraceNode> {
        self.node(TraceOp::Tanh, vec![x.clone()])
    }

    fn sigmoid(&self, x: &TraceNode) -> Result<TraceNode> {
        self.node(TraceOp::Sigmoid, vec![x.clone()])
    }

    fn log(&self, x: &TraceNode) -> Result<TraceNode> {
        self.node(TraceOp::Log, vec![x.clone()])
    }

    fn log2(&self, x: &TraceNode) -> Result<TraceNode> {
        self.node(TraceOp::Log2, vec![x.clone()])
    }

    fn softmax(&self, x: &TraceNode) -> Result<TraceNode> {
        self.node(TraceOp::Softmax, vec![x.clone()])
    }

    fn slice(&self, x: &TraceNode, index: usize) -> Result<TraceNode> {
        self.node(TraceOp::Slice(index), vec![x.clone()])
    }
}
