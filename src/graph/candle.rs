//! Graph engine backed by candle tensors.

use super::Graph;
use crate::error::Result;
use candle_core::{Device, Tensor, Var, D};
use indexmap::IndexMap;
use std::cell::RefCell;

/// Builds nodes as candle tensors.
///
/// Operations run eagerly; candle records them for backpropagation whenever a
/// [`Var`] is involved. Parameters are kept in creation order so a trainer can
/// hand them to an optimizer.
pub struct CandleGraph {
    device: Device,
    params: RefCell<IndexMap<String, Var>>,
}

impl CandleGraph {
    /// Create a graph on Metal if available, otherwise on the CPU.
    pub fn new() -> Self {
        #[cfg(feature = "metal")]
        let device = Device::new_metal(0).unwrap_or(Device::Cpu);
        #[cfg(not(feature = "metal"))]
        let device = Device::Cpu;

        Self::with_device(device)
    }

    pub fn with_device(device: Device) -> Self {
        Self {
            device,
            params: RefCell::new(IndexMap::new()),
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Get a parameter variable by name.
    pub fn param(&self, name: &str) -> Option<Var> {
        self.params.borrow().get(name).cloned()
    }

    /// All parameters, in creation order.
    pub fn all_params(&self) -> Vec<Var> {
        self.params.borrow().values().cloned().collect()
    }
}

impl Default for CandleGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph for CandleGraph {
    type Node = Tensor;

    /// Xavier/Glorot initialized variable: stddev = sqrt(2 / (fan_in + fan_out)).
    fn parameter(&self, name: &str, shape: &[usize]) -> Result<Tensor> {
        let (fan_out, fan_in) = match shape {
            [] => (1, 1),
            [n] => (*n, *n),
            [.., rows, cols] => (*rows, *cols),
        };
        let stddev = (2.0 / (fan_in + fan_out) as f64).sqrt();
        let init = Tensor::randn(0f32, 1f32, shape, &self.device)?.affine(stddev, 0.0)?;
        let var = Var::from_tensor(&init)?;
        let node = var.as_tensor().clone();
        self.params.borrow_mut().insert(name.to_string(), var);
        Ok(node)
    }

    fn constant(&self, values: &[f32], shape: &[usize]) -> Result<Tensor> {
        Ok(Tensor::new(values, &self.device)?.reshape(shape)?)
    }

    fn add(&self, lhs: &Tensor, rhs: &Tensor) -> Result<Tensor> {
        Ok(lhs.broadcast_add(rhs)?)
    }

    fn sub(&self, lhs: &Tensor, rhs: &Tensor) -> Result<Tensor> {
        Ok(lhs.broadcast_sub(rhs)?)
    }

    fn mul(&self, lhs: &Tensor, rhs: &Tensor) -> Result<Tensor> {
        Ok(lhs.broadcast_mul(rhs)?)
    }

    fn matmul(&self, lhs: &Tensor, rhs: &Tensor) -> Result<Tensor> {
        let product = match (lhs.rank(), rhs.rank()) {
            (2, 1) => lhs.matmul(&rhs.unsqueeze(1)?)?.squeeze(1)?,
            (1, 2) => lhs.unsqueeze(0)?.matmul(rhs)?.squeeze(0)?,
            // dot product
            (1, 1) => lhs
                .unsqueeze(0)?
                .matmul(&rhs.unsqueeze(1)?)?
                .squeeze(1)?
                .squeeze(0)?,
            _ => lhs.broadcast_matmul(rhs)?,
        };
        Ok(product)
    }

    fn div(&self, lhs: &Tensor, rhs: &Tensor) -> Result<Tensor> {
        Ok(lhs.broadcast_div(rhs)?)
    }

    fn neg(&self, x: &Tensor) -> Result<Tensor> {
        Ok(x.neg()?)
    }

    fn tanh(&self, x: &Tensor) -> Result<Tensor> {
        Ok(x.tanh()?)
    }

    fn sigmoid(&self, x: &Tensor) -> Result<Tensor> {
        Ok(candle_nn::ops::sigmoid(x)?)
    }

    fn log(&self, x: &Tensor) -> Result<Tensor> {
        Ok(x.log()?)
    }

    fn log2(&self, x: &Tensor) -> Result<Tensor> {
        Ok(x.log()?.affine(1.0 / std::f64::consts::LN_2, 0.0)?)
    }

    fn softmax(&self, x: &Tensor) -> Result<Tensor> {
        Ok(candle_nn::ops::softmax(x, D::Minus1)?)
    }

    fn slice(&self, x: &Tensor, index: usize) -> Result<Tensor> {
        Ok(x.get(index)?)
    }
}
