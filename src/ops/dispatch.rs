//! Operation Dispatch Layer
//!
//! Binds the kernels of [`super`] to the [`Graph`]: every method validates
//! its operands, runs the forward kernel, and records the output together
//! with a [`GradRule`] tag and its predecessor handles. During the backward
//! pass [`backward`] is the single place that maps a tag back to its kernel.
//!
//! # Example
//!
//! ```rust
//! use much::graph::Graph;
//! use much::tensors::Tensor;
//!
//! let mut graph = Graph::new();
//! let a = graph.insert(Tensor::from_vec(&[2], vec![1.0, 2.0], true).unwrap());
//! let b = graph.insert(Tensor::from_vec(&[2], vec![3.0, 4.0], false).unwrap());
//! let c = graph.mul(a, b).unwrap();
//! assert_eq!(graph[c].data(), &[3.0, 8.0]);
//! assert_eq!(graph.predecessors(c).unwrap(), &[a, b]);
//! ```

use super::{cross_entropy_loss, elementwise, leaky_relu, matmul, mse_loss, sigmoid};
use crate::error::{Error, Result};
use crate::graph::{Graph, TensorId};
use crate::tensors::{Tensor, TensorFloat};

/// Tag naming the gradient rule attached to a recorded node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradRule {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a ∘ b`
    Mul,
    /// `a / b`
    Div,
    /// `a × b` on rank-2 tensors
    MatMul,
    /// `σ(x)`
    Sigmoid,
    /// leaky rectifier
    LeakyRelu,
    /// softmax cross-entropy `(logits, labels)`
    CrossEntropy,
    /// mean squared error `(a, b)`
    MeanSquaredError,
}

impl GradRule {
    /// Short operation name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::MatMul => "matmul",
            Self::Sigmoid => "sigmoid",
            Self::LeakyRelu => "leaky_relu",
            Self::CrossEntropy => "cross_entropy",
            Self::MeanSquaredError => "mse",
        }
    }
}

/// Per-predecessor gradient contributions, aligned with the predecessor list.
pub(crate) type Contributions = Vec<Option<Vec<TensorFloat>>>;

impl Graph {
    fn binary(
        &mut self,
        rule: GradRule,
        a: TensorId,
        b: TensorId,
        kernel: impl FnOnce(&[TensorFloat], &[TensorFloat]) -> Result<Vec<TensorFloat>>,
    ) -> Result<TensorId> {
        let (lhs, rhs) = (self.tensor(a)?, self.tensor(b)?);
        elementwise::check_capacity(rule.name(), lhs, rhs)?;

        let requires_grad = lhs.requires_grad() || rhs.requires_grad();
        let data = kernel(lhs.data(), rhs.data())?;
        let out = Tensor::from_parts(lhs.shape().to_vec(), data, requires_grad);

        Ok(self.record(out, rule, vec![a, b]))
    }

    fn unary(
        &mut self,
        rule: GradRule,
        x: TensorId,
        kernel: impl FnOnce(&[TensorFloat]) -> Vec<TensorFloat>,
    ) -> Result<TensorId> {
        let input = self.tensor(x)?;
        let data = kernel(input.data());
        let out = Tensor::from_parts(input.shape().to_vec(), data, input.requires_grad());

        Ok(self.record(out, rule, vec![x]))
    }

    /// Elementwise `a + b`.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if the capacities differ
    /// - [`Error::InvalidState`] for stale handles
    pub fn add(&mut self, a: TensorId, b: TensorId) -> Result<TensorId> {
        self.binary(GradRule::Add, a, b, |x, y| Ok(elementwise::add(x, y)))
    }

    /// Elementwise `a - b`.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if the capacities differ
    /// - [`Error::InvalidState`] for stale handles
    pub fn sub(&mut self, a: TensorId, b: TensorId) -> Result<TensorId> {
        self.binary(GradRule::Sub, a, b, |x, y| Ok(elementwise::sub(x, y)))
    }

    /// Elementwise `a ∘ b`.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if the capacities differ
    /// - [`Error::InvalidState`] for stale handles
    pub fn mul(&mut self, a: TensorId, b: TensorId) -> Result<TensorId> {
        self.binary(GradRule::Mul, a, b, |x, y| Ok(elementwise::mul(x, y)))
    }

    /// Elementwise `a / b`.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if the capacities differ
    /// - [`Error::DivideByZero`] if any element of `b` is exactly zero
    /// - [`Error::InvalidState`] for stale handles
    pub fn div(&mut self, a: TensorId, b: TensorId) -> Result<TensorId> {
        self.binary(GradRule::Div, a, b, elementwise::divide)
    }

    /// Matrix product of two rank-2 tensors, `[m, k] × [k, n] → [m, n]`.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if either operand is not rank 2 or the inner dimensions differ
    /// - [`Error::InvalidState`] for stale handles
    pub fn matmul(&mut self, a: TensorId, b: TensorId) -> Result<TensorId> {
        let (lhs, rhs) = (self.tensor(a)?, self.tensor(b)?);
        let (m, k, n) = match (lhs.shape(), rhs.shape()) {
            (&[m, k], &[k2, n]) if k == k2 => (m, k, n),
            _ => {
                return Err(Error::ShapeMismatch {
                    op: GradRule::MatMul.name(),
                    lhs: lhs.shape().to_vec(),
                    rhs: rhs.shape().to_vec(),
                });
            }
        };

        let requires_grad = lhs.requires_grad() || rhs.requires_grad();
        let data = matmul::matmul(lhs.data(), rhs.data(), m, k, n);
        let out = Tensor::from_parts(vec![m, n], data, requires_grad);

        Ok(self.record(out, GradRule::MatMul, vec![a, b]))
    }

    /// Elementwise logistic function.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] for a stale handle.
    pub fn sigmoid(&mut self, x: TensorId) -> Result<TensorId> {
        self.unary(GradRule::Sigmoid, x, sigmoid::sigmoid)
    }

    /// Elementwise leaky rectifier.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] for a stale handle.
    pub fn leaky_relu(&mut self, x: TensorId) -> Result<TensorId> {
        self.unary(GradRule::LeakyRelu, x, leaky_relu::leaky_relu)
    }

    /// Softmax cross-entropy of one-hot `labels` under `logits`, as a `[1]` tensor.
    ///
    /// Only the logits receive gradient; the output tracks gradients iff the
    /// logits do.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if the capacities differ
    /// - [`Error::InvalidState`] for stale handles
    pub fn cross_entropy(&mut self, logits: TensorId, labels: TensorId) -> Result<TensorId> {
        let (z, t) = (self.tensor(logits)?, self.tensor(labels)?);
        elementwise::check_capacity(GradRule::CrossEntropy.name(), z, t)?;

        let loss = cross_entropy_loss::cross_entropy_loss(z.data(), z.shape(), t.data());
        let out = Tensor::from_parts(vec![1], vec![loss], z.requires_grad());

        Ok(self.record(out, GradRule::CrossEntropy, vec![logits, labels]))
    }

    /// Mean squared error of `a` against `b`, as a `[1]` tensor.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if the capacities differ
    /// - [`Error::InvalidState`] for stale handles
    pub fn mse(&mut self, a: TensorId, b: TensorId) -> Result<TensorId> {
        let (lhs, rhs) = (self.tensor(a)?, self.tensor(b)?);
        elementwise::check_capacity(GradRule::MeanSquaredError.name(), lhs, rhs)?;

        let requires_grad = lhs.requires_grad() || rhs.requires_grad();
        let loss = mse_loss::mse_loss(lhs.data(), rhs.data());
        let out = Tensor::from_parts(vec![1], vec![loss], requires_grad);

        Ok(self.record(out, GradRule::MeanSquaredError, vec![a, b]))
    }
}

/// Runs the gradient rule of one node.
///
/// `output` is the recorded node, `inputs` its predecessors in order. The
/// returned contributions are aligned with `inputs`; `None` marks an input
/// that does not track gradients.
///
/// # Errors
///
/// [`Error::InvalidState`] if the node has no gradient buffer or the
/// predecessor count does not fit the rule.
pub(crate) fn backward(rule: GradRule, output: &Tensor, inputs: &[&Tensor]) -> Result<Contributions> {
    let upstream = output
        .grad()
        .ok_or(Error::InvalidState("recorded node has no gradient buffer"))?;

    let contributions: Contributions = match (rule, inputs) {
        (GradRule::Add, [a, b]) => {
            elementwise::add_backward(upstream, wants(a, b)).into()
        }
        (GradRule::Sub, [a, b]) => {
            elementwise::sub_backward(upstream, wants(a, b)).into()
        }
        (GradRule::Mul, [a, b]) => {
            elementwise::mul_backward(upstream, a.data(), b.data(), wants(a, b)).into()
        }
        (GradRule::Div, [a, b]) => {
            elementwise::div_backward(upstream, a.data(), b.data(), wants(a, b)).into()
        }
        (GradRule::MatMul, [a, b]) => {
            let (m, k) = (a.shape()[0], a.shape()[1]);
            let n = b.shape()[1];
            matmul::matmul_backward(upstream, a.data(), b.data(), (m, k, n), wants(a, b)).into()
        }
        (GradRule::Sigmoid, [x]) => {
            vec![x.requires_grad().then(|| sigmoid::sigmoid_backward(upstream, output.data()))]
        }
        (GradRule::LeakyRelu, [x]) => {
            vec![x.requires_grad().then(|| leaky_relu::leaky_relu_backward(upstream, x.data()))]
        }
        (GradRule::CrossEntropy, [logits, labels]) => vec![
            logits.requires_grad().then(|| {
                cross_entropy_loss::cross_entropy_backward(
                    upstream[0],
                    logits.data(),
                    logits.shape(),
                    labels.data(),
                )
            }),
            None,
        ],
        (GradRule::MeanSquaredError, [a, b]) => {
            mse_loss::mse_backward(upstream[0], a.data(), b.data(), wants(a, b)).into()
        }
        _ => return Err(Error::InvalidState("predecessor count does not fit the gradient rule")),
    };

    Ok(contributions)
}

fn wants(a: &Tensor, b: &Tensor) -> [bool; 2] {
    [a.requires_grad(), b.requires_grad()]
}
