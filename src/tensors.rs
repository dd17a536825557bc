//! Core tensor data structures.
//!
//! # Core Tensor Utilities
//!
//! This module defines the dense, row-major tensor that every operation in
//! the crate reads and produces.
//!
//! It supports:
//! - Construction of N-dimensional tensors from a shape, optionally with a gradient buffer
//! - Filling with a constant or with normally distributed values (Box–Muller)
//! - Gradient accumulation and zeroing
//!
//! ## Design Highlights
//! - `data` always holds exactly `capacity` (= product of the shape) values
//! - `grad` exists iff the tensor was created with `requires_grad`, and has the same length as `data`
//! - A tensor knows nothing about the graph; edges live in [`crate::graph::Graph`]
//!
//! ## Limitations
//! - Row-major only, `f32` only
//! - No broadcasting, slicing, or shape inference
//!
//! ## Example
//!
//! ```rust
//! use much::tensors::Tensor;
//!
//! let t = Tensor::from_vec(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], false).unwrap();
//! assert_eq!(t.shape(), &[2, 3]);
//! assert_eq!(t.capacity(), 6);
//! assert!(t.grad().is_none());
//! ```

use crate::error::{Error, Result};
use rand::Rng;
use std::f32::consts::PI;

/// The float used in tensors (`f32`).
pub type TensorFloat = f32;

/// An N-dimensional tensor with flat row-major data and an optional gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<TensorFloat>,
    grad: Option<Vec<TensorFloat>>,
}

fn checked_capacity(shape: &[usize]) -> Result<usize> {
    if shape.is_empty() || shape.contains(&0) {
        return Err(Error::InvalidShape(shape.to_vec()));
    }
    Ok(shape.iter().product())
}

impl Tensor {
    /// Creates a zero-filled tensor.
    ///
    /// When `requires_grad` is set the gradient buffer is allocated and zeroed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidShape`] if `shape` is empty or has a zero-sized axis.
    pub fn new(shape: &[usize], requires_grad: bool) -> Result<Self> {
        let capacity = checked_capacity(shape)?;
        Ok(Self {
            shape: shape.to_vec(),
            data: vec![0.0; capacity],
            grad: requires_grad.then(|| vec![0.0; capacity]),
        })
    }

    /// Creates a tensor from existing row-major data.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidShape`] for an empty or zero-sized shape
    /// - [`Error::ShapeMismatch`] if `data.len()` is not the product of `shape`
    pub fn from_vec(shape: &[usize], data: Vec<TensorFloat>, requires_grad: bool) -> Result<Self> {
        let capacity = checked_capacity(shape)?;
        if data.len() != capacity {
            return Err(Error::ShapeMismatch {
                op: "from_vec",
                lhs: shape.to_vec(),
                rhs: vec![data.len()],
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            data,
            grad: requires_grad.then(|| vec![0.0; capacity]),
        })
    }

    /// Builds a tensor whose shape and length were already validated.
    pub(crate) fn from_parts(shape: Vec<usize>, data: Vec<TensorFloat>, requires_grad: bool) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        let grad = requires_grad.then(|| vec![0.0; data.len()]);
        Self { shape, data, grad }
    }

    /// Sets every element of `data` to `value`.
    pub fn fill(&mut self, value: TensorFloat) {
        self.data.fill(value);
    }

    /// Fills `data` with samples from `N(mean, std²)`.
    ///
    /// Uses the Box–Muller transform: each pair of uniform draws yields two
    /// normal samples. With an odd capacity the last pair only writes its
    /// first sample.
    pub fn randomize_normal<R: Rng + ?Sized>(&mut self, rng: &mut R, mean: TensorFloat, std: TensorFloat) {
        for pair in self.data.chunks_mut(2) {
            // (0, 1] keeps the logarithm finite
            let u1: TensorFloat = 1.0 - rng.random::<TensorFloat>();
            let u2: TensorFloat = rng.random();
            let radius = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * PI * u2;

            pair[0] = radius * theta.cos() * std + mean;
            if let Some(second) = pair.get_mut(1) {
                *second = radius * theta.sin() * std + mean;
            }
        }
    }

    /// The shape of the tensor.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of elements (product of the shape).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor carries a gradient buffer.
    #[must_use]
    pub fn requires_grad(&self) -> bool {
        self.grad.is_some()
    }

    /// Flat row-major data.
    #[must_use]
    pub fn data(&self) -> &[TensorFloat] {
        &self.data
    }

    /// Mutable access to the data, for optimizers and initialization.
    pub fn data_mut(&mut self) -> &mut [TensorFloat] {
        &mut self.data
    }

    /// The gradient buffer, if gradient tracking is enabled.
    #[must_use]
    pub fn grad(&self) -> Option<&[TensorFloat]> {
        self.grad.as_deref()
    }

    /// Mutable gradient buffer, if gradient tracking is enabled.
    pub fn grad_mut(&mut self) -> Option<&mut [TensorFloat]> {
        self.grad.as_deref_mut()
    }

    /// Splits the tensor into its mutable data and its gradient.
    pub fn split_mut(&mut self) -> (&mut [TensorFloat], Option<&[TensorFloat]>) {
        (&mut self.data, self.grad.as_deref())
    }

    /// Resets the gradient to zero. No-op without a gradient buffer.
    pub fn zero_grad(&mut self) {
        if let Some(grad) = self.grad.as_mut() {
            grad.fill(0.0);
        }
    }

    /// Adds `contribution` into the gradient buffer elementwise.
    ///
    /// Tensors without a gradient buffer ignore the call.
    pub(crate) fn accumulate_grad(&mut self, contribution: &[TensorFloat]) {
        if let Some(grad) = self.grad.as_mut() {
            debug_assert_eq!(grad.len(), contribution.len());
            for (g, c) in grad.iter_mut().zip(contribution) {
                *g += c;
            }
        }
    }

    /// Index of the first maximal element of `data`.
    #[must_use]
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &x) in self.data.iter().enumerate().skip(1) {
            if x > self.data[best] {
                best = i;
            }
        }
        best
    }
}
