//! # Differentiable Operation Library
//!
//! This module holds the fixed set of differentiable primitives the graph
//! can record, split into one kernel module per operation plus a dispatch
//! layer that ties kernels to the graph.
//!
//! ## Submodules
//!
//! - [`elementwise`]: add, subtract, multiply, divide on equal-capacity tensors
//! - [`matmul`]: dense rank-2 matrix product, row-parallel via `rayon`
//! - [`sigmoid`]: logistic activation
//! - [`leaky_relu`]: leaky rectifier with slope [`leaky_relu::LEAKY_RELU_SLOPE`]
//! - [`softmax`]: numerically stabilized softmax (forward only)
//! - [`cross_entropy_loss`]: softmax + cross-entropy against one-hot labels
//! - [`mse_loss`]: mean squared error
//! - [`dispatch`]: the [`GradRule`] tag, the `Graph` operation methods, and
//!   the single backward-dispatch function
//!
//! ## Extending the Library
//!
//! To add a new operation:
//!
//! 1. Write its forward and backward kernels in a new submodule
//! 2. Add a [`GradRule`] variant and route it in `dispatch`
//! 3. Add a `Graph` method that validates shapes and records the node
//!
//! ## Notes
//!
//! - Kernels work on flat slices and never touch the graph
//! - Backward kernels *return* gradient contributions; accumulation into
//!   predecessor buffers is done by the backward engine
//! - Graph evaluation is single-threaded; only the matmul kernel fans out

pub mod cross_entropy_loss;
pub mod dispatch;
pub mod elementwise;
pub mod leaky_relu;
pub mod matmul;
pub mod mse_loss;
pub mod sigmoid;
pub mod softmax;

pub use self::dispatch::GradRule;
pub use self::softmax::softmax;
