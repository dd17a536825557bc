//! # `much`
//!
//! A minimal reverse-mode automatic differentiation engine over dense `f32`
//! tensors, with just enough on top of it to train small feed-forward
//! networks on MNIST.
//!
//! ## Features
//!
//! - **Tensors**: N-dimensional row-major buffers with an optional gradient
//! - **Graph**: an arena that records every operation output together with
//!   its predecessors and gradient rule; rewinding it drops a whole training
//!   step at once
//! - **Operators**: add, sub, mul, div, matmul (Rayon row-parallel), sigmoid,
//!   leaky `ReLU`, softmax cross-entropy and mean squared error
//! - **Backward engine**: post-order linearization and accumulating gradient
//!   propagation, correct for shared sub-expressions
//! - **Training**: linear layers, Adam, an MNIST IDX loader and a raw weight
//!   file format
//!
//! ## Modules
//!
//! - [`tensors`]: the tensor type
//! - [`graph`]: arena, handles, checkpoints
//! - [`ops`]: kernels and the graph-level operation methods
//! - [`backprop`]: the backward pass
//! - [`nn`]: layers and the Adam optimizer
//! - [`mnist`], [`modelio`], [`train`], [`config`]: the training program
//!
//! ## Example
//!
//! ```rust
//! use much::graph::Graph;
//! use much::tensors::Tensor;
//!
//! let mut graph = Graph::new();
//! let w = graph.insert(Tensor::from_vec(&[1, 2], vec![0.5, -1.0], true).unwrap());
//! let x = graph.insert(Tensor::from_vec(&[2, 1], vec![2.0, 3.0], false).unwrap());
//! let target = graph.insert(Tensor::from_vec(&[1, 1], vec![0.0], false).unwrap());
//!
//! let y = graph.matmul(w, x).unwrap();
//! let loss = graph.mse(y, target).unwrap();
//! graph.backward(loss).unwrap();
//!
//! // y = -2, dL/dy = 2y = -4, dL/dw = -4 * x
//! assert_eq!(graph[w].grad(), Some(&[-8.0, -12.0][..]));
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::many_single_char_names,
    clippy::cast_possible_truncation,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::missing_panics_doc
)]
#![warn(missing_docs)]
#![deny(unsafe_code)]
#![forbid(unused_must_use)]

pub mod backprop;
pub mod config;
pub mod error;
pub mod graph;
pub mod mnist;
pub mod modelio;
pub mod nn;
pub mod ops;
pub mod tensors;
pub mod train;

pub use error::{Error, Result};
pub use graph::{Checkpoint, Graph, TensorId};
pub use tensors::Tensor;
