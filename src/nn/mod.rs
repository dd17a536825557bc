//! Network building blocks on top of the [`Graph`](crate::graph::Graph).
//!
//! Nothing here adds differentiation logic: a [`Linear`] layer is a pair of
//! parameter handles plus a `matmul` and an `add`, a [`Sequence`] chains
//! layers, and [`Adam`] reads the gradients the backward pass left behind.

pub mod adam;
pub mod layers;

pub use self::adam::Adam;
pub use self::layers::{ActivationKind, Layer, Linear, Sequence};
