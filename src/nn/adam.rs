//! Adam optimizer over graph parameters.
//!
//! # Hyperparameters (fixed)
//!
//! - beta1 = 0.9
//! - beta2 = 0.999
//! - eps = 1e-8
//!
//! The moment buffers are flat and positional: for a [`Linear`] layer the
//! weight elements come first in row-major order, followed by the bias.
//! The optimizer never zeroes gradients; callers do that before the forward
//! pass that produces them.

use super::layers::Linear;
use crate::error::{Error, Result};
use crate::graph::{Graph, TensorId};
use crate::tensors::TensorFloat;

/// Decay rate of the first-moment estimate.
pub const BETA1: TensorFloat = 0.9;
/// Decay rate of the second-moment estimate.
pub const BETA2: TensorFloat = 0.999;
/// Added to the denominator so a zero second moment cannot divide by zero.
pub const EPSILON: TensorFloat = 1e-8;

/// Per-parameter first and second moment estimates plus a step counter.
#[derive(Debug, Clone, PartialEq)]
pub struct Adam {
    m: Vec<TensorFloat>,
    v: Vec<TensorFloat>,
    t: i32,
}

impl Adam {
    /// Creates zeroed state for `num_params` scalar parameters.
    #[must_use]
    pub fn new(num_params: usize) -> Self {
        Self {
            m: vec![0.0; num_params],
            v: vec![0.0; num_params],
            t: 0,
        }
    }

    /// Creates state sized for one linear layer.
    #[must_use]
    pub fn for_layer(layer: &Linear) -> Self {
        Self::new(layer.num_params())
    }

    /// Number of updates applied so far.
    #[must_use]
    pub const fn step(&self) -> i32 {
        self.t
    }

    /// Updates the weight and bias of `layer` in place.
    ///
    /// # Errors
    ///
    /// See [`Adam::update_params`].
    pub fn update(&mut self, graph: &mut Graph, layer: &Linear, learning_rate: TensorFloat) -> Result<()> {
        self.update_params(graph, &layer.parameters(), learning_rate)
    }

    /// Applies one Adam step to `params`, consumed in order.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if the total element count differs from the state size
    /// - [`Error::InvalidState`] if a parameter is stale or has no gradient buffer
    ///
    /// Nothing is modified when an error is returned.
    pub fn update_params(
        &mut self,
        graph: &mut Graph,
        params: &[TensorId],
        learning_rate: TensorFloat,
    ) -> Result<()> {
        let mut total = 0;
        for &id in params {
            let tensor = graph.tensor(id)?;
            if !tensor.requires_grad() {
                return Err(Error::InvalidState("optimizer parameter has no gradient buffer"));
            }
            total += tensor.capacity();
        }
        if total != self.m.len() {
            return Err(Error::ShapeMismatch {
                op: "adam",
                lhs: vec![self.m.len()],
                rhs: vec![total],
            });
        }

        self.t = self.t.saturating_add(1);
        let correction1 = 1.0 - BETA1.powi(self.t);
        let correction2 = 1.0 - BETA2.powi(self.t);

        let mut offset = 0;
        for &id in params {
            let (data, grad) = graph.tensor_mut(id)?.split_mut();
            let grad = grad.ok_or(Error::InvalidState("optimizer parameter has no gradient buffer"))?;
            let len = data.len();
            let m = &mut self.m[offset..offset + len];
            let v = &mut self.v[offset..offset + len];

            #[allow(clippy::suspicious_operation_groupings)]
            for (((param, &g), m), v) in data.iter_mut().zip(grad).zip(m).zip(v) {
                *m = BETA1 * *m + (1.0 - BETA1) * g;
                *v = BETA2 * *v + (1.0 - BETA2) * g * g;

                let m_hat = *m / correction1;
                let v_hat = *v / correction2;

                *param -= learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
            }
            offset += len;
        }

        Ok(())
    }
}
