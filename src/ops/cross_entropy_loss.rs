//! Softmax cross-entropy against one-hot labels.
//!
//! # Formula
//!
//! `$$ L = -\\sum_i t_i \\ln(\\mathrm{softmax}(z)_i + \\epsilon) $$`
//!
//! The loss is summed over every row. The backward pass recomputes the
//! softmax from the logits instead of caching the forward value, and
//! yields the usual simplified gradient `upstream · (softmax − labels)`.

use super::softmax::{class_len, softmax_rows};
use crate::tensors::TensorFloat;

/// Keeps `ln` finite when a softmax probability underflows to zero.
pub const LOG_EPSILON: TensorFloat = 1e-9;

/// Cross-entropy of `labels` under the softmax of `logits`.
#[must_use]
pub fn cross_entropy_loss(logits: &[TensorFloat], shape: &[usize], labels: &[TensorFloat]) -> TensorFloat {
    let probs = softmax_rows(logits, class_len(shape));

    probs
        .iter()
        .zip(labels)
        .map(|(&p, &t)| -t * (p + LOG_EPSILON).ln())
        .sum()
}

pub(crate) fn cross_entropy_backward(
    upstream: TensorFloat,
    logits: &[TensorFloat],
    shape: &[usize],
    labels: &[TensorFloat],
) -> Vec<TensorFloat> {
    let probs = softmax_rows(logits, class_len(shape));

    probs
        .iter()
        .zip(labels)
        .map(|(&p, &t)| upstream * (p - t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_logits_give_ln_classes() {
        let logits = [0.0; 10];
        let mut labels = [0.0; 10];
        labels[3] = 1.0;

        let loss = cross_entropy_loss(&logits, &[10, 1], &labels);

        assert!((loss - 10.0f32.ln()).abs() < 1e-5, "loss {loss}");
    }

    #[test]
    fn gradient_is_softmax_minus_labels() {
        let grad = cross_entropy_backward(2.0, &[0.0, 0.0], &[2], &[1.0, 0.0]);
        assert_eq!(grad, vec![-1.0, 1.0]);
    }
}
