//! Logistic activation kernels.

use crate::tensors::TensorFloat;

/// Logistic function `1 / (1 + e^-x)`, elementwise.
#[must_use]
pub fn sigmoid(input: &[TensorFloat]) -> Vec<TensorFloat> {
    input.iter().map(|&x| 1.0 / (1.0 + (-x).exp())).collect()
}

/// Uses the saved forward output `s`: `upstream ∘ s ∘ (1 − s)`.
pub(crate) fn sigmoid_backward(upstream: &[TensorFloat], output: &[TensorFloat]) -> Vec<TensorFloat> {
    upstream
        .iter()
        .zip(output)
        .map(|(&dy, &s)| dy * s * (1.0 - s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_midpoint_and_tails() {
        let out = sigmoid(&[0.0, 40.0, -40.0]);
        assert_eq!(out[0], 0.5);
        assert!((out[1] - 1.0).abs() < 1e-6);
        assert!(out[2].abs() < 1e-6);
    }

    #[test]
    fn sigmoid_backward_peaks_at_zero() {
        let grad = sigmoid_backward(&[1.0], &[0.5]);
        assert_eq!(grad, vec![0.25]);
    }
}
