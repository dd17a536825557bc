//! Leaky rectifier kernels.

use crate::tensors::TensorFloat;

/// Slope applied on the non-positive domain.
pub const LEAKY_RELU_SLOPE: TensorFloat = 0.01;

/// Applies a leaky rectifier element-wise:
/// `$$ f(x) = x \text{ if } x > 0 \text{ else } 0.01x $$`
#[must_use]
pub fn leaky_relu(input: &[TensorFloat]) -> Vec<TensorFloat> {
    input
        .iter()
        .map(|&x| if x > 0.0 { x } else { x * LEAKY_RELU_SLOPE })
        .collect()
}

/// The mask is taken from the *input*, not the output.
pub(crate) fn leaky_relu_backward(upstream: &[TensorFloat], input: &[TensorFloat]) -> Vec<TensorFloat> {
    upstream
        .iter()
        .zip(input)
        .map(|(&dy, &x)| if x > 0.0 { dy } else { dy * LEAKY_RELU_SLOPE })
        .collect()
}
