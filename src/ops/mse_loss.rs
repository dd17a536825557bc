//! Mean squared error kernels.

use crate::tensors::TensorFloat;

/// Computes the mean squared error between `a` and `b`.
///
/// # Formula
///
/// `$$ L = \\frac{1}{n} \\sum_i (a_i - b_i)^2 $$`
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mse_loss(a: &[TensorFloat], b: &[TensorFloat]) -> TensorFloat {
    let n = a.len() as TensorFloat;
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let diff = x - y;
            diff * diff
        })
        .sum::<TensorFloat>()
        / n
}

/// `dL/da = upstream · 2(a − b)/n`, and the negation for `b`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mse_backward(
    upstream: TensorFloat,
    a: &[TensorFloat],
    b: &[TensorFloat],
    wants: [bool; 2],
) -> [Option<Vec<TensorFloat>>; 2] {
    let n = a.len() as TensorFloat;
    let grad_a: Vec<TensorFloat> = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| 2.0 * (x - y) * upstream / n)
        .collect();

    let grad_b = wants[1].then(|| grad_a.iter().map(|g| -g).collect());
    [wants[0].then_some(grad_a), grad_b]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mse_loss() {
        let loss = mse_loss(&[1.0, 2.0], &[1.5, 2.5]);
        assert_eq!(loss, 0.25);

        let [da, db] = mse_backward(1.0, &[1.0, 2.0], &[1.5, 2.5], [true, true]);
        assert_eq!(da.unwrap(), vec![-0.5, -0.5]);
        assert_eq!(db.unwrap(), vec![0.5, 0.5]);
    }
}
