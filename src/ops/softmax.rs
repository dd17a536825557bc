//! Numerically stabilized softmax.
//!
//! Not differentiable on its own; it is only used inside
//! [`super::cross_entropy_loss`].
//!
//! The class axis is the last axis after dropping trailing singleton axes,
//! so a `[10, 1]` column vector is one 10-way distribution while a `[4, 10]`
//! matrix holds four independent rows.

use crate::tensors::{Tensor, TensorFloat};

/// Length of one distribution for a tensor of `shape`.
pub(crate) fn class_len(shape: &[usize]) -> usize {
    shape.iter().rev().copied().find(|&d| d != 1).unwrap_or(1)
}

/// Softmax over consecutive rows of `row_len` elements.
pub(crate) fn softmax_rows(data: &[TensorFloat], row_len: usize) -> Vec<TensorFloat> {
    let mut out = vec![0.0; data.len()];

    for (row, dst) in data.chunks(row_len).zip(out.chunks_mut(row_len)) {
        let max_val = row
            .iter()
            .copied()
            .fold(TensorFloat::NEG_INFINITY, TensorFloat::max);

        let mut sum = 0.0;
        for (y, &x) in dst.iter_mut().zip(row) {
            *y = (x - max_val).exp();
            sum += *y;
        }
        for y in dst.iter_mut() {
            *y /= sum;
        }
    }

    out
}

/// Returns the softmax of `input` as a new tensor without gradient tracking.
#[must_use]
pub fn softmax(input: &Tensor) -> Tensor {
    let data = softmax_rows(input.data(), class_len(input.shape()));
    Tensor::from_parts(input.shape().to_vec(), data, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_axis_skips_trailing_singletons() {
        assert_eq!(class_len(&[10, 1]), 10);
        assert_eq!(class_len(&[4, 10]), 10);
        assert_eq!(class_len(&[1, 1]), 1);
        assert_eq!(class_len(&[3]), 3);
    }

    #[test]
    fn rows_normalize_independently() {
        let out = softmax_rows(&[0.0, 0.0, 1000.0, 1000.0], 2);
        assert_eq!(out, vec![0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn tracked_input_gives_untracked_output() {
        let t = Tensor::from_vec(&[2], vec![1.0, 1.0], true).unwrap();
        let s = softmax(&t);
        assert!(s.grad().is_none());
        assert_eq!(s.data(), &[0.5, 0.5]);
    }
}
