//! Dense matrix multiplication on rank-2 tensors.
//!
//! The kernel computes `C = A × B` (`A: m×k`, `B: k×n`) with one `rayon`
//! task per output row. Transposed operands in the backward pass are
//! expressed as strided views instead of materialized copies.

use crate::tensors::TensorFloat;
use rayon::prelude::*;

/// A read-only strided view of a row-major matrix.
#[derive(Debug, Clone, Copy)]
struct MatView<'a> {
    data: &'a [TensorFloat],
    rows: usize,
    cols: usize,
    row_stride: usize,
    col_stride: usize,
}

impl<'a> MatView<'a> {
    const fn new(data: &'a [TensorFloat], rows: usize, cols: usize) -> Self {
        Self {
            data,
            rows,
            cols,
            row_stride: cols,
            col_stride: 1,
        }
    }

    const fn transposed(self) -> Self {
        Self {
            data: self.data,
            rows: self.cols,
            cols: self.rows,
            row_stride: self.col_stride,
            col_stride: self.row_stride,
        }
    }

    #[inline]
    fn at(&self, row: usize, col: usize) -> TensorFloat {
        self.data[row * self.row_stride + col * self.col_stride]
    }
}

fn gemm(lhs: MatView<'_>, rhs: MatView<'_>) -> Vec<TensorFloat> {
    debug_assert_eq!(lhs.cols, rhs.rows, "inner dimensions must match");
    let (m, k, n) = (lhs.rows, lhs.cols, rhs.cols);
    let mut out = vec![0.0; m * n];

    out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for l in 0..k {
            let a = lhs.at(i, l);
            if a == 0.0 {
                continue;
            }
            for (j, cell) in row.iter_mut().enumerate() {
                *cell += a * rhs.at(l, j);
            }
        }
    });

    out
}

/// Multiplies `a` (`m×k`) by `b` (`k×n`), returning the `m×n` product.
///
/// Shapes are validated by the caller.
#[must_use]
pub fn matmul(a: &[TensorFloat], b: &[TensorFloat], m: usize, k: usize, n: usize) -> Vec<TensorFloat> {
    gemm(MatView::new(a, m, k), MatView::new(b, k, n))
}

/// Gradients of `C = A × B` given `upstream = dL/dC`:
/// `dA = upstream · Bᵗ`, `dB = Aᵗ · upstream`.
pub(crate) fn matmul_backward(
    upstream: &[TensorFloat],
    a: &[TensorFloat],
    b: &[TensorFloat],
    (m, k, n): (usize, usize, usize),
    wants: [bool; 2],
) -> [Option<Vec<TensorFloat>>; 2] {
    let grad = MatView::new(upstream, m, n);
    [
        wants[0].then(|| gemm(grad, MatView::new(b, k, n).transposed())),
        wants[1].then(|| gemm(MatView::new(a, m, k).transposed(), grad)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matmul_forward_values() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]; // 2x3
        let b = [7.0, 8.0, 9.0, 10.0, 11.0, 12.0]; // 3x2

        let out = matmul(&a, &b, 2, 3, 2);

        assert_eq!(
            out,
            vec![
                1.0 * 7.0 + 2.0 * 9.0 + 3.0 * 11.0,
                1.0 * 8.0 + 2.0 * 10.0 + 3.0 * 12.0,
                4.0 * 7.0 + 5.0 * 9.0 + 6.0 * 11.0,
                4.0 * 8.0 + 5.0 * 10.0 + 6.0 * 12.0,
            ]
        );
    }

    #[test]
    fn matmul_backward_shapes_and_values() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]; // 2x3
        let b = [7.0, 8.0, 9.0, 10.0, 11.0, 12.0]; // 3x2
        let upstream = [1.0; 4];

        let [da, db] = matmul_backward(&upstream, &a, &b, (2, 3, 2), [true, true]);
        let (da, db) = (da.unwrap(), db.unwrap());

        // row sums of B, repeated per row of A
        assert_eq!(da, vec![15.0, 19.0, 23.0, 15.0, 19.0, 23.0]);
        // column sums of A, repeated per column of B
        assert_eq!(db, vec![5.0, 5.0, 7.0, 7.0, 9.0, 9.0]);
    }

    #[test]
    fn column_vector_product() {
        // [2x2] x [2x1]
        let out = matmul(&[1.0, 2.0, 3.0, 4.0], &[1.0, -1.0], 2, 2, 1);
        assert_eq!(out, vec![-1.0, -1.0]);
    }
}
