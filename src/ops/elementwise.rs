//! Elementwise binary kernels.
//!
//! Operands must have the same capacity; the output takes the shape of the
//! left operand.
//!
//! | op  | forward | into `a`          | into `b`                  |
//! |-----|---------|-------------------|---------------------------|
//! | add | a + b   | upstream          | upstream                  |
//! | sub | a − b   | upstream          | −upstream                 |
//! | mul | a ∘ b   | upstream ∘ b      | upstream ∘ a              |
//! | div | a / b   | upstream / b      | −upstream ∘ a / b²        |

use crate::error::{Error, Result};
use crate::tensors::{Tensor, TensorFloat};

pub(crate) fn check_capacity(op: &'static str, a: &Tensor, b: &Tensor) -> Result<()> {
    if a.capacity() == b.capacity() {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            op,
            lhs: a.shape().to_vec(),
            rhs: b.shape().to_vec(),
        })
    }
}

fn zip_map(a: &[TensorFloat], b: &[TensorFloat], f: impl Fn(TensorFloat, TensorFloat) -> TensorFloat) -> Vec<TensorFloat> {
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

/// `a + b`
#[must_use]
pub fn add(a: &[TensorFloat], b: &[TensorFloat]) -> Vec<TensorFloat> {
    zip_map(a, b, |x, y| x + y)
}

/// `a - b`
#[must_use]
pub fn sub(a: &[TensorFloat], b: &[TensorFloat]) -> Vec<TensorFloat> {
    zip_map(a, b, |x, y| x - y)
}

/// `a ∘ b`
#[must_use]
pub fn mul(a: &[TensorFloat], b: &[TensorFloat]) -> Vec<TensorFloat> {
    zip_map(a, b, |x, y| x * y)
}

/// `a / b`, checked eagerly.
///
/// # Errors
///
/// [`Error::DivideByZero`] if any divisor is exactly zero.
pub fn divide(a: &[TensorFloat], b: &[TensorFloat]) -> Result<Vec<TensorFloat>> {
    if let Some(index) = b.iter().position(|&y| y == 0.0) {
        return Err(Error::DivideByZero { index });
    }
    Ok(zip_map(a, b, |x, y| x / y))
}

pub(crate) fn add_backward(upstream: &[TensorFloat], wants: [bool; 2]) -> [Option<Vec<TensorFloat>>; 2] {
    [
        wants[0].then(|| upstream.to_vec()),
        wants[1].then(|| upstream.to_vec()),
    ]
}

pub(crate) fn sub_backward(upstream: &[TensorFloat], wants: [bool; 2]) -> [Option<Vec<TensorFloat>>; 2] {
    [
        wants[0].then(|| upstream.to_vec()),
        wants[1].then(|| upstream.iter().map(|g| -g).collect()),
    ]
}

pub(crate) fn mul_backward(
    upstream: &[TensorFloat],
    a: &[TensorFloat],
    b: &[TensorFloat],
    wants: [bool; 2],
) -> [Option<Vec<TensorFloat>>; 2] {
    [
        wants[0].then(|| mul(upstream, b)),
        wants[1].then(|| mul(upstream, a)),
    ]
}

pub(crate) fn div_backward(
    upstream: &[TensorFloat],
    a: &[TensorFloat],
    b: &[TensorFloat],
    wants: [bool; 2],
) -> [Option<Vec<TensorFloat>>; 2] {
    [
        wants[0].then(|| zip_map(upstream, b, |g, y| g / y)),
        wants[1].then(|| {
            upstream
                .iter()
                .zip(a.iter().zip(b))
                .map(|(&g, (&x, &y))| -g * x / (y * y))
                .collect()
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divide_reports_first_zero() {
        let err = divide(&[1.0, 2.0, 3.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::DivideByZero { index: 1 }));
    }

    #[test]
    fn sub_backward_negates_second_operand() {
        let [da, db] = sub_backward(&[1.0, -2.0], [true, true]);
        assert_eq!(da.unwrap(), vec![1.0, -2.0]);
        assert_eq!(db.unwrap(), vec![-1.0, 2.0]);
    }

    #[test]
    fn skipped_operands_get_no_buffer() {
        let [da, db] = mul_backward(&[1.0], &[2.0], &[3.0], [false, true]);
        assert!(da.is_none());
        assert_eq!(db.unwrap(), vec![2.0]);
    }

    #[test]
    fn div_backward_values() {
        let [da, db] = div_backward(&[1.0], &[6.0], &[2.0], [true, true]);
        assert_eq!(da.unwrap(), vec![0.5]);
        assert_eq!(db.unwrap(), vec![-1.5]);
    }
}
