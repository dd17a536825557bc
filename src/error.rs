//! Error types shared by the engine, the collaborators and the binary.
//!
//! Every failure is a value. Nothing in the library aborts the process;
//! the training binary or a test decides what to do with an `Err`.

use std::collections::TryReserveError;
use thiserror::Error;

/// Errors raised by tensor creation, graph operations, the backward engine,
/// and the dataset / weight-file readers.
#[derive(Debug, Error)]
pub enum Error {
    /// Two operands (or a buffer and its declared shape) are incompatible.
    #[error("shape mismatch in {op}: {lhs:?} vs {rhs:?}")]
    ShapeMismatch {
        /// The operation that rejected its operands.
        op: &'static str,
        /// Shape (or length) of the left-hand operand.
        lhs: Vec<usize>,
        /// Shape (or length) of the right-hand operand.
        rhs: Vec<usize>,
    },

    /// A shape with no axes or with a zero-sized axis.
    #[error("invalid shape {0:?}: tensors need at least one axis and no zero-sized axes")]
    InvalidShape(Vec<usize>),

    /// Elementwise division hit an exact zero in the divisor.
    #[error("division by zero at element {index}")]
    DivideByZero {
        /// Flat index of the first zero divisor.
        index: usize,
    },

    /// The request does not make sense for the current graph state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Bookkeeping memory for a backward pass could not be reserved.
    #[error("allocation failure: {0}")]
    AllocationFailure(#[from] TryReserveError),

    /// A dataset or weight file has the wrong magic, counts or length.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A file could not be opened, read or written.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
