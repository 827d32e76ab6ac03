//! Linear-algebra error types
//!
//! Every variant is raised from plaintext information (dimensions, indices,
//! declared scales) before any secret operation runs. A zero pivot is not an
//! error: it cannot be observed without revealing data.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinalgError {
    #[error("Shape mismatch in {op}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        op: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("Length mismatch in {op}: expected {expected}, got {got}")]
    LengthMismatch {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Index {index} out of range in {op} (bound {bound})")]
    IndexOutOfRange {
        op: &'static str,
        index: usize,
        bound: usize,
    },

    #[error("Empty input in {op}")]
    EmptyInput { op: &'static str },

    #[error("Scale mismatch: expected {expected}, got {got}")]
    ScaleMismatch { expected: u8, got: u8 },

    #[error("Sharing error: {0}")]
    Sharing(#[from] obliv_sharing::SharingError),

    #[error("Fixed-point error: {0}")]
    FixedPoint(#[from] obliv_fixed_point::FixedPointError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinalgError>;

pub(crate) fn check_len(op: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(LinalgError::LengthMismatch { op, expected, got });
    }
    Ok(())
}

pub(crate) fn check_shape(
    op: &'static str,
    expected: (usize, usize),
    got: (usize, usize),
) -> Result<()> {
    if expected != got {
        return Err(LinalgError::ShapeMismatch { op, expected, got });
    }
    Ok(())
}
