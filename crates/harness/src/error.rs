//! Harness error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Linear algebra error: {0}")]
    Linalg(#[from] obliv_linalg::LinalgError),

    #[error("Sharing error: {0}")]
    Sharing(#[from] obliv_sharing::SharingError),

    #[error("Fixed-point error: {0}")]
    FixedPoint(#[from] obliv_fixed_point::FixedPointError),

    #[error("Plaintext matrix is singular at column {column}")]
    Singular { column: usize },

    #[error("Verification failed: {message}")]
    VerificationFailed { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
