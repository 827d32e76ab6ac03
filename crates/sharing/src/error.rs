//! Secret sharing error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharingError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Scale mismatch: expected {expected}, got {got}")]
    ScaleMismatch { expected: u8, got: u8 },

    #[error("Fixed-point error: {0}")]
    FixedPoint(#[from] obliv_fixed_point::FixedPointError),

    #[error("Share channel {channel} exhausted: no share left to request")]
    ChannelExhausted { channel: u32 },

    #[error("Invalid random range: [{low}, {high}]")]
    InvalidRange { low: f64, high: f64 },
}

pub type Result<T> = std::result::Result<T, SharingError>;
