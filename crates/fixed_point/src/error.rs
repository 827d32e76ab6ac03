//! Fixed-point error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FixedPointError {
    #[error("Overflow during fixed-point conversion: value {value} exceeds the {bits}-bit range")]
    Overflow { value: f64, bits: u32 },

    #[error("Underflow during fixed-point conversion: value {value} exceeds the {bits}-bit range")]
    Underflow { value: f64, bits: u32 },

    #[error("Invalid scale: {0} (must be 0-30)")]
    InvalidScale(u8),

    #[error("Square root of negative value {value}")]
    NegativeSqrt { value: f64 },
}

pub type Result<T> = std::result::Result<T, FixedPointError>;
