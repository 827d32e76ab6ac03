//! Fixed-point vectors

use crate::error::Result;
use crate::fixed::{Fixed, DEFAULT_SCALE};

/// A vector of fixed-point values with common scale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedVector {
    /// Raw i64 values
    pub data: Vec<i64>,
    /// Common scale factor for all elements
    pub scale: u8,
}

impl FixedVector {
    /// Create a new vector from raw data with the given scale
    pub fn from_raw(data: Vec<i64>, scale: u8) -> Self {
        Self { data, scale }
    }

    /// Create a vector from floating-point values
    pub fn from_f64_slice(values: &[f64], scale: u8) -> Result<Self> {
        let data = values
            .iter()
            .map(|&v| Fixed::from_f64(v, scale).map(|fixed| fixed.raw))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { data, scale })
    }

    /// Create a vector from floating-point values with default scale
    pub fn from_f64_slice_default(values: &[f64]) -> Result<Self> {
        Self::from_f64_slice(values, DEFAULT_SCALE)
    }

    /// Convert to floating-point vector
    pub fn to_f64_vec(&self) -> Vec<f64> {
        let scale_factor = (1u64 << self.scale) as f64;
        self.data.iter().map(|&x| x as f64 / scale_factor).collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
