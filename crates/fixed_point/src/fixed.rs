//! Fixed-point scalar type

use crate::error::{FixedPointError, Result};

/// Default scale factor exponent (S=20 means 2^20 = 1048576)
pub const DEFAULT_SCALE: u8 = 20;

/// Maximum scale (to prevent overflow in intermediate computations)
pub const MAX_SCALE: u8 = 30;

/// Significant bits of an encoded value, sign included.
///
/// Encoding rejects |x| >= 2^(INTEGER_BITS - scale - 1), so raw values stay
/// below 2^(INTEGER_BITS - 1). A secret product is formed at double scale in
/// the 64-bit ring before truncation, so it is exact only while
/// |a * b| < 2^(63 - 2 * scale), i.e. 2^23 at the default scale. Larger
/// products wrap.
pub const INTEGER_BITS: u32 = 41;

/// A fixed-point number represented as i64 with implicit scaling factor 2^S
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fixed {
    /// The raw integer value
    pub raw: i64,
    /// Scale factor exponent (value represents raw / 2^scale)
    pub scale: u8,
}

impl Fixed {
    /// Create a new fixed-point value from raw integer and scale
    pub fn from_raw(raw: i64, scale: u8) -> Result<Self> {
        check_scale(scale)?;
        Ok(Self { raw, scale })
    }

    /// Create a fixed-point value from a floating-point number
    pub fn from_f64(value: f64, scale: u8) -> Result<Self> {
        check_scale(scale)?;

        let limit = (1u64 << (INTEGER_BITS - 1 - scale as u32)) as f64;
        if value >= limit {
            return Err(FixedPointError::Overflow {
                value,
                bits: INTEGER_BITS,
            });
        }
        if value <= -limit {
            return Err(FixedPointError::Underflow {
                value,
                bits: INTEGER_BITS,
            });
        }

        let scale_factor = (1u64 << scale) as f64;
        Ok(Self {
            raw: (value * scale_factor).round() as i64,
            scale,
        })
    }

    /// Create a fixed-point value from a floating-point number using default scale
    pub fn from_f64_default(value: f64) -> Result<Self> {
        Self::from_f64(value, DEFAULT_SCALE)
    }

    /// Convert back to floating-point
    pub fn to_f64(self) -> f64 {
        let scale_factor = (1u64 << self.scale) as f64;
        self.raw as f64 / scale_factor
    }

    /// Create a zero value with the given scale
    pub fn zero(scale: u8) -> Result<Self> {
        Self::from_raw(0, scale)
    }

    /// Create a one value with the given scale
    pub fn one(scale: u8) -> Result<Self> {
        check_scale(scale)?;
        // 1.0 = 2^scale in raw form
        Ok(Self {
            raw: 1i64 << scale,
            scale,
        })
    }

    /// Divide, clamping to the i64 range instead of failing.
    ///
    /// A zero divisor saturates toward the sign of the dividend.
    pub fn saturating_div(self, other: Self) -> Self {
        if other.raw == 0 {
            let raw = if self.raw >= 0 { i64::MAX } else { i64::MIN };
            return Self {
                raw,
                scale: self.scale,
            };
        }
        let quotient = ((self.raw as i128) << self.scale) / other.raw as i128;
        Self {
            raw: quotient.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            scale: self.scale,
        }
    }

    /// Square root (truncated toward zero)
    pub fn sqrt(self) -> Result<Self> {
        if self.raw < 0 {
            return Err(FixedPointError::NegativeSqrt {
                value: self.to_f64(),
            });
        }
        // sqrt(raw / 2^s) * 2^s == sqrt(raw * 2^s)
        let widened = (self.raw as u128) << self.scale;
        Ok(Self {
            raw: isqrt(widened) as i64,
            scale: self.scale,
        })
    }

    /// Negate the value
    pub fn neg(self) -> Self {
        Self {
            raw: self.raw.wrapping_neg(),
            scale: self.scale,
        }
    }
}

impl std::fmt::Display for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}", self.to_f64())
    }
}

fn check_scale(scale: u8) -> Result<()> {
    if scale > MAX_SCALE {
        return Err(FixedPointError::InvalidScale(scale));
    }
    Ok(())
}

/// Integer square root (floor) by Newton iteration
fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let bits = 128 - n.leading_zeros();
    let mut x = 1u128 << bits.div_ceil(2);
    loop {
        let y = (x + n / x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}
