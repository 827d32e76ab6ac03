//! Obliv Fixed-Point Encoding
//!
//! Plaintext fixed-point representation shared by the secret-sharing runtime
//! and the oblivious linear-algebra core. Values are i64 integers with an
//! implicit scaling factor 2^S; shares of a secret value live in the same
//! wrapping ring.

mod error;
mod fixed;
mod vector;

pub use error::{FixedPointError, Result};
pub use fixed::{Fixed, DEFAULT_SCALE, INTEGER_BITS, MAX_SCALE};
pub use vector::FixedVector;
