//! The secret-sharing runtime boundary
//!
//! Everything the oblivious core does to a secret value goes through this
//! trait. Local operations (addition, public scaling) never communicate;
//! `mul`, `div`, `compare_and_select`, `sqrt`, `random_in_range` and `reveal`
//! may each cost one or more rounds among the parties. Every party must issue
//! the same calls in the same order.

use std::fmt;

use obliv_fixed_point::Fixed;

use crate::error::{Result, SharingError};

/// Primitive operations a secret-sharing runtime provides to the core
pub trait SecretRuntime {
    /// This party's handle on one secret fixed-point value
    type Scalar: Clone + fmt::Debug;

    /// Fixed-point scale shared by every value of the computation
    fn scale(&self) -> u8;

    /// Embed a public raw fixed-point integer
    fn constant_raw(&self, raw: i64) -> Self::Scalar;

    /// Embed a public fixed-point value
    fn constant(&self, value: Fixed) -> Result<Self::Scalar> {
        if value.scale != self.scale() {
            return Err(SharingError::ScaleMismatch {
                expected: self.scale(),
                got: value.scale,
            });
        }
        Ok(self.constant_raw(value.raw))
    }

    /// Secret zero
    fn zero(&self) -> Self::Scalar {
        self.constant_raw(0)
    }

    /// Secret one
    fn one(&self) -> Self::Scalar {
        self.constant_raw(1i64 << self.scale())
    }

    /// a + b
    fn add(&self, a: &Self::Scalar, b: &Self::Scalar) -> Self::Scalar;

    /// a - b
    fn sub(&self, a: &Self::Scalar, b: &Self::Scalar) -> Self::Scalar;

    /// -a
    fn neg(&self, a: &Self::Scalar) -> Self::Scalar {
        self.sub(&self.zero(), a)
    }

    /// a * k for a public ring element k, without rescaling
    fn mul_public(&self, a: &Self::Scalar, k: i64) -> Self::Scalar;

    /// Secret fixed-point multiplication
    fn mul(&mut self, a: &Self::Scalar, b: &Self::Scalar) -> Result<Self::Scalar>;

    /// Secret fixed-point division
    ///
    /// A secret zero divisor is not reported; the result is an undefined value.
    fn div(&mut self, a: &Self::Scalar, b: &Self::Scalar) -> Result<Self::Scalar>;

    /// Oblivious `a > b ? then_val : else_val`; the predicate stays secret
    fn compare_and_select(
        &mut self,
        a: &Self::Scalar,
        b: &Self::Scalar,
        then_val: &Self::Scalar,
        else_val: &Self::Scalar,
    ) -> Result<Self::Scalar>;

    /// Secret square root
    fn sqrt(&mut self, a: &Self::Scalar) -> Result<Self::Scalar>;

    /// Uniform secret draw from the closed range [low, high]
    fn random_in_range(&mut self, low: Fixed, high: Fixed) -> Result<Self::Scalar>;

    /// Reconstruct a secret value in the clear
    fn reveal(&mut self, a: &Self::Scalar) -> Result<Fixed>;

    /// Receive one share from the external channel
    ///
    /// The share is taken as the raw fixed-point representation at
    /// [`SecretRuntime::scale`]; no rescaling happens here.
    fn request_share(&mut self, channel: u32) -> Result<Self::Scalar>;

    /// Send one share out on the external channel
    fn send_share(&mut self, channel: u32, value: &Self::Scalar) -> Result<()>;
}
