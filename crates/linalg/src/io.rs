//! Loading and emitting secret values over the runtime's share channel
//!
//! Values cross the channel as raw fixed-point integers at a declared scale.
//! The declared scale must equal the runtime scale; it is checked before any
//! share is requested or sent. Scalars travel in row-major order.

use obliv_sharing::SecretRuntime;

use crate::error::{LinalgError, Result};
use crate::matrix::SecretMatrix;
use crate::vector::SecretVector;

/// Share channel endpoint with a declared fixed-point scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareIo {
    channel: u32,
    scale: u8,
}

impl ShareIo {
    pub fn new(channel: u32, scale: u8) -> Self {
        Self { channel, scale }
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    fn check_scale<R: SecretRuntime>(&self, rt: &R) -> Result<()> {
        if self.scale != rt.scale() {
            return Err(LinalgError::ScaleMismatch {
                expected: rt.scale(),
                got: self.scale,
            });
        }
        Ok(())
    }

    /// Request one fixed-point share
    pub fn load_scalar<R: SecretRuntime>(&self, rt: &mut R) -> Result<R::Scalar> {
        self.check_scale(rt)?;
        Ok(rt.request_share(self.channel)?)
    }

    /// Request `len` fixed-point shares in index order
    pub fn load_vector<R: SecretRuntime>(
        &self,
        rt: &mut R,
        len: usize,
    ) -> Result<SecretVector<R::Scalar>> {
        self.check_scale(rt)?;
        let data = (0..len)
            .map(|_| rt.request_share(self.channel))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        tracing::debug!(channel = self.channel, len, "Loaded secret vector");
        Ok(SecretVector::from_vec(data))
    }

    /// Request a rows × cols matrix in row-major order
    pub fn load_matrix<R: SecretRuntime>(
        &self,
        rt: &mut R,
        rows: usize,
        cols: usize,
    ) -> Result<SecretMatrix<R::Scalar>> {
        let flat = self.load_vector(rt, rows * cols)?;
        SecretMatrix::from_vector(flat, rows, cols)
    }

    /// Request one share carrying a plain integer and lift it to fixed point
    pub fn load_integer<R: SecretRuntime>(&self, rt: &mut R) -> Result<R::Scalar> {
        let raw = self.load_scalar(rt)?;
        Ok(rt.mul_public(&raw, 1i64 << self.scale))
    }

    /// Request `len` integer shares and lift each to fixed point
    pub fn load_integer_vector<R: SecretRuntime>(
        &self,
        rt: &mut R,
        len: usize,
    ) -> Result<SecretVector<R::Scalar>> {
        let raw = self.load_vector(rt, len)?;
        let lifted = raw
            .iter()
            .map(|x| rt.mul_public(x, 1i64 << self.scale))
            .collect();
        Ok(SecretVector::from_vec(lifted))
    }

    /// Send one fixed-point share
    pub fn output_scalar<R: SecretRuntime>(&self, rt: &mut R, value: &R::Scalar) -> Result<()> {
        self.check_scale(rt)?;
        Ok(rt.send_share(self.channel, value)?)
    }

    /// Send every entry in index order
    pub fn output_vector<R: SecretRuntime>(
        &self,
        rt: &mut R,
        vector: &SecretVector<R::Scalar>,
    ) -> Result<()> {
        self.check_scale(rt)?;
        for x in vector.iter() {
            rt.send_share(self.channel, x)?;
        }
        tracing::debug!(channel = self.channel, len = vector.len(), "Sent secret vector");
        Ok(())
    }

    /// Send every entry in row-major order
    pub fn output_matrix<R: SecretRuntime>(
        &self,
        rt: &mut R,
        matrix: &SecretMatrix<R::Scalar>,
    ) -> Result<()> {
        self.output_vector(rt, &matrix.to_vector())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obliv_fixed_point::{FixedVector, DEFAULT_SCALE};
    use obliv_sharing::{LocalRuntime, SharingError};

    #[test]
    fn test_matrix_roundtrip_row_major() {
        let mut rt = LocalRuntime::with_seed(1);
        let io = ShareIo::new(0, DEFAULT_SCALE);
        let input =
            FixedVector::from_f64_slice_default(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        rt.provide_input(0, &input);

        let m = io.load_matrix(&mut rt, 2, 3).unwrap();
        assert_eq!(m.shape(), (2, 3));
        let second_row = m.row(1).reveal(&mut rt).unwrap().to_f64_vec();
        assert_eq!(second_row, vec![4.0, 5.0, 6.0]);

        let out = ShareIo::new(7, DEFAULT_SCALE);
        out.output_matrix(&mut rt, &m).unwrap();
        assert_eq!(rt.take_output(7).unwrap(), input);
    }

    #[test]
    fn test_output_scalar_roundtrip() {
        let mut rt = LocalRuntime::with_seed(5);
        let io = ShareIo::new(4, DEFAULT_SCALE);
        let x = rt.share_f64(-2.75).unwrap();
        let y = rt.share_f64(0.125).unwrap();

        io.output_scalar(&mut rt, &x).unwrap();
        io.output_scalar(&mut rt, &y).unwrap();
        assert_eq!(rt.stats().shares_out, 2);
        assert_eq!(
            rt.take_output(io.channel()).unwrap().to_f64_vec(),
            vec![-2.75, 0.125]
        );
        assert!(rt.take_output(io.channel()).unwrap().is_empty());

        let wrong = ShareIo::new(4, 16);
        assert!(matches!(
            wrong.output_scalar(&mut rt, &x),
            Err(LinalgError::ScaleMismatch { expected: DEFAULT_SCALE, got: 16 })
        ));
        assert_eq!(rt.stats().shares_out, 2);
    }

    #[test]
    fn test_load_integer_lifts_to_scale() {
        let mut rt = LocalRuntime::with_seed(2);
        let io = ShareIo::new(3, DEFAULT_SCALE);
        rt.provide_input(3, &FixedVector::from_raw(vec![5, -2, 7], DEFAULT_SCALE));

        let first = io.load_integer(&mut rt).unwrap();
        assert_eq!(rt.reveal(&first).unwrap().to_f64(), 5.0);

        let rest = io.load_integer_vector(&mut rt, 2).unwrap();
        assert_eq!(rest.reveal(&mut rt).unwrap().to_f64_vec(), vec![-2.0, 7.0]);
    }

    #[test]
    fn test_scale_checked_before_channel() {
        let mut rt = LocalRuntime::with_seed(3);
        let io = ShareIo::new(0, 16);
        rt.provide_input(0, &FixedVector::from_f64_slice_default(&[1.0]).unwrap());

        assert!(matches!(
            io.load_vector(&mut rt, 1),
            Err(LinalgError::ScaleMismatch { expected: DEFAULT_SCALE, got: 16 })
        ));
        assert_eq!(rt.pending_inputs(0), 1);
        assert_eq!(rt.stats().shares_in, 0);
    }

    #[test]
    fn test_exhausted_channel() {
        let mut rt = LocalRuntime::with_seed(4);
        let io = ShareIo::new(9, DEFAULT_SCALE);
        assert!(matches!(
            io.load_scalar(&mut rt),
            Err(LinalgError::Sharing(SharingError::ChannelExhausted { channel: 9 }))
        ));
    }
}
