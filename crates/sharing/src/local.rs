//! In-process two-party runtime
//!
//! Both parties' shares live in one process. Linear operations act on each
//! share independently; multiplication runs the Beaver protocol over
//! Z_2^64 and then hands the double-scale product to the dealer for
//! truncation and re-sharing. Division, comparison bits, square roots and
//! random draws are dealer-assisted: the dealer reconstructs its inputs,
//! computes in the clear and re-shares the output with fresh randomness.
//! Nothing the dealer sees is returned to either party in the clear.

use std::collections::{HashMap, VecDeque};

use obliv_fixed_point::{Fixed, FixedPointError, FixedVector, MAX_SCALE};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::beaver::{beaver_multiply, TripleDealer};
use crate::config::RuntimeConfig;
use crate::error::{Result, SharingError};
use crate::runtime::SecretRuntime;
use crate::share::{SharePair, SharedScalar};

/// Operation counters, a proxy for communication cost
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Secret multiplications (Beaver products with truncation)
    pub multiplications: usize,
    /// Values opened to both parties (Beaver masks and reveals)
    pub openings: usize,
    /// Oblivious comparisons
    pub comparisons: usize,
    /// Secret divisions
    pub divisions: usize,
    /// Secret square roots
    pub square_roots: usize,
    /// Secret random draws
    pub random_draws: usize,
    /// Shares requested from input channels
    pub shares_in: usize,
    /// Shares sent to output channels
    pub shares_out: usize,
}

/// Two-party additive-sharing runtime running in a single process
pub struct LocalRuntime {
    config: RuntimeConfig,
    rng: ChaCha20Rng,
    dealer: TripleDealer,
    inputs: HashMap<u32, VecDeque<SharedScalar>>,
    outputs: HashMap<u32, Vec<SharedScalar>>,
    stats: RuntimeStats,
}

impl LocalRuntime {
    /// Create a runtime, validating the configured scale
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        if config.scale > MAX_SCALE {
            return Err(FixedPointError::InvalidScale(config.scale).into());
        }
        Ok(Self::build(config))
    }

    /// Runtime at the default scale with a fixed seed
    pub fn with_seed(seed: u64) -> Self {
        Self::build(RuntimeConfig::default().with_seed(seed))
    }

    fn build(config: RuntimeConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let dealer = TripleDealer::new(rng.next_u64(), config.triple_batch);

        tracing::debug!(
            scale = config.scale,
            triple_batch = config.triple_batch,
            "Local runtime initialised"
        );

        Self {
            config,
            rng,
            dealer,
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            stats: RuntimeStats::default(),
        }
    }

    /// Get runtime config
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Operation counters so far
    pub fn stats(&self) -> RuntimeStats {
        self.stats
    }

    /// Emit the operation counters
    pub fn log_stats(&self) {
        let s = &self.stats;
        tracing::info!(
            multiplications = s.multiplications,
            openings = s.openings,
            comparisons = s.comparisons,
            divisions = s.divisions,
            square_roots = s.square_roots,
            random_draws = s.random_draws,
            shares_in = s.shares_in,
            shares_out = s.shares_out,
            triples = self.dealer.issued(),
            "Runtime statistics"
        );
    }

    /// Secret-share a plaintext value (the input party's role)
    pub fn share(&mut self, value: Fixed) -> Result<SharedScalar> {
        self.check_scale(value)?;
        Ok(self.reshare(value.raw))
    }

    /// Encode and secret-share a float at the runtime scale
    pub fn share_f64(&mut self, value: f64) -> Result<SharedScalar> {
        let fixed = Fixed::from_f64(value, self.config.scale)?;
        self.share(fixed)
    }

    /// Encode and secret-share a slice of floats, in order
    pub fn share_f64_slice(&mut self, values: &[f64]) -> Result<Vec<SharedScalar>> {
        values.iter().map(|&v| self.share_f64(v)).collect()
    }

    /// Queue shares of `values` on an input channel
    ///
    /// The raw integers are shared as-is, whatever their scale; loading them
    /// reinterprets them at the runtime scale.
    pub fn provide_input(&mut self, channel: u32, values: &FixedVector) {
        let pair = SharePair::from_plaintext_with_rng(values, &mut self.rng);
        tracing::debug!(channel, count = pair.len(), "Queued input shares");
        self.inputs.entry(channel).or_default().extend(pair.scalars());
    }

    /// Shares still waiting on an input channel
    pub fn pending_inputs(&self, channel: u32) -> usize {
        self.inputs.get(&channel).map_or(0, VecDeque::len)
    }

    /// Drain and reconstruct everything sent on an output channel, in order
    pub fn take_output(&mut self, channel: u32) -> Result<FixedVector> {
        let sent = self.outputs.remove(&channel).unwrap_or_default();
        tracing::debug!(channel, count = sent.len(), "Collected output shares");
        SharePair::from_scalars(&sent, self.config.scale).reconstruct()
    }

    fn check_scale(&self, value: Fixed) -> Result<()> {
        if value.scale != self.config.scale {
            return Err(SharingError::ScaleMismatch {
                expected: self.config.scale,
                got: value.scale,
            });
        }
        Ok(())
    }

    fn reshare(&mut self, raw: i64) -> SharedScalar {
        SharedScalar::share_with_rng(raw, &mut self.rng)
    }

    fn fixed(&self, raw: i64) -> Fixed {
        Fixed {
            raw,
            scale: self.config.scale,
        }
    }
}

impl SecretRuntime for LocalRuntime {
    type Scalar = SharedScalar;

    fn scale(&self) -> u8 {
        self.config.scale
    }

    fn constant_raw(&self, raw: i64) -> SharedScalar {
        SharedScalar::public(raw)
    }

    fn add(&self, a: &SharedScalar, b: &SharedScalar) -> SharedScalar {
        a.add(b)
    }

    fn sub(&self, a: &SharedScalar, b: &SharedScalar) -> SharedScalar {
        a.sub(b)
    }

    fn neg(&self, a: &SharedScalar) -> SharedScalar {
        a.neg()
    }

    fn mul_public(&self, a: &SharedScalar, k: i64) -> SharedScalar {
        a.mul_public(k)
    }

    fn mul(&mut self, a: &SharedScalar, b: &SharedScalar) -> Result<SharedScalar> {
        let triple = self.dealer.next_triple();
        let product = beaver_multiply(a, b, &triple);
        self.stats.multiplications += 1;
        self.stats.openings += 2;

        // Product carries 2*scale fractional bits; the dealer truncates
        let truncated = product.reconstruct_raw() >> self.config.scale;
        Ok(self.reshare(truncated))
    }

    fn div(&mut self, a: &SharedScalar, b: &SharedScalar) -> Result<SharedScalar> {
        self.stats.divisions += 1;
        let quotient = self
            .fixed(a.reconstruct_raw())
            .saturating_div(self.fixed(b.reconstruct_raw()));
        Ok(self.reshare(quotient.raw))
    }

    fn compare_and_select(
        &mut self,
        a: &SharedScalar,
        b: &SharedScalar,
        then_val: &SharedScalar,
        else_val: &SharedScalar,
    ) -> Result<SharedScalar> {
        self.stats.comparisons += 1;
        let bit = i64::from(a.reconstruct_raw() > b.reconstruct_raw());
        let bit = self.reshare(bit);

        // else + bit * (then - else), bit is an integer so no truncation
        let triple = self.dealer.next_triple();
        let selected = beaver_multiply(&bit, &then_val.sub(else_val), &triple);
        self.stats.openings += 2;

        Ok(else_val.add(&selected))
    }

    fn sqrt(&mut self, a: &SharedScalar) -> Result<SharedScalar> {
        self.stats.square_roots += 1;
        // Negative inputs have no root; they come back as zero
        let root = self
            .fixed(a.reconstruct_raw())
            .sqrt()
            .map(|r| r.raw)
            .unwrap_or(0);
        Ok(self.reshare(root))
    }

    fn random_in_range(&mut self, low: Fixed, high: Fixed) -> Result<SharedScalar> {
        self.check_scale(low)?;
        self.check_scale(high)?;
        if low.raw > high.raw {
            return Err(SharingError::InvalidRange {
                low: low.to_f64(),
                high: high.to_f64(),
            });
        }
        self.stats.random_draws += 1;
        let raw = self.rng.gen_range(low.raw..=high.raw);
        Ok(self.reshare(raw))
    }

    fn reveal(&mut self, a: &SharedScalar) -> Result<Fixed> {
        self.stats.openings += 1;
        Ok(Fixed::from_raw(a.reconstruct_raw(), self.config.scale)?)
    }

    fn request_share(&mut self, channel: u32) -> Result<SharedScalar> {
        let share = self
            .inputs
            .get_mut(&channel)
            .and_then(VecDeque::pop_front)
            .ok_or(SharingError::ChannelExhausted { channel })?;
        self.stats.shares_in += 1;
        tracing::trace!(channel, "Share requested");
        Ok(share)
    }

    fn send_share(&mut self, channel: u32, value: &SharedScalar) -> Result<()> {
        self.outputs.entry(channel).or_default().push(value.clone());
        self.stats.shares_out += 1;
        tracing::trace!(channel, "Share sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obliv_fixed_point::DEFAULT_SCALE;

    fn reveal_f64(rt: &mut LocalRuntime, s: &SharedScalar) -> f64 {
        rt.reveal(s).unwrap().to_f64()
    }

    #[test]
    fn test_mul_and_div() {
        let mut rt = LocalRuntime::with_seed(1);
        let a = rt.share_f64(3.5).unwrap();
        let b = rt.share_f64(-2.0).unwrap();

        let prod = rt.mul(&a, &b).unwrap();
        assert!((reveal_f64(&mut rt, &prod) + 7.0).abs() < 1e-5);

        let quot = rt.div(&a, &b).unwrap();
        assert!((reveal_f64(&mut rt, &quot) + 1.75).abs() < 1e-5);

        assert_eq!(rt.stats().multiplications, 1);
        assert_eq!(rt.stats().divisions, 1);
    }

    #[test]
    fn test_div_by_secret_zero_saturates() {
        let mut rt = LocalRuntime::with_seed(2);
        let a = rt.share_f64(1.0).unwrap();
        let zero = rt.zero();
        let garbage = rt.div(&a, &zero).unwrap();
        assert_eq!(rt.reveal(&garbage).unwrap().raw, i64::MAX);
    }

    #[test]
    fn test_compare_and_select() {
        let mut rt = LocalRuntime::with_seed(3);
        let a = rt.share_f64(2.0).unwrap();
        let b = rt.share_f64(-1.0).unwrap();
        let then_val = rt.share_f64(10.0).unwrap();
        let else_val = rt.share_f64(20.0).unwrap();

        let picked = rt.compare_and_select(&a, &b, &then_val, &else_val).unwrap();
        assert!((reveal_f64(&mut rt, &picked) - 10.0).abs() < 1e-6);

        let picked = rt.compare_and_select(&b, &a, &then_val, &else_val).unwrap();
        assert!((reveal_f64(&mut rt, &picked) - 20.0).abs() < 1e-6);

        // Equal operands are not greater
        let picked = rt.compare_and_select(&a, &a, &then_val, &else_val).unwrap();
        assert!((reveal_f64(&mut rt, &picked) - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_sqrt() {
        let mut rt = LocalRuntime::with_seed(4);
        let a = rt.share_f64(6.25).unwrap();
        let root = rt.sqrt(&a).unwrap();
        assert!((reveal_f64(&mut rt, &root) - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_sqrt_of_negative_is_zero() {
        let mut rt = LocalRuntime::with_seed(4);
        let a = rt.share_f64(-4.0).unwrap();
        let root = rt.sqrt(&a).unwrap();
        assert_eq!(rt.reveal(&root).unwrap().raw, 0);
        assert_eq!(rt.stats().square_roots, 1);
    }

    #[test]
    fn test_product_wraps_past_ring_headroom() {
        let mut rt = LocalRuntime::with_seed(8);

        // 2000 * 4000 = 8e6 < 2^23 stays exact
        let a = rt.share_f64(2000.0).unwrap();
        let b = rt.share_f64(4000.0).unwrap();
        let prod = rt.mul(&a, &b).unwrap();
        assert_eq!(reveal_f64(&mut rt, &prod), 8_000_000.0);

        // 2^12 * 2^12 = 2^24 needs 2^64 at double scale and wraps to zero
        let c = rt.share_f64(4096.0).unwrap();
        let prod = rt.mul(&c, &c).unwrap();
        assert_eq!(rt.reveal(&prod).unwrap().raw, 0);
    }

    #[test]
    fn test_share_checks_scale() {
        let mut rt = LocalRuntime::with_seed(9);
        let value = Fixed::from_f64_default(1.25).unwrap();
        let s = rt.share(value).unwrap();
        assert_eq!(rt.reveal(&s).unwrap(), value);
        assert_eq!(rt.config().scale, DEFAULT_SCALE);

        let wrong = Fixed::from_f64(1.25, 12).unwrap();
        assert!(matches!(
            rt.share(wrong),
            Err(SharingError::ScaleMismatch { expected: DEFAULT_SCALE, got: 12 })
        ));
    }

    #[test]
    fn test_random_in_range() {
        let mut rt = LocalRuntime::with_seed(5);
        let low = Fixed::from_f64_default(-0.5).unwrap();
        let high = Fixed::from_f64_default(0.5).unwrap();
        for _ in 0..50 {
            let r = rt.random_in_range(low, high).unwrap();
            let v = reveal_f64(&mut rt, &r);
            assert!((-0.5..=0.5).contains(&v));
        }
        assert!(matches!(
            rt.random_in_range(high, low),
            Err(SharingError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_channels_preserve_order() {
        let mut rt = LocalRuntime::with_seed(6);
        let input = FixedVector::from_f64_slice_default(&[1.0, -2.0, 3.0]).unwrap();
        rt.provide_input(0, &input);
        assert_eq!(rt.pending_inputs(0), 3);

        for _ in 0..3 {
            let share = rt.request_share(0).unwrap();
            rt.send_share(1, &share).unwrap();
        }
        assert!(matches!(
            rt.request_share(0),
            Err(SharingError::ChannelExhausted { channel: 0 })
        ));
        assert_eq!(rt.take_output(1).unwrap(), input);
        assert_eq!(rt.stats().shares_in, 3);
        assert_eq!(rt.stats().shares_out, 3);
    }

    #[test]
    fn test_constant_scale_check() {
        let rt = LocalRuntime::with_seed(7);
        let wrong = Fixed::from_f64(1.0, 16).unwrap();
        assert!(matches!(
            rt.constant(wrong),
            Err(SharingError::ScaleMismatch { expected: DEFAULT_SCALE, got: 16 })
        ));
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let config = RuntimeConfig::default().with_scale(MAX_SCALE + 1);
        assert!(matches!(
            LocalRuntime::new(config),
            Err(SharingError::FixedPoint(FixedPointError::InvalidScale(_)))
        ));
    }
}
