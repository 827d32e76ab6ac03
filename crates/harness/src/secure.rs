//! Secure computation driver
//!
//! Feeds plaintext inputs through the share channel of a [`LocalRuntime`],
//! runs the oblivious algorithms and checks what they reveal against the
//! plaintext reference.

use obliv_fixed_point::FixedVector;
use obliv_linalg::{
    column_summary, fit_linear_regression, kmeans_from, matrix_inverse_with, Pivoting,
    SecretMatrix, SecretVector, ShareIo,
};
use obliv_sharing::{LocalRuntime, RuntimeConfig, RuntimeStats, SecretRuntime, SharedScalar};

use crate::error::{HarnessError, Result};
use crate::plaintext::{max_abs_diff, PlainMatrix};

const INPUT_CHANNEL: u32 = 0;
const OUTPUT_CHANNEL: u32 = 1;

/// Outcome of one verified computation
#[derive(Debug, Clone)]
pub struct Report {
    /// Revealed secure result, one row per output row
    pub secure: Vec<Vec<f64>>,
    /// Plaintext reference result
    pub reference: Vec<Vec<f64>>,
    /// Largest entry-wise difference between the two
    pub max_error: f64,
    /// Runtime counters for the whole computation
    pub stats: RuntimeStats,
}

impl Report {
    /// Fail unless every entry is within `tolerance` of the reference
    pub fn check(&self, tolerance: f64) -> Result<()> {
        if self.max_error > tolerance {
            return Err(HarnessError::VerificationFailed {
                message: format!(
                    "max error {:.3e} exceeds tolerance {:.3e}",
                    self.max_error, tolerance
                ),
            });
        }
        Ok(())
    }
}

/// Oblivious computations over an in-process runtime
pub struct SecureSession {
    rt: LocalRuntime,
    io: ShareIo,
}

impl SecureSession {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let rt = LocalRuntime::new(config)?;
        let io = ShareIo::new(INPUT_CHANNEL, rt.scale());
        Ok(Self { rt, io })
    }

    pub fn runtime(&self) -> &LocalRuntime {
        &self.rt
    }

    /// Encode a plaintext matrix, queue it on the input channel and load it
    pub fn load_matrix(&mut self, m: &PlainMatrix) -> Result<SecretMatrix<SharedScalar>> {
        let encoded = FixedVector::from_f64_slice(&m.data, self.rt.scale())?;
        self.rt.provide_input(self.io.channel(), &encoded);
        Ok(self.io.load_matrix(&mut self.rt, m.rows, m.cols)?)
    }

    pub fn load_vector(&mut self, v: &[f64]) -> Result<SecretVector<SharedScalar>> {
        let encoded = FixedVector::from_f64_slice(v, self.rt.scale())?;
        self.rt.provide_input(self.io.channel(), &encoded);
        Ok(self.io.load_vector(&mut self.rt, v.len())?)
    }

    /// Send a secret matrix out and collect it as rows of floats
    pub fn output_matrix(&mut self, m: &SecretMatrix<SharedScalar>) -> Result<Vec<Vec<f64>>> {
        let out = ShareIo::new(OUTPUT_CHANNEL, self.rt.scale());
        out.output_matrix(&mut self.rt, m)?;
        let flat = self.rt.take_output(out.channel())?.to_f64_vec();
        if m.cols() == 0 {
            return Ok(vec![Vec::new(); m.rows()]);
        }
        Ok(flat.chunks(m.cols()).map(<[f64]>::to_vec).collect())
    }

    /// Invert `m` obliviously and compare with the plaintext inverse
    pub fn invert(&mut self, m: &PlainMatrix, pivoting: Pivoting) -> Result<Report> {
        let reference = m.inverse()?.to_rows();
        let before = self.rt.stats();

        let secret = self.load_matrix(m)?;
        let inverse = matrix_inverse_with(&mut self.rt, &secret, pivoting)?;
        let secure = self.output_matrix(&inverse)?;

        Ok(Report {
            max_error: max_abs_diff(&secure, &reference),
            secure,
            reference,
            stats: diff_stats(self.rt.stats(), before),
        })
    }

    /// Fit least squares obliviously and compare the coefficients
    pub fn fit(&mut self, x: &PlainMatrix, y: &[f64], fit_intercept: bool) -> Result<Report> {
        let reference = vec![x.least_squares(y, fit_intercept)?];
        let before = self.rt.stats();

        let secret_x = self.load_matrix(x)?;
        let secret_y = self.load_vector(y)?;
        let model = fit_linear_regression(&mut self.rt, &secret_x, &secret_y, fit_intercept)?;
        let secure = vec![model.coefficients.reveal(&mut self.rt)?.to_f64_vec()];

        Ok(Report {
            max_error: max_abs_diff(&secure, &reference),
            secure,
            reference,
            stats: diff_stats(self.rt.stats(), before),
        })
    }

    /// Summarize every column obliviously and compare with plaintext
    ///
    /// Report rows are mean, standard deviation, min and max.
    pub fn stats(&mut self, x: &PlainMatrix) -> Result<Report> {
        let reference = x.column_summary()?;
        let before = self.rt.stats();

        let secret_x = self.load_matrix(x)?;
        let summary = column_summary(&mut self.rt, &secret_x)?;
        let secure = self.output_matrix(&summary.to_matrix()?)?;

        Ok(Report {
            max_error: max_abs_diff(&secure, &reference),
            secure,
            reference,
            stats: diff_stats(self.rt.stats(), before),
        })
    }

    /// Run k-means from `initial` obliviously and compare with plaintext
    ///
    /// Report rows are the centres followed by one row of cluster sizes.
    pub fn kmeans(
        &mut self,
        x: &PlainMatrix,
        initial: &PlainMatrix,
        iterations: usize,
    ) -> Result<Report> {
        let (centres, sizes) = x.kmeans(initial, iterations)?;
        let mut reference = centres.to_rows();
        reference.push(sizes);
        let before = self.rt.stats();

        let secret_x = self.load_matrix(x)?;
        let secret_initial = self.load_matrix(initial)?;
        let clustering = kmeans_from(&mut self.rt, &secret_x, &secret_initial, iterations)?;
        let mut secure = self.output_matrix(&clustering.centres)?;
        secure.push(clustering.sizes.reveal(&mut self.rt)?.to_f64_vec());

        Ok(Report {
            max_error: max_abs_diff(&secure, &reference),
            secure,
            reference,
            stats: diff_stats(self.rt.stats(), before),
        })
    }
}

fn diff_stats(after: RuntimeStats, before: RuntimeStats) -> RuntimeStats {
    RuntimeStats {
        multiplications: after.multiplications - before.multiplications,
        openings: after.openings - before.openings,
        comparisons: after.comparisons - before.comparisons,
        divisions: after.divisions - before.divisions,
        square_roots: after.square_roots - before.square_roots,
        random_draws: after.random_draws - before.random_draws,
        shares_in: after.shares_in - before.shares_in,
        shares_out: after.shares_out - before.shares_out,
    }
}
