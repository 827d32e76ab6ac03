//! Ordinary least squares over secret data
//!
//! Solves the normal equations `w = (XᵀX)⁻¹ Xᵀy` with the elimination
//! engine. The Gram matrix of a full-rank design is symmetric positive
//! definite, so the no-pivot inverse is well defined on it.

use obliv_fixed_point::Fixed;
use obliv_sharing::SecretRuntime;

use crate::elimination::{matrix_inverse_with, Pivoting};
use crate::error::{check_len, Result};
use crate::matrix::SecretMatrix;
use crate::vector::SecretVector;

/// Fitted linear model with secret coefficients
#[derive(Debug, Clone)]
pub struct LinearModel<S> {
    /// Intercept first when `fit_intercept` is set, then one weight per feature
    pub coefficients: SecretVector<S>,
    pub fit_intercept: bool,
}

impl<S: Clone> LinearModel<S> {
    /// Secret predictions for every row of `x`
    pub fn predict<R>(&self, rt: &mut R, x: &SecretMatrix<S>) -> Result<SecretVector<S>>
    where
        R: SecretRuntime<Scalar = S>,
    {
        let design = design_matrix(&*rt, x, self.fit_intercept)?;
        design.mat_vec_mul(rt, &self.coefficients)
    }
}

/// Fit `y ≈ X w` by least squares
///
/// `x` holds one sample per row. With `fit_intercept` a leading column of
/// ones is prepended, and the first coefficient is the intercept.
pub fn fit_linear_regression<R: SecretRuntime>(
    rt: &mut R,
    x: &SecretMatrix<R::Scalar>,
    y: &SecretVector<R::Scalar>,
    fit_intercept: bool,
) -> Result<LinearModel<R::Scalar>> {
    check_len("fit_linear_regression", x.rows(), y.len())?;

    let design = design_matrix(&*rt, x, fit_intercept)?;
    tracing::info!(
        samples = design.rows(),
        features = design.cols(),
        "Fitting linear regression"
    );

    let xt = design.transpose();
    let gram = xt.matmul(rt, &design)?;
    let moments = xt.mat_vec_mul(rt, y)?;
    let gram_inv = matrix_inverse_with(rt, &gram, Pivoting::None)?;
    let coefficients = gram_inv.mat_vec_mul(rt, &moments)?;

    Ok(LinearModel {
        coefficients,
        fit_intercept,
    })
}

fn design_matrix<R: SecretRuntime>(
    rt: &R,
    x: &SecretMatrix<R::Scalar>,
    fit_intercept: bool,
) -> Result<SecretMatrix<R::Scalar>> {
    if !fit_intercept {
        return Ok(x.clone());
    }
    let one = Fixed::one(rt.scale())?;
    let ones = SecretMatrix::constant(rt, x.rows(), 1, one)?;
    ones.join_cols(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use obliv_sharing::{LocalRuntime, SharedScalar};

    fn secret_matrix(rt: &mut LocalRuntime, rows: &[&[f64]]) -> SecretMatrix<SharedScalar> {
        let vectors = rows
            .iter()
            .map(|r| SecretVector::from_vec(rt.share_f64_slice(r).unwrap()))
            .collect();
        SecretMatrix::from_rows(vectors).unwrap()
    }

    #[test]
    fn test_fit_with_intercept() {
        let mut rt = LocalRuntime::with_seed(1);
        // y = 1 + 2 x1 - x2, exactly
        let x = secret_matrix(
            &mut rt,
            &[&[0.0, 1.0], &[1.0, 0.0], &[2.0, 1.0], &[1.0, 2.0], &[3.0, 3.0]],
        );
        let y = SecretVector::from_vec(rt.share_f64_slice(&[0.0, 3.0, 4.0, 1.0, 4.0]).unwrap());

        let model = fit_linear_regression(&mut rt, &x, &y, true).unwrap();
        let w = model.coefficients.reveal(&mut rt).unwrap().to_f64_vec();
        assert_eq!(w.len(), 3);
        for (got, expected) in w.iter().zip([1.0, 2.0, -1.0]) {
            assert!((got - expected).abs() < 1e-2, "{} vs {}", got, expected);
        }

        let fitted = model.predict(&mut rt, &x).unwrap();
        let fitted = fitted.reveal(&mut rt).unwrap().to_f64_vec();
        for (got, expected) in fitted.iter().zip([0.0, 3.0, 4.0, 1.0, 4.0]) {
            assert!((got - expected).abs() < 5e-2);
        }
    }

    #[test]
    fn test_fit_without_intercept() {
        let mut rt = LocalRuntime::with_seed(2);
        let x = secret_matrix(&mut rt, &[&[1.0], &[2.0], &[3.0]]);
        let y = SecretVector::from_vec(rt.share_f64_slice(&[1.5, 3.0, 4.5]).unwrap());

        let model = fit_linear_regression(&mut rt, &x, &y, false).unwrap();
        let w = model.coefficients.reveal(&mut rt).unwrap().to_f64_vec();
        assert!((w[0] - 1.5).abs() < 1e-3);
    }

    #[test]
    fn test_sample_count_mismatch() {
        let mut rt = LocalRuntime::with_seed(3);
        let x = secret_matrix(&mut rt, &[&[1.0], &[2.0]]);
        let y = SecretVector::from_vec(rt.share_f64_slice(&[1.0]).unwrap());
        assert!(fit_linear_regression(&mut rt, &x, &y, true).is_err());
    }
}
