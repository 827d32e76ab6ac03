//! Oblivious Gauss-Jordan elimination and matrix inversion
//!
//! The sequence of row operations depends only on the matrix dimension.
//! Without pivoting no row is ever chosen by value: the diagonal entry is
//! used as the divisor as-is, so a zero pivot corrupts the result instead of
//! raising an error. Callers must supply well-conditioned, invertible input.
//!
//! [`Pivoting::Oblivious`] trades extra comparisons for numerical
//! robustness: before eliminating column `i`, every lower row is
//! conditionally swapped with row `i` when its entry in that column is larger
//! in absolute value. The swap is a compare-and-select on every entry of
//! both rows, so the schedule stays data independent.

use obliv_sharing::SecretRuntime;

use crate::error::{check_len, LinalgError, Result};
use crate::matrix::SecretMatrix;
use crate::vector::SecretVector;

/// Row-selection strategy for elimination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Pivoting {
    /// Use each diagonal entry as the pivot, whatever its value
    #[default]
    None,
    /// Oblivious partial pivoting by conditional row swaps
    Oblivious,
}

/// Eliminate column `col` of `target_row` against `pivot_row`
///
/// Computes `factor = (target_row[col] - target) / pivot_row[col]` and then
/// `target_row -= factor * pivot_row` entry by entry. When both rows are the
/// same and `target` is one, this scales the row so its entry in `col`
/// becomes one.
pub fn eliminate<R: SecretRuntime>(
    rt: &mut R,
    matrix: &mut SecretMatrix<R::Scalar>,
    pivot_row: usize,
    target_row: usize,
    col: usize,
    target: &R::Scalar,
) -> Result<()> {
    for (index, bound) in [
        (pivot_row, matrix.rows()),
        (target_row, matrix.rows()),
        (col, matrix.cols()),
    ] {
        if index >= bound {
            return Err(LinalgError::IndexOutOfRange {
                op: "eliminate",
                index,
                bound,
            });
        }
    }

    // Copy first: pivot and target may be the same row
    let pivot = matrix.row(pivot_row);
    let numerator = rt.sub(matrix.get(target_row, col), target);
    let factor = rt.div(&numerator, &pivot[col])?;

    for (k, p) in pivot.iter().enumerate() {
        let delta = rt.mul(&factor, p)?;
        let updated = rt.sub(matrix.get(target_row, k), &delta);
        matrix.set(target_row, k, updated);
    }
    Ok(())
}

/// Reduce the leading rows × rows block of `matrix` to the identity, in place
///
/// Forward pass clears below the diagonal (pivot rows top to bottom, target
/// rows top to bottom), backward pass clears above it (pivot rows bottom to
/// top, target rows bottom to top), and a final pass scales every row so its
/// diagonal entry is one. The remaining columns carry the same row
/// operations.
pub fn gauss_jordan<R: SecretRuntime>(
    rt: &mut R,
    matrix: &mut SecretMatrix<R::Scalar>,
    pivoting: Pivoting,
) -> Result<()> {
    let n = matrix.rows();
    if matrix.cols() < n {
        return Err(LinalgError::ShapeMismatch {
            op: "gauss_jordan",
            expected: (n, n),
            got: matrix.shape(),
        });
    }

    let zero = rt.zero();
    let one = rt.one();

    for i in 0..n {
        if pivoting == Pivoting::Oblivious {
            pivot_column(rt, matrix, i)?;
        }
        for j in i + 1..n {
            eliminate(rt, matrix, i, j, i, &zero)?;
        }
    }
    tracing::debug!(n, "Forward elimination done");

    for i in (0..n).rev() {
        for j in (0..i).rev() {
            eliminate(rt, matrix, i, j, i, &zero)?;
        }
    }
    tracing::debug!(n, "Backward elimination done");

    for i in 0..n {
        eliminate(rt, matrix, i, i, i, &one)?;
    }
    Ok(())
}

/// Invert a square matrix by Gauss-Jordan elimination without pivoting
pub fn matrix_inverse<R: SecretRuntime>(
    rt: &mut R,
    matrix: &SecretMatrix<R::Scalar>,
) -> Result<SecretMatrix<R::Scalar>> {
    matrix_inverse_with(rt, matrix, Pivoting::None)
}

/// Invert a square matrix with the given pivoting strategy
///
/// Reduces `[A | I]` and returns its right half.
pub fn matrix_inverse_with<R: SecretRuntime>(
    rt: &mut R,
    matrix: &SecretMatrix<R::Scalar>,
    pivoting: Pivoting,
) -> Result<SecretMatrix<R::Scalar>> {
    let n = matrix.rows();
    if matrix.cols() != n {
        return Err(LinalgError::ShapeMismatch {
            op: "matrix_inverse",
            expected: (n, n),
            got: matrix.shape(),
        });
    }

    tracing::info!(n, ?pivoting, "Inverting secret matrix");
    let identity = SecretMatrix::identity(&*rt, n, n);
    let mut augmented = matrix.join_cols(&identity)?;
    gauss_jordan(rt, &mut augmented, pivoting)?;
    augmented.slice_cols(n, n)
}

/// Solve `A x = b` for square `A` by reducing `[A | b]`
pub fn solve<R: SecretRuntime>(
    rt: &mut R,
    matrix: &SecretMatrix<R::Scalar>,
    rhs: &SecretVector<R::Scalar>,
    pivoting: Pivoting,
) -> Result<SecretVector<R::Scalar>> {
    let n = matrix.rows();
    if matrix.cols() != n {
        return Err(LinalgError::ShapeMismatch {
            op: "solve",
            expected: (n, n),
            got: matrix.shape(),
        });
    }
    check_len("solve", n, rhs.len())?;

    let mut augmented = matrix.join_cols(&rhs.to_column_matrix())?;
    gauss_jordan(rt, &mut augmented, pivoting)?;
    Ok(augmented.slice_cols(n, 1)?.to_vector())
}

/// Conditionally swap each lower row into position `col` when its entry in
/// column `col` is larger in absolute value than the current pivot
fn pivot_column<R: SecretRuntime>(
    rt: &mut R,
    matrix: &mut SecretMatrix<R::Scalar>,
    col: usize,
) -> Result<()> {
    for candidate in col + 1..matrix.rows() {
        let current = secret_abs(rt, matrix.get(col, col))?;
        let challenger = secret_abs(rt, matrix.get(candidate, col))?;

        for k in 0..matrix.cols() {
            let upper = matrix.get(col, k).clone();
            let lower = matrix.get(candidate, k).clone();
            let new_upper = rt.compare_and_select(&challenger, &current, &lower, &upper)?;
            // upper + lower is preserved by a swap
            let total = rt.add(&upper, &lower);
            let new_lower = rt.sub(&total, &new_upper);
            matrix.set(col, k, new_upper);
            matrix.set(candidate, k, new_lower);
        }
    }
    Ok(())
}

fn secret_abs<R: SecretRuntime>(rt: &mut R, x: &R::Scalar) -> Result<R::Scalar> {
    let zero = rt.zero();
    let negated = rt.neg(x);
    Ok(rt.compare_and_select(x, &zero, x, &negated)?)
}
