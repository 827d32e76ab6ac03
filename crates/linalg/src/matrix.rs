//! Secret matrix algebra

use std::io::Write;

use obliv_fixed_point::{Fixed, FixedVector};
use obliv_sharing::SecretRuntime;

use crate::error::{check_len, check_shape, LinalgError, Result};
use crate::vector::SecretVector;

/// Direction of a column fold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Extreme {
    Max,
    Min,
}

/// A rows × cols grid of secret fixed-point values, row-major
///
/// Dimensions are fixed at construction. Every operation, including
/// [`slice_rows`](Self::slice_rows) and [`join_cols`](Self::join_cols),
/// returns a fresh copy; no result is a view into its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretMatrix<S> {
    /// Matrix data in row-major order
    data: Vec<S>,
    rows: usize,
    cols: usize,
}

impl<S: Clone> SecretMatrix<S> {
    pub(crate) fn from_row_major(data: Vec<S>, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { data, rows, cols }
    }

    /// Build from equal-length row vectors
    pub fn from_rows(rows: Vec<SecretVector<S>>) -> Result<Self> {
        let cols = rows.first().map_or(0, SecretVector::len);
        let n = rows.len();
        let mut data = Vec::with_capacity(n * cols);
        for row in rows {
            check_len("matrix_from_rows", cols, row.len())?;
            data.extend(row.into_vec());
        }
        Ok(Self {
            data,
            rows: n,
            cols,
        })
    }

    /// Reshape a vector (row-major) into a rows × cols matrix
    pub fn from_vector(vector: SecretVector<S>, rows: usize, cols: usize) -> Result<Self> {
        check_len("matrix_from_vector", rows * cols, vector.len())?;
        Ok(Self {
            data: vector.into_vec(),
            rows,
            cols,
        })
    }

    /// Matrix of secret zeros
    pub fn zeros<R>(rt: &R, rows: usize, cols: usize) -> Self
    where
        R: SecretRuntime<Scalar = S>,
    {
        Self {
            data: vec![rt.zero(); rows * cols],
            rows,
            cols,
        }
    }

    /// Matrix with every entry set to the public constant `value`
    pub fn constant<R>(rt: &R, rows: usize, cols: usize, value: Fixed) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        let c = rt.constant(value)?;
        Ok(Self {
            data: vec![c; rows * cols],
            rows,
            cols,
        })
    }

    /// Matrix with entries drawn independently and uniformly from [-bound, bound]
    pub fn random<R>(rt: &mut R, rows: usize, cols: usize, bound: Fixed) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        let entries = SecretVector::random(rt, rows * cols, bound)?;
        Self::from_vector(entries, rows, cols)
    }

    /// Generalized rows × cols identity: one where row index equals column index
    ///
    /// The test is on public loop indices only.
    pub fn identity<R>(rt: &R, rows: usize, cols: usize) -> Self
    where
        R: SecretRuntime<Scalar = S>,
    {
        let one = rt.one();
        let zero = rt.zero();
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(if i == j { one.clone() } else { zero.clone() });
            }
        }
        Self { data, rows, cols }
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Get element at (row, col)
    pub fn get(&self, row: usize, col: usize) -> &S {
        &self.data[row * self.cols + col]
    }

    /// Replace element at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: S) {
        self.data[row * self.cols + col] = value;
    }

    /// Borrow one row
    pub fn row_slice(&self, row: usize) -> &[S] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Copy one row out as a vector
    pub fn row(&self, row: usize) -> SecretVector<S> {
        SecretVector::from_vec(self.row_slice(row).to_vec())
    }

    /// Overwrite one row
    pub fn assign_row(&mut self, row: usize, vector: &SecretVector<S>) -> Result<()> {
        check_len("matrix_assign_row", self.cols, vector.len())?;
        if row >= self.rows {
            return Err(LinalgError::IndexOutOfRange {
                op: "matrix_assign_row",
                index: row,
                bound: self.rows,
            });
        }
        let start = row * self.cols;
        self.data[start..start + self.cols].clone_from_slice(vector.as_slice());
        Ok(())
    }

    /// Flatten in row-major order
    pub fn to_vector(&self) -> SecretVector<S> {
        SecretVector::from_vec(self.data.clone())
    }

    /// Element-wise addition
    pub fn add<R>(&self, rt: &R, other: &Self) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        check_shape("matrix_add", self.shape(), other.shape())?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| rt.add(a, b))
            .collect();
        Ok(self.with_data(data))
    }

    /// Element-wise subtraction
    pub fn sub<R>(&self, rt: &R, other: &Self) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        check_shape("matrix_sub", self.shape(), other.shape())?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| rt.sub(a, b))
            .collect();
        Ok(self.with_data(data))
    }

    /// Element-wise product
    pub fn mul_elementwise<R>(&self, rt: &mut R, other: &Self) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        check_shape("matrix_mul_elementwise", self.shape(), other.shape())?;
        let mut data = Vec::with_capacity(self.data.len());
        for (a, b) in self.data.iter().zip(&other.data) {
            data.push(rt.mul(a, b)?);
        }
        Ok(self.with_data(data))
    }

    /// Element-wise division, `self / (other + epsilon)`
    ///
    /// The optional public `epsilon` keeps exact zeros out of the denominator.
    pub fn div<R>(&self, rt: &mut R, other: &Self, epsilon: Option<Fixed>) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        check_shape("matrix_div", self.shape(), other.shape())?;
        let epsilon = epsilon.map(|e| rt.constant(e)).transpose()?;
        let mut data = Vec::with_capacity(self.data.len());
        for (a, b) in self.data.iter().zip(&other.data) {
            let q = match &epsilon {
                Some(eps) => {
                    let guarded = rt.add(b, eps);
                    rt.div(a, &guarded)?
                }
                None => rt.div(a, b)?,
            };
            data.push(q);
        }
        Ok(self.with_data(data))
    }

    /// Multiply every entry by one secret scalar
    pub fn scale_by<R>(&self, rt: &mut R, scalar: &S) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        let mut data = Vec::with_capacity(self.data.len());
        for x in &self.data {
            data.push(rt.mul(x, scalar)?);
        }
        Ok(self.with_data(data))
    }

    /// Element-wise square root
    pub fn sqrt_elementwise<R>(&self, rt: &mut R) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        let roots = self.to_vector().sqrt(rt)?;
        Ok(self.with_data(roots.into_vec()))
    }

    /// Matrix product
    ///
    /// Each entry is accumulated by sequential multiply-add in fixed
    /// (i, j, k) order.
    pub fn matmul<R>(&self, rt: &mut R, other: &Self) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        if self.cols != other.rows {
            return Err(LinalgError::ShapeMismatch {
                op: "matmul",
                expected: (self.cols, other.cols),
                got: other.shape(),
            });
        }

        let mut data = Vec::with_capacity(self.rows * other.cols);
        for i in 0..self.rows {
            for j in 0..other.cols {
                let mut acc = rt.zero();
                for k in 0..self.cols {
                    let product = rt.mul(self.get(i, k), other.get(k, j))?;
                    acc = rt.add(&acc, &product);
                }
                data.push(acc);
            }
        }
        Ok(Self::from_row_major(data, self.rows, other.cols))
    }

    /// Matrix-vector product, accumulated in fixed (i, k) order
    pub fn mat_vec_mul<R>(&self, rt: &mut R, vector: &SecretVector<S>) -> Result<SecretVector<S>>
    where
        R: SecretRuntime<Scalar = S>,
    {
        check_len("mat_vec_mul", self.cols, vector.len())?;

        let mut out = Vec::with_capacity(self.rows);
        for i in 0..self.rows {
            let mut acc = rt.zero();
            for (k, v) in vector.iter().enumerate() {
                let product = rt.mul(self.get(i, k), v)?;
                acc = rt.add(&acc, &product);
            }
            out.push(acc);
        }
        Ok(SecretVector::from_vec(out))
    }

    /// New cols × rows matrix
    pub fn transpose(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for j in 0..self.cols {
            for i in 0..self.rows {
                data.push(self.get(i, j).clone());
            }
        }
        Self::from_row_major(data, self.cols, self.rows)
    }

    /// Copy `count` contiguous rows starting at `from`
    pub fn slice_rows(&self, from: usize, count: usize) -> Result<Self> {
        if from + count > self.rows {
            return Err(LinalgError::ShapeMismatch {
                op: "slice_rows",
                expected: (from + count, self.cols),
                got: self.shape(),
            });
        }
        let data = self.data[from * self.cols..(from + count) * self.cols].to_vec();
        Ok(Self::from_row_major(data, count, self.cols))
    }

    /// Copy `count` contiguous columns starting at `from`
    pub fn slice_cols(&self, from: usize, count: usize) -> Result<Self> {
        if from + count > self.cols {
            return Err(LinalgError::ShapeMismatch {
                op: "slice_cols",
                expected: (self.rows, from + count),
                got: self.shape(),
            });
        }
        let mut data = Vec::with_capacity(self.rows * count);
        for i in 0..self.rows {
            data.extend_from_slice(&self.row_slice(i)[from..from + count]);
        }
        Ok(Self::from_row_major(data, self.rows, count))
    }

    /// Side-by-side concatenation, `self`'s columns first
    pub fn join_cols(&self, other: &Self) -> Result<Self> {
        if self.rows != other.rows {
            return Err(LinalgError::ShapeMismatch {
                op: "join_cols",
                expected: (self.rows, other.cols),
                got: other.shape(),
            });
        }
        let cols = self.cols + other.cols;
        let mut data = Vec::with_capacity(self.rows * cols);
        for i in 0..self.rows {
            data.extend_from_slice(self.row_slice(i));
            data.extend_from_slice(other.row_slice(i));
        }
        Ok(Self::from_row_major(data, self.rows, cols))
    }

    /// Divide every column by its maximum, in place
    ///
    /// Column maxima start at secret zero and are folded row by row with
    /// compare-and-select. An entry is replaced by `entry / max` only under
    /// a secret `max > 0` predicate, so columns whose maximum is not positive
    /// are left unchanged. Returns the per-column maxima.
    pub fn normalize_columns<R>(&mut self, rt: &mut R) -> Result<SecretVector<S>>
    where
        R: SecretRuntime<Scalar = S>,
    {
        let zero = rt.zero();
        let maxima = self.fold_columns(rt, vec![zero.clone(); self.cols], Extreme::Max)?;

        for i in 0..self.rows {
            for (j, max) in maxima.iter().enumerate() {
                let x = self.get(i, j).clone();
                let scaled = rt.div(&x, max)?;
                let updated = rt.compare_and_select(max, &zero, &scaled, &x)?;
                self.set(i, j, updated);
            }
        }

        tracing::debug!(rows = self.rows, cols = self.cols, "Normalized columns");
        Ok(SecretVector::from_vec(maxima))
    }

    /// Fold every column into its running extreme, row by row
    ///
    /// `init` seeds each column. An entry replaces the running value only
    /// when it is strictly past it, so ties keep the earlier value.
    pub(crate) fn fold_columns<R>(
        &self,
        rt: &mut R,
        init: Vec<S>,
        extreme: Extreme,
    ) -> Result<Vec<S>>
    where
        R: SecretRuntime<Scalar = S>,
    {
        check_len("fold_columns", self.cols, init.len())?;
        let mut acc = init;
        for i in 0..self.rows {
            for (j, best) in acc.iter_mut().enumerate() {
                let x = self.get(i, j);
                let updated = match extreme {
                    Extreme::Max => rt.compare_and_select(x, best, x, best)?,
                    Extreme::Min => rt.compare_and_select(best, x, x, best)?,
                };
                *best = updated;
            }
        }
        Ok(acc)
    }

    /// Reveal every row
    pub fn reveal<R>(&self, rt: &mut R) -> Result<Vec<FixedVector>>
    where
        R: SecretRuntime<Scalar = S>,
    {
        (0..self.rows).map(|i| self.row(i).reveal(rt)).collect()
    }

    /// Reveal and write every entry, row by row
    pub fn print<R, W>(&self, rt: &mut R, out: &mut W) -> Result<()>
    where
        R: SecretRuntime<Scalar = S>,
        W: Write,
    {
        writeln!(out, "matrix")?;
        for i in 0..self.rows {
            writeln!(out, "row")?;
            for x in self.row_slice(i) {
                writeln!(out, "{}", rt.reveal(x)?)?;
            }
        }
        Ok(())
    }

    fn with_data(&self, data: Vec<S>) -> Self {
        Self::from_row_major(data, self.rows, self.cols)
    }
}
