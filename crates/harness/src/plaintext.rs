//! Plaintext reference implementation
//!
//! Dense f64 matrices used to check what the secure computation reveals.

use rand::Rng;

use crate::error::{HarnessError, Result};

/// Row-major dense matrix of floats
#[derive(Debug, Clone, PartialEq)]
pub struct PlainMatrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl PlainMatrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(HarnessError::InvalidInput(format!(
                "{} values for a {}x{} matrix",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from nested rows; every row must have the same length
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(HarnessError::InvalidInput(format!(
                    "ragged rows: expected {} columns, got {}",
                    cols,
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn identity(n: usize) -> Self {
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Self {
            rows: n,
            cols: n,
            data,
        }
    }

    /// Random matrix whose diagonal dominates each row, hence invertible
    /// without pivoting
    pub fn random_diagonally_dominant<R: Rng>(n: usize, rng: &mut R) -> Self {
        let mut m = Self {
            rows: n,
            cols: n,
            data: (0..n * n).map(|_| rng.gen_range(-1.0..1.0)).collect(),
        };
        for i in 0..n {
            let off_diagonal: f64 = (0..n)
                .filter(|&j| j != i)
                .map(|j| m.get(i, j).abs())
                .sum();
            m.data[i * n + i] = off_diagonal + rng.gen_range(1.0..2.0);
        }
        m
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Rows as owned vectors
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|i| self.row(i).to_vec()).collect()
    }

    pub fn transpose(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for j in 0..self.cols {
            for i in 0..self.rows {
                data.push(self.get(i, j));
            }
        }
        Self {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    pub fn matmul(&self, other: &Self) -> Result<Self> {
        if self.cols != other.rows {
            return Err(HarnessError::InvalidInput(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let mut data = vec![0.0; self.rows * other.cols];
        for i in 0..self.rows {
            for j in 0..other.cols {
                data[i * other.cols + j] = (0..self.cols)
                    .map(|k| self.get(i, k) * other.get(k, j))
                    .sum();
            }
        }
        Ok(Self {
            rows: self.rows,
            cols: other.cols,
            data,
        })
    }

    pub fn mat_vec(&self, v: &[f64]) -> Result<Vec<f64>> {
        if self.cols != v.len() {
            return Err(HarnessError::InvalidInput(format!(
                "cannot multiply {}x{} by vector of length {}",
                self.rows,
                self.cols,
                v.len()
            )));
        }
        Ok((0..self.rows)
            .map(|i| self.row(i).iter().zip(v).map(|(a, b)| a * b).sum())
            .collect())
    }

    /// Gauss-Jordan inverse with partial pivoting
    pub fn inverse(&self) -> Result<Self> {
        let n = self.rows;
        if self.cols != n {
            return Err(HarnessError::InvalidInput(format!(
                "cannot invert a {}x{} matrix",
                self.rows, self.cols
            )));
        }

        let mut a = self.to_rows();
        let mut inv = Self::identity(n).to_rows();

        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))
                .unwrap_or(col);
            if a[pivot][col].abs() < 1e-12 {
                return Err(HarnessError::Singular { column: col });
            }
            a.swap(col, pivot);
            inv.swap(col, pivot);

            let d = a[col][col];
            for k in 0..n {
                a[col][k] /= d;
                inv[col][k] /= d;
            }
            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = a[r][col];
                for k in 0..n {
                    let (da, di) = (factor * a[col][k], factor * inv[col][k]);
                    a[r][k] -= da;
                    inv[r][k] -= di;
                }
            }
        }

        Self::from_rows(&inv)
    }

    /// Ordinary least squares weights, intercept first when requested
    pub fn least_squares(&self, y: &[f64], fit_intercept: bool) -> Result<Vec<f64>> {
        let design = if fit_intercept {
            let rows: Vec<Vec<f64>> = (0..self.rows)
                .map(|i| std::iter::once(1.0).chain(self.row(i).iter().copied()).collect())
                .collect();
            Self::from_rows(&rows)?
        } else {
            self.clone()
        };
        let xt = design.transpose();
        let gram_inv = xt.matmul(&design)?.inverse()?;
        gram_inv.mat_vec(&xt.mat_vec(y)?)
    }

    /// Column means, standard deviations, minima and maxima, one row each
    pub fn column_summary(&self) -> Result<Vec<Vec<f64>>> {
        if self.rows == 0 {
            return Err(HarnessError::InvalidInput("no samples to summarize".into()));
        }
        let n = self.rows as f64;
        let columns: Vec<Vec<f64>> = self.transpose().to_rows();

        let mean: Vec<f64> = columns.iter().map(|c| c.iter().sum::<f64>() / n).collect();
        let std_dev = columns
            .iter()
            .zip(&mean)
            .map(|(c, m)| (c.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n).sqrt())
            .collect();
        let min = columns
            .iter()
            .map(|c| c.iter().copied().fold(f64::INFINITY, f64::min))
            .collect();
        let max = columns
            .iter()
            .map(|c| c.iter().copied().fold(f64::NEG_INFINITY, f64::max))
            .collect();
        Ok(vec![mean, std_dev, min, max])
    }

    /// Lloyd's k-means from `initial` for a fixed number of steps
    ///
    /// Ties go to the lower centre index and empty clusters keep their
    /// centre. Returns the centres and the cluster sizes of the last step.
    pub fn kmeans(&self, initial: &Self, iterations: usize) -> Result<(Self, Vec<f64>)> {
        if initial.cols != self.cols || initial.rows == 0 {
            return Err(HarnessError::InvalidInput(format!(
                "{}x{} starting centres for {} features",
                initial.rows, initial.cols, self.cols
            )));
        }
        let k = initial.rows;
        let mut centres = initial.clone();
        let mut sizes = vec![0.0; k];

        for _ in 0..iterations {
            let mut sums = vec![0.0; k * self.cols];
            let mut counts = vec![0.0; k];
            for i in 0..self.rows {
                let sample = self.row(i);
                let distance = |c: usize| -> f64 {
                    sample
                        .iter()
                        .zip(centres.row(c))
                        .map(|(x, y)| (x - y).powi(2))
                        .sum()
                };
                let mut nearest = 0;
                for c in 1..k {
                    if distance(c) < distance(nearest) {
                        nearest = c;
                    }
                }
                counts[nearest] += 1.0;
                for (acc, x) in sums[nearest * self.cols..].iter_mut().zip(sample) {
                    *acc += x;
                }
            }
            for c in 0..k {
                if counts[c] > 0.0 {
                    for j in 0..self.cols {
                        centres.data[c * self.cols + j] = sums[c * self.cols + j] / counts[c];
                    }
                }
            }
            sizes = counts;
        }
        Ok((centres, sizes))
    }
}

/// Largest absolute entry-wise difference between two equally shaped grids
pub fn max_abs_diff(a: &[Vec<f64>], b: &[Vec<f64>]) -> f64 {
    a.iter()
        .zip(b)
        .flat_map(|(x, y)| x.iter().zip(y).map(|(p, q)| (p - q).abs()))
        .fold(0.0, f64::max)
}
