//! Obliv Linear Algebra
//!
//! Fixed-point vector and matrix algebra, column normalization, matrix
//! inversion and the analytics built on them (least squares, column
//! statistics, k-means) over secret-shared values, with no control flow
//! that depends on secret data.
//!
//! Every operation takes the [`SecretRuntime`](obliv_sharing::SecretRuntime)
//! that executes it. Native branches only ever test dimensions and loop
//! indices; every data-dependent choice goes through
//! `compare_and_select`. Sequential accumulations (norms, dot products,
//! matrix-product inner loops, elimination row updates) run in ascending
//! index order on every party.
//!
//! Shape errors are reported as [`LinalgError`] before any secret operation
//! runs. A singular matrix is not detected: inversion divides by the secret
//! zero pivot and yields undefined numbers.

mod elimination;
mod error;
mod io;
mod matrix;
mod regression;
mod statistics;
mod vector;

pub use elimination::{eliminate, gauss_jordan, matrix_inverse, matrix_inverse_with, solve, Pivoting};
pub use error::{LinalgError, Result};
pub use io::ShareIo;
pub use matrix::SecretMatrix;
pub use regression::{fit_linear_regression, LinearModel};
pub use statistics::{
    column_max, column_means, column_min, column_std, column_summary, kmeans, kmeans_from,
    Clustering, ColumnSummary,
};
pub use vector::SecretVector;
