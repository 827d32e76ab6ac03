//! Column statistics and k-means clustering over secret data
//!
//! Loop bounds are public: sample and feature counts, the cluster count and
//! the iteration count. Every per-sample choice (a column extreme, the
//! nearest centre, whether a cluster is empty) is made with
//! compare-and-select.
//!
//! Squared deviations and squared distances are formed at double scale, so
//! their magnitudes must stay within the range documented on
//! [`INTEGER_BITS`](obliv_fixed_point::INTEGER_BITS).

use obliv_fixed_point::Fixed;
use obliv_sharing::SecretRuntime;

use crate::error::{LinalgError, Result};
use crate::matrix::{Extreme, SecretMatrix};
use crate::vector::SecretVector;

/// Per-column mean, standard deviation, minimum and maximum
#[derive(Debug, Clone)]
pub struct ColumnSummary<S> {
    pub mean: SecretVector<S>,
    /// Population standard deviation
    pub std_dev: SecretVector<S>,
    pub min: SecretVector<S>,
    pub max: SecretVector<S>,
}

impl<S: Clone> ColumnSummary<S> {
    /// 4 × cols matrix with rows mean, standard deviation, min, max
    pub fn to_matrix(&self) -> Result<SecretMatrix<S>> {
        SecretMatrix::from_rows(vec![
            self.mean.clone(),
            self.std_dev.clone(),
            self.min.clone(),
            self.max.clone(),
        ])
    }
}

/// Cluster centres after a fixed number of Lloyd iterations
#[derive(Debug, Clone)]
pub struct Clustering<S> {
    /// k × cols, one centre per row
    pub centres: SecretMatrix<S>,
    /// Samples assigned to each centre by the last iteration
    pub sizes: SecretVector<S>,
}

/// Arithmetic mean of every column
pub fn column_means<R: SecretRuntime>(
    rt: &mut R,
    x: &SecretMatrix<R::Scalar>,
) -> Result<SecretVector<R::Scalar>> {
    check_non_empty("column_means", x)?;
    let weights = averaging_row(&*rt, x.rows())?;
    Ok(weights.matmul(rt, x)?.row(0))
}

/// Population standard deviation of every column
pub fn column_std<R: SecretRuntime>(
    rt: &mut R,
    x: &SecretMatrix<R::Scalar>,
) -> Result<SecretVector<R::Scalar>> {
    check_non_empty("column_std", x)?;
    let (_, std_dev) = mean_and_std(rt, x)?;
    Ok(std_dev)
}

/// Largest entry of every column
pub fn column_max<R: SecretRuntime>(
    rt: &mut R,
    x: &SecretMatrix<R::Scalar>,
) -> Result<SecretVector<R::Scalar>> {
    column_extreme(rt, x, Extreme::Max, "column_max")
}

/// Smallest entry of every column
pub fn column_min<R: SecretRuntime>(
    rt: &mut R,
    x: &SecretMatrix<R::Scalar>,
) -> Result<SecretVector<R::Scalar>> {
    column_extreme(rt, x, Extreme::Min, "column_min")
}

/// Mean, standard deviation, minimum and maximum of every column
pub fn column_summary<R: SecretRuntime>(
    rt: &mut R,
    x: &SecretMatrix<R::Scalar>,
) -> Result<ColumnSummary<R::Scalar>> {
    check_non_empty("column_summary", x)?;
    tracing::info!(samples = x.rows(), features = x.cols(), "Summarizing columns");

    let (mean, std_dev) = mean_and_std(rt, x)?;
    let min = column_min(rt, x)?;
    let max = column_max(rt, x)?;
    Ok(ColumnSummary {
        mean,
        std_dev,
        min,
        max,
    })
}

/// k-means from `k` random starting centres
///
/// Starting coordinates are drawn uniformly from [-bound, bound], so `bound`
/// should cover the data range. See [`kmeans_from`] for the iteration.
pub fn kmeans<R: SecretRuntime>(
    rt: &mut R,
    x: &SecretMatrix<R::Scalar>,
    k: usize,
    iterations: usize,
    bound: Fixed,
) -> Result<Clustering<R::Scalar>> {
    check_non_empty("kmeans", x)?;
    let initial = SecretMatrix::random(rt, k, x.cols(), bound)?;
    kmeans_from(rt, x, &initial, iterations)
}

/// k-means from the given starting centres, one per row of `initial`
///
/// Runs exactly `iterations` Lloyd steps. Each step assigns every sample to
/// the centre at the smallest squared distance (ties go to the lower centre
/// index) and moves every centre to the mean of its samples. A centre with
/// no samples keeps its position. With zero iterations the starting centres
/// come back with all sizes zero.
pub fn kmeans_from<R: SecretRuntime>(
    rt: &mut R,
    x: &SecretMatrix<R::Scalar>,
    initial: &SecretMatrix<R::Scalar>,
    iterations: usize,
) -> Result<Clustering<R::Scalar>> {
    check_non_empty("kmeans", x)?;
    check_non_empty("kmeans", initial)?;
    if initial.cols() != x.cols() {
        return Err(LinalgError::ShapeMismatch {
            op: "kmeans",
            expected: (initial.rows(), x.cols()),
            got: initial.shape(),
        });
    }

    tracing::info!(
        samples = x.rows(),
        features = x.cols(),
        clusters = initial.rows(),
        iterations,
        "Running k-means"
    );

    let mut centres = initial.clone();
    let mut sizes = SecretVector::zeros(&*rt, initial.rows());
    for iteration in 0..iterations {
        let membership = nearest_centres(rt, x, &centres)?;
        let (next, counts) = recentre(rt, x, &membership, &centres)?;
        centres = next;
        sizes = counts;
        tracing::debug!(iteration, "k-means step done");
    }

    Ok(Clustering { centres, sizes })
}

fn check_non_empty<S>(op: &'static str, x: &SecretMatrix<S>) -> Result<()>
where
    S: Clone,
{
    if x.rows() == 0 {
        return Err(LinalgError::EmptyInput { op });
    }
    Ok(())
}

/// 1 × rows matrix of the public weight 1/rows
fn averaging_row<R: SecretRuntime>(rt: &R, rows: usize) -> Result<SecretMatrix<R::Scalar>> {
    let weight = Fixed::from_f64(1.0 / rows as f64, rt.scale())?;
    SecretMatrix::constant(rt, 1, rows, weight)
}

/// Means, then the root of the mean squared deviation from them
fn mean_and_std<R: SecretRuntime>(
    rt: &mut R,
    x: &SecretMatrix<R::Scalar>,
) -> Result<(SecretVector<R::Scalar>, SecretVector<R::Scalar>)> {
    let weights = averaging_row(&*rt, x.rows())?;
    let mean = weights.matmul(rt, x)?;

    let spread = SecretMatrix::from_rows(vec![mean.row(0); x.rows()])?;
    let centred = x.sub(&*rt, &spread)?;
    let squares = centred.mul_elementwise(rt, &centred)?;
    let variance = weights.matmul(rt, &squares)?;
    let std_dev = variance.sqrt_elementwise(rt)?;

    Ok((mean.row(0), std_dev.row(0)))
}

fn column_extreme<R: SecretRuntime>(
    rt: &mut R,
    x: &SecretMatrix<R::Scalar>,
    extreme: Extreme,
    op: &'static str,
) -> Result<SecretVector<R::Scalar>> {
    check_non_empty(op, x)?;
    let first = x.row(0).into_vec();
    let rest = x.slice_rows(1, x.rows() - 1)?;
    let folded = rest.fold_columns(rt, first, extreme)?;
    tracing::debug!(op, rows = x.rows(), cols = x.cols(), "Folded columns");
    Ok(SecretVector::from_vec(folded))
}

/// rows × k one-hot membership, secret 1 at each sample's nearest centre
fn nearest_centres<R: SecretRuntime>(
    rt: &mut R,
    x: &SecretMatrix<R::Scalar>,
    centres: &SecretMatrix<R::Scalar>,
) -> Result<SecretMatrix<R::Scalar>> {
    let k = centres.rows();
    let one = rt.one();
    let zero = rt.zero();

    let mut data = Vec::with_capacity(x.rows() * k);
    for i in 0..x.rows() {
        let sample = x.row(i);
        let mut best = sample.sub(&*rt, &centres.row(0))?.norm(rt)?;
        let mut flags = vec![zero.clone(); k];
        flags[0] = one.clone();

        for c in 1..k {
            let distance = sample.sub(&*rt, &centres.row(c))?.norm(rt)?;
            let closer = rt.compare_and_select(&best, &distance, &one, &zero)?;

            for flag in flags.iter_mut().take(c) {
                let cleared = rt.mul(flag, &closer)?;
                *flag = rt.sub(flag, &cleared);
            }
            flags[c] = closer.clone();

            let gap = rt.sub(&distance, &best);
            let step = rt.mul(&closer, &gap)?;
            best = rt.add(&best, &step);
        }
        data.extend(flags);
    }
    Ok(SecretMatrix::from_row_major(data, x.rows(), k))
}

/// Move every centre to the mean of its members; empty clusters stay put
fn recentre<R: SecretRuntime>(
    rt: &mut R,
    x: &SecretMatrix<R::Scalar>,
    membership: &SecretMatrix<R::Scalar>,
    centres: &SecretMatrix<R::Scalar>,
) -> Result<(SecretMatrix<R::Scalar>, SecretVector<R::Scalar>)> {
    let members = membership.transpose();
    let sums = members.matmul(rt, x)?;
    let zero = rt.zero();

    let mut data = Vec::with_capacity(centres.rows() * centres.cols());
    let mut counts = Vec::with_capacity(centres.rows());
    for c in 0..centres.rows() {
        let mut count = zero.clone();
        for flag in members.row_slice(c) {
            count = rt.add(&count, flag);
        }
        for j in 0..centres.cols() {
            let mean = rt.div(sums.get(c, j), &count)?;
            data.push(rt.compare_and_select(&count, &zero, &mean, centres.get(c, j))?);
        }
        counts.push(count);
    }

    Ok((
        SecretMatrix::from_row_major(data, centres.rows(), centres.cols()),
        SecretVector::from_vec(counts),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use obliv_fixed_point::FixedVector;
    use obliv_sharing::{LocalRuntime, RuntimeStats, SharedScalar};

    type M = SecretMatrix<SharedScalar>;

    fn secret(rt: &mut LocalRuntime, rows: &[&[f64]]) -> M {
        let vectors = rows
            .iter()
            .map(|r| SecretVector::from_vec(rt.share_f64_slice(r).unwrap()))
            .collect();
        SecretMatrix::from_rows(vectors).unwrap()
    }

    fn revealed(rt: &mut LocalRuntime, v: &SecretVector<SharedScalar>) -> Vec<f64> {
        v.reveal(rt).unwrap().to_f64_vec()
    }

    fn assert_close(got: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(got.len(), expected.len());
        for (i, (g, e)) in got.iter().zip(expected).enumerate() {
            assert!((g - e).abs() < tol, "index {}: got {}, expected {}", i, g, e);
        }
    }

    #[test]
    fn test_means_and_std() {
        let mut rt = LocalRuntime::with_seed(1);
        let x = secret(&mut rt, &[&[1.0, 10.0], &[2.0, 20.0], &[3.0, 30.0], &[6.0, -20.0]]);

        let mean = column_means(&mut rt, &x).unwrap();
        assert_close(&revealed(&mut rt, &mean), &[3.0, 10.0], 1e-4);

        let std_dev = column_std(&mut rt, &x).unwrap();
        assert_close(
            &revealed(&mut rt, &std_dev),
            &[3.5f64.sqrt(), 350f64.sqrt()],
            1e-3,
        );
        assert_eq!(rt.stats().square_roots, 2);
    }

    #[test]
    fn test_constant_column_has_zero_spread() {
        let mut rt = LocalRuntime::with_seed(2);
        let x = secret(&mut rt, &[&[2.5], &[2.5], &[2.5]]);

        let std_dev = column_std(&mut rt, &x).unwrap();
        assert_close(&revealed(&mut rt, &std_dev), &[0.0], 1e-2);
    }

    #[test]
    fn test_min_max_negative_columns() {
        let mut rt = LocalRuntime::with_seed(3);
        let x = secret(&mut rt, &[&[-3.0, 2.0], &[-1.0, 5.0], &[-7.0, 5.0]]);

        let max = column_max(&mut rt, &x).unwrap();
        assert_close(&revealed(&mut rt, &max), &[-1.0, 5.0], 1e-9);

        let min = column_min(&mut rt, &x).unwrap();
        assert_close(&revealed(&mut rt, &min), &[-7.0, 2.0], 1e-9);

        // Two columns folded over the two rows after the first, twice
        assert_eq!(rt.stats().comparisons, 8);
    }

    #[test]
    fn test_summary_rows() {
        let mut rt = LocalRuntime::with_seed(4);
        let x = secret(&mut rt, &[&[1.0], &[3.0]]);

        let summary = column_summary(&mut rt, &x).unwrap().to_matrix().unwrap();
        assert_eq!(summary.shape(), (4, 1));
        let rows: Vec<f64> = summary
            .reveal(&mut rt)
            .unwrap()
            .iter()
            .flat_map(FixedVector::to_f64_vec)
            .collect();
        assert_close(&rows, &[2.0, 1.0, 1.0, 3.0], 1e-3);
    }

    #[test]
    fn test_empty_input_rejected() {
        let mut rt = LocalRuntime::with_seed(5);
        let x: M = SecretMatrix::zeros(&rt, 0, 3);
        let before = rt.stats();

        assert!(matches!(
            column_means(&mut rt, &x),
            Err(LinalgError::EmptyInput { op: "column_means" })
        ));
        assert!(matches!(
            column_max(&mut rt, &x),
            Err(LinalgError::EmptyInput { op: "column_max" })
        ));
        let bound = Fixed::from_f64_default(1.0).unwrap();
        assert!(matches!(
            kmeans(&mut rt, &x, 2, 3, bound),
            Err(LinalgError::EmptyInput { op: "kmeans" })
        ));
        assert_eq!(rt.stats(), before);
    }

    #[test]
    fn test_kmeans_from_known_start() {
        let mut rt = LocalRuntime::with_seed(6);
        let x = secret(
            &mut rt,
            &[
                &[0.0, 0.0],
                &[10.0, 10.0],
                &[1.0, 0.0],
                &[11.0, 10.0],
                &[0.0, 1.0],
                &[10.0, 11.0],
            ],
        );
        let initial = secret(&mut rt, &[&[1.0, 1.0], &[9.0, 9.0]]);

        let clustering = kmeans_from(&mut rt, &x, &initial, 3).unwrap();
        assert_eq!(clustering.centres.shape(), (2, 2));
        let centres = clustering.centres.reveal(&mut rt).unwrap();
        assert_close(&centres[0].to_f64_vec(), &[1.0 / 3.0, 1.0 / 3.0], 1e-3);
        assert_close(&centres[1].to_f64_vec(), &[31.0 / 3.0, 31.0 / 3.0], 1e-3);
        assert_close(&revealed(&mut rt, &clustering.sizes), &[3.0, 3.0], 1e-6);
    }

    #[test]
    fn test_kmeans_empty_cluster_keeps_centre() {
        let mut rt = LocalRuntime::with_seed(7);
        let x = secret(&mut rt, &[&[0.0, 2.0], &[4.0, 6.0], &[2.0, 1.0]]);
        let initial = secret(&mut rt, &[&[1.0, 1.0], &[90.0, 90.0]]);

        let clustering = kmeans_from(&mut rt, &x, &initial, 2).unwrap();
        let centres = clustering.centres.reveal(&mut rt).unwrap();
        assert_close(&centres[0].to_f64_vec(), &[2.0, 3.0], 1e-3);
        assert_close(&centres[1].to_f64_vec(), &[90.0, 90.0], 1e-6);
        assert_close(&revealed(&mut rt, &clustering.sizes), &[3.0, 0.0], 1e-6);
    }

    #[test]
    fn test_kmeans_random_start_separates_clusters() {
        let mut rt = LocalRuntime::with_seed(8);
        let x = secret(&mut rt, &[&[-5.5], &[4.5], &[-5.0], &[5.0], &[-4.5], &[5.5]]);
        let bound = Fixed::from_f64_default(1.0).unwrap();

        let clustering = kmeans(&mut rt, &x, 2, 3, bound).unwrap();
        assert_eq!(rt.stats().random_draws, 2);

        let centres: Vec<f64> = clustering
            .centres
            .reveal(&mut rt)
            .unwrap()
            .iter()
            .flat_map(FixedVector::to_f64_vec)
            .collect();
        let mut sorted = centres.clone();
        sorted.sort_by(f64::total_cmp);
        assert_close(&sorted, &[-5.0, 5.0], 1e-3);
        assert_close(&revealed(&mut rt, &clustering.sizes), &[3.0, 3.0], 1e-6);
    }

    #[test]
    fn test_kmeans_schedule_is_data_independent() {
        fn run(rows: &[&[f64]]) -> RuntimeStats {
            let mut rt = LocalRuntime::with_seed(9);
            let x = secret(&mut rt, rows);
            let initial = secret(&mut rt, &[&[0.0], &[1.0], &[2.0]]);
            kmeans_from(&mut rt, &x, &initial, 2).unwrap();
            rt.stats()
        }

        let spread = run(&[&[0.0], &[1.0], &[2.0], &[3.0]]);
        let clumped = run(&[&[7.0], &[7.0], &[7.0], &[7.0]]);
        assert_eq!(spread, clumped);
    }

    #[test]
    fn test_kmeans_shape_mismatch() {
        let mut rt = LocalRuntime::with_seed(10);
        let x = secret(&mut rt, &[&[1.0, 2.0], &[3.0, 4.0]]);
        let initial = secret(&mut rt, &[&[1.0], &[3.0]]);
        assert!(matches!(
            kmeans_from(&mut rt, &x, &initial, 1),
            Err(LinalgError::ShapeMismatch { op: "kmeans", expected: (2, 2), got: (2, 1) })
        ));

        let none: M = SecretMatrix::zeros(&rt, 0, 2);
        assert!(matches!(
            kmeans_from(&mut rt, &x, &none, 1),
            Err(LinalgError::EmptyInput { op: "kmeans" })
        ));
    }
}
