//! Secret vector algebra

use std::io::Write;
use std::ops::{Index, IndexMut};

use obliv_fixed_point::{Fixed, FixedVector};
use obliv_sharing::SecretRuntime;

use crate::error::{check_len, LinalgError, Result};
use crate::matrix::SecretMatrix;

/// A fixed-length sequence of secret fixed-point values
///
/// The length is fixed at construction. Every operation returns a freshly
/// allocated vector; nothing aliases its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretVector<S> {
    data: Vec<S>,
}

impl<S: Clone> SecretVector<S> {
    /// Wrap already secret values
    pub fn from_vec(data: Vec<S>) -> Self {
        Self { data }
    }

    /// Vector of secret zeros
    pub fn zeros<R>(rt: &R, len: usize) -> Self
    where
        R: SecretRuntime<Scalar = S>,
    {
        Self {
            data: vec![rt.zero(); len],
        }
    }

    /// Vector with every entry set to the public constant `value`
    pub fn constant<R>(rt: &R, len: usize, value: Fixed) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        let c = rt.constant(value)?;
        Ok(Self {
            data: vec![c; len],
        })
    }

    /// Vector with entries drawn independently and uniformly from [-bound, bound]
    pub fn random<R>(rt: &mut R, len: usize, bound: Fixed) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        let low = bound.neg();
        let data = (0..len)
            .map(|_| rt.random_in_range(low, bound))
            .collect::<obliv_sharing::Result<Vec<_>>>()?;
        Ok(Self { data })
    }

    /// Get the length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get element at index
    pub fn get(&self, index: usize) -> Option<&S> {
        self.data.get(index)
    }

    /// Iterate over the entries in index order
    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.data.iter()
    }

    /// Borrow the entries
    pub fn as_slice(&self) -> &[S] {
        &self.data
    }

    /// Take the entries
    pub fn into_vec(self) -> Vec<S> {
        self.data
    }

    /// Element-wise addition
    pub fn add<R>(&self, rt: &R, other: &Self) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        check_len("vector_add", self.len(), other.len())?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| rt.add(a, b))
            .collect();
        Ok(Self { data })
    }

    /// Element-wise subtraction
    pub fn sub<R>(&self, rt: &R, other: &Self) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        check_len("vector_sub", self.len(), other.len())?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| rt.sub(a, b))
            .collect();
        Ok(Self { data })
    }

    /// Element-wise (Hadamard) product
    pub fn mul<R>(&self, rt: &mut R, other: &Self) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        check_len("vector_mul", self.len(), other.len())?;
        let mut data = Vec::with_capacity(self.len());
        for (a, b) in self.data.iter().zip(&other.data) {
            data.push(rt.mul(a, b)?);
        }
        Ok(Self { data })
    }

    /// Element-wise division
    pub fn div<R>(&self, rt: &mut R, other: &Self) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        check_len("vector_div", self.len(), other.len())?;
        let mut data = Vec::with_capacity(self.len());
        for (a, b) in self.data.iter().zip(&other.data) {
            data.push(rt.div(a, b)?);
        }
        Ok(Self { data })
    }

    /// Multiply every entry by one secret scalar
    pub fn scale_by<R>(&self, rt: &mut R, scalar: &S) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        self.vectorize(rt, |rt, x| rt.mul(x, scalar))
    }

    /// Sum of squares
    ///
    /// Accumulated into one running scalar in ascending index order.
    pub fn norm<R>(&self, rt: &mut R) -> Result<S>
    where
        R: SecretRuntime<Scalar = S>,
    {
        let mut acc = rt.zero();
        for x in &self.data {
            let square = rt.mul(x, x)?;
            acc = rt.add(&acc, &square);
        }
        Ok(acc)
    }

    /// Inner product, accumulated in ascending index order
    pub fn dot<R>(&self, rt: &mut R, other: &Self) -> Result<S>
    where
        R: SecretRuntime<Scalar = S>,
    {
        check_len("vector_dot", self.len(), other.len())?;
        let mut acc = rt.zero();
        for (a, b) in self.data.iter().zip(&other.data) {
            let product = rt.mul(a, b)?;
            acc = rt.add(&acc, &product);
        }
        Ok(acc)
    }

    /// Apply a scalar function to every entry
    pub fn vectorize<R, F, E>(&self, rt: &mut R, mut f: F) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
        F: FnMut(&mut R, &S) -> std::result::Result<S, E>,
        LinalgError: From<E>,
    {
        let mut data = Vec::with_capacity(self.len());
        for x in &self.data {
            data.push(f(rt, x)?);
        }
        Ok(Self { data })
    }

    /// Element-wise square root
    pub fn sqrt<R>(&self, rt: &mut R) -> Result<Self>
    where
        R: SecretRuntime<Scalar = S>,
    {
        self.vectorize(rt, |rt, x| rt.sqrt(x))
    }

    /// 1 × n matrix holding this vector
    pub fn to_row_matrix(&self) -> SecretMatrix<S> {
        SecretMatrix::from_row_major(self.data.clone(), 1, self.len())
    }

    /// n × 1 matrix holding this vector
    pub fn to_column_matrix(&self) -> SecretMatrix<S> {
        SecretMatrix::from_row_major(self.data.clone(), self.len(), 1)
    }

    /// Reveal every entry
    pub fn reveal<R>(&self, rt: &mut R) -> Result<FixedVector>
    where
        R: SecretRuntime<Scalar = S>,
    {
        let mut raw = Vec::with_capacity(self.len());
        for x in &self.data {
            raw.push(rt.reveal(x)?.raw);
        }
        Ok(FixedVector::from_raw(raw, rt.scale()))
    }

    /// Reveal and write every entry, one per line
    pub fn print<R, W>(&self, rt: &mut R, out: &mut W) -> Result<()>
    where
        R: SecretRuntime<Scalar = S>,
        W: Write,
    {
        writeln!(out, "vector")?;
        for x in &self.data {
            writeln!(out, "{}", rt.reveal(x)?)?;
        }
        Ok(())
    }
}

impl<S> Index<usize> for SecretVector<S> {
    type Output = S;

    fn index(&self, index: usize) -> &S {
        &self.data[index]
    }
}

impl<S> IndexMut<usize> for SecretVector<S> {
    fn index_mut(&mut self, index: usize) -> &mut S {
        &mut self.data[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obliv_fixed_point::DEFAULT_SCALE;
    use obliv_sharing::{LocalRuntime, SharedScalar};

    fn secret(rt: &mut LocalRuntime, values: &[f64]) -> SecretVector<SharedScalar> {
        SecretVector::from_vec(rt.share_f64_slice(values).unwrap())
    }

    fn revealed(rt: &mut LocalRuntime, v: &SecretVector<SharedScalar>) -> Vec<f64> {
        v.reveal(rt).unwrap().to_f64_vec()
    }

    fn assert_close(got: &[f64], expected: &[f64]) {
        assert_eq!(got.len(), expected.len());
        for (i, (g, e)) in got.iter().zip(expected).enumerate() {
            assert!((g - e).abs() < 1e-4, "index {}: got {}, expected {}", i, g, e);
        }
    }

    #[test]
    fn test_add_sub() {
        let mut rt = LocalRuntime::with_seed(1);
        let x = secret(&mut rt, &[1.0, -2.5, 3.0]);
        let y = secret(&mut rt, &[0.5, 4.0, -3.0]);

        let sum = x.add(&rt, &y).unwrap();
        assert_close(&revealed(&mut rt, &sum), &[1.5, 1.5, 0.0]);

        let back = x.sub(&rt, &y).unwrap().add(&rt, &y).unwrap();
        assert_close(&revealed(&mut rt, &back), &[1.0, -2.5, 3.0]);
    }

    #[test]
    fn test_length_mismatch_before_secret_ops() {
        let mut rt = LocalRuntime::with_seed(2);
        let x = secret(&mut rt, &[1.0, 2.0]);
        let y = secret(&mut rt, &[1.0, 2.0, 3.0]);
        let before = rt.stats();

        assert!(matches!(
            x.mul(&mut rt, &y),
            Err(LinalgError::LengthMismatch { op: "vector_mul", expected: 2, got: 3 })
        ));
        assert!(matches!(x.add(&rt, &y), Err(LinalgError::LengthMismatch { .. })));
        assert_eq!(rt.stats(), before);
    }

    #[test]
    fn test_hadamard_and_div() {
        let mut rt = LocalRuntime::with_seed(3);
        let x = secret(&mut rt, &[2.0, -3.0, 0.5]);
        let y = secret(&mut rt, &[4.0, 2.0, -8.0]);

        let prod = x.mul(&mut rt, &y).unwrap();
        assert_close(&revealed(&mut rt, &prod), &[8.0, -6.0, -4.0]);

        let quot = x.div(&mut rt, &y).unwrap();
        assert_close(&revealed(&mut rt, &quot), &[0.5, -1.5, -0.0625]);
    }

    #[test]
    fn test_scale_by() {
        let mut rt = LocalRuntime::with_seed(4);
        let x = secret(&mut rt, &[1.0, 2.0, -3.0]);
        let s = rt.share_f64(1.5).unwrap();
        let scaled = x.scale_by(&mut rt, &s).unwrap();
        assert_close(&revealed(&mut rt, &scaled), &[1.5, 3.0, -4.5]);
    }

    #[test]
    fn test_norm_and_dot() {
        let mut rt = LocalRuntime::with_seed(5);
        let x = secret(&mut rt, &[1.0, 2.0, 3.0]);
        let y = secret(&mut rt, &[4.0, 5.0, 6.0]);

        let norm = x.norm(&mut rt).unwrap();
        assert!((rt.reveal(&norm).unwrap().to_f64() - 14.0).abs() < 1e-4);

        let dot = x.dot(&mut rt, &y).unwrap();
        assert!((rt.reveal(&dot).unwrap().to_f64() - 32.0).abs() < 1e-4);
    }

    #[test]
    fn test_constructors() {
        let mut rt = LocalRuntime::with_seed(6);
        let c = SecretVector::constant(&rt, 4, Fixed::from_f64_default(2.5).unwrap()).unwrap();
        assert_close(&revealed(&mut rt, &c), &[2.5; 4]);

        let z = SecretVector::zeros(&rt, 3);
        assert_close(&revealed(&mut rt, &z), &[0.0; 3]);

        let bound = Fixed::from_f64_default(0.25).unwrap();
        let r = SecretVector::random(&mut rt, 32, bound).unwrap();
        assert_eq!(r.len(), 32);
        for v in revealed(&mut rt, &r) {
            assert!((-0.25..=0.25).contains(&v));
        }
    }

    #[test]
    fn test_vectorize_sqrt() {
        let mut rt = LocalRuntime::with_seed(7);
        let x = secret(&mut rt, &[4.0, 9.0, 2.25]);
        let roots = x.sqrt(&mut rt).unwrap();
        assert_close(&revealed(&mut rt, &roots), &[2.0, 3.0, 1.5]);

        let doubled = x.vectorize(&mut rt, |rt, v| Ok::<_, LinalgError>(rt.add(v, v))).unwrap();
        assert_close(&revealed(&mut rt, &doubled), &[8.0, 18.0, 4.5]);
    }

    #[test]
    fn test_matrix_conversions_keep_order() {
        let mut rt = LocalRuntime::with_seed(8);
        let x = secret(&mut rt, &[1.0, 2.0, 3.0]);
        let row = x.to_row_matrix();
        assert_eq!(row.shape(), (1, 3));
        assert_eq!(row.to_vector(), x);
        let col = x.to_column_matrix();
        assert_eq!(col.shape(), (3, 1));
        assert_eq!(col.to_vector(), x);
    }

    #[test]
    fn test_print() {
        let mut rt = LocalRuntime::with_seed(9);
        let x = secret(&mut rt, &[1.0, -0.5]);
        let mut out = Vec::new();
        x.print(&mut rt, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "vector\n1.000000\n-0.500000\n");
        assert_eq!(rt.scale(), DEFAULT_SCALE);
    }
}
