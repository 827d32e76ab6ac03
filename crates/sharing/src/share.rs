//! Basic secret share types
//!
//! Secret shares are zeroized on drop to protect against memory disclosure.
//! A value X is split additively over Z_2^64: X = X_c + X_s.

use obliv_fixed_point::FixedVector;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, SharingError};

/// Both additive shares of one secret fixed-point value
///
/// The wrapping sum of the two shares is the raw fixed-point integer. In a
/// real deployment each party only ever holds its own half.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedScalar {
    /// Client's share
    pub client: i64,
    /// Server's share
    pub server: i64,
}

impl SharedScalar {
    /// Split a raw value using fresh randomness for the server share
    pub fn share_with_rng<R: RngCore>(raw: i64, rng: &mut R) -> Self {
        let server = rng.next_u64() as i64;
        Self {
            client: raw.wrapping_sub(server),
            server,
        }
    }

    /// Trivial sharing of a public value
    pub fn public(raw: i64) -> Self {
        Self {
            client: raw,
            server: 0,
        }
    }

    /// Wrapping sum of both shares
    pub fn reconstruct_raw(&self) -> i64 {
        self.client.wrapping_add(self.server)
    }

    /// Local addition
    pub fn add(&self, other: &Self) -> Self {
        Self {
            client: self.client.wrapping_add(other.client),
            server: self.server.wrapping_add(other.server),
        }
    }

    /// Local subtraction
    pub fn sub(&self, other: &Self) -> Self {
        Self {
            client: self.client.wrapping_sub(other.client),
            server: self.server.wrapping_sub(other.server),
        }
    }

    /// Local negation
    pub fn neg(&self) -> Self {
        Self {
            client: self.client.wrapping_neg(),
            server: self.server.wrapping_neg(),
        }
    }

    /// Local multiplication by a public ring element (no rescaling)
    pub fn mul_public(&self, k: i64) -> Self {
        Self {
            client: self.client.wrapping_mul(k),
            server: self.server.wrapping_mul(k),
        }
    }
}

/// A single party's share of a vector
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Share {
    /// The share values (zeroized on drop)
    pub data: Vec<i64>,
    /// Scale factor
    pub scale: u8,
}

impl Share {
    /// Create a new share from raw data
    pub fn from_raw(data: Vec<i64>, scale: u8) -> Self {
        Self { data, scale }
    }

    /// Create a random share with a given RNG
    pub fn random_with_rng<R: RngCore>(len: usize, scale: u8, rng: &mut R) -> Self {
        let data = (0..len).map(|_| rng.next_u64() as i64).collect();
        Self { data, scale }
    }

    /// Get the length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A pair of shares (client + server) that reconstruct to a vector
#[derive(Debug, Clone)]
pub struct SharePair {
    /// Client's share
    pub client: Share,
    /// Server's share
    pub server: Share,
}

impl SharePair {
    /// Create shares from a plaintext value: X = X_c + X_s
    pub fn from_plaintext_with_rng<R: RngCore>(plaintext: &FixedVector, rng: &mut R) -> Self {
        let server = Share::random_with_rng(plaintext.len(), plaintext.scale, rng);
        let data = plaintext
            .data
            .iter()
            .zip(&server.data)
            .map(|(&x, &xs)| x.wrapping_sub(xs))
            .collect();
        Self {
            client: Share::from_raw(data, plaintext.scale),
            server,
        }
    }

    /// Collect per-element scalar shares into a vector pair
    pub fn from_scalars(scalars: &[SharedScalar], scale: u8) -> Self {
        let client = scalars.iter().map(|s| s.client).collect();
        let server = scalars.iter().map(|s| s.server).collect();
        Self {
            client: Share::from_raw(client, scale),
            server: Share::from_raw(server, scale),
        }
    }

    /// Split into per-element scalar shares, in index order
    pub fn scalars(&self) -> Vec<SharedScalar> {
        self.client
            .data
            .iter()
            .zip(&self.server.data)
            .map(|(&client, &server)| SharedScalar { client, server })
            .collect()
    }

    /// Reconstruct the plaintext: X = X_c + X_s
    pub fn reconstruct(&self) -> Result<FixedVector> {
        if self.client.scale != self.server.scale {
            return Err(SharingError::ScaleMismatch {
                expected: self.client.scale,
                got: self.server.scale,
            });
        }
        if self.client.len() != self.server.len() {
            return Err(SharingError::DimensionMismatch {
                expected: self.client.len(),
                got: self.server.len(),
            });
        }

        let data = self
            .client
            .data
            .iter()
            .zip(&self.server.data)
            .map(|(&xc, &xs)| xc.wrapping_add(xs))
            .collect();

        Ok(FixedVector::from_raw(data, self.client.scale))
    }

    /// Get the length
    pub fn len(&self) -> usize {
        self.client.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.client.is_empty()
    }
}
