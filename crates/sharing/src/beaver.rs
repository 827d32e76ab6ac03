//! Beaver triples for secret multiplication
//!
//! Beaver triples enable secure multiplication of secret-shared values without
//! revealing plaintext to either party. Each triple (a, b, c) satisfies c = a * b
//! in Z_2^64.
//!
//! # Protocol
//!
//! To compute z = x * y where x and y are secret-shared:
//! 1. Both parties compute d = x - a, e = y - b (masked values)
//! 2. d and e are opened (both parties learn them)
//! 3. z = c + a*e + d*b + d*e is computed as shares
//!
//! d and e are uniformly random (masked by a, b), so opening them reveals
//! nothing about x or y.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::share::SharedScalar;

/// A single Beaver triple: (a, b, c) where c = a * b
#[derive(Clone, Debug)]
pub struct BeaverTriple {
    /// First random value
    pub a: SharedScalar,
    /// Second random value
    pub b: SharedScalar,
    /// Product c = a * b
    pub c: SharedScalar,
}

impl BeaverTriple {
    /// Generate a new random triple with fresh share splitting
    pub fn random_with_rng<R: RngCore>(rng: &mut R) -> Self {
        let a = rng.next_u64() as i64;
        let b = rng.next_u64() as i64;
        let c = a.wrapping_mul(b);

        Self {
            a: SharedScalar::share_with_rng(a, rng),
            b: SharedScalar::share_with_rng(b, rng),
            c: SharedScalar::share_with_rng(c, rng),
        }
    }
}

/// Offline dealer handing out triples in a fixed, seed-determined order
///
/// Triples are generated in batches; every party drawing from a dealer with
/// the same seed consumes the same sequence.
pub struct TripleDealer {
    rng: ChaCha20Rng,
    pool: Vec<BeaverTriple>,
    batch: usize,
    issued: usize,
}

impl TripleDealer {
    /// Create a dealer that refills `batch` triples at a time
    pub fn new(seed: u64, batch: usize) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            pool: Vec::new(),
            batch: batch.max(1),
            issued: 0,
        }
    }

    /// Take the next triple, refilling the pool when exhausted
    pub fn next_triple(&mut self) -> BeaverTriple {
        if self.pool.is_empty() {
            tracing::debug!(batch = self.batch, issued = self.issued, "Generating Beaver triples");
            let rng = &mut self.rng;
            let mut fresh: Vec<BeaverTriple> = (0..self.batch)
                .map(|_| BeaverTriple::random_with_rng(&mut *rng))
                .collect();
            // pop() takes from the back; keep generation order
            fresh.reverse();
            self.pool = fresh;
        }
        self.issued += 1;
        match self.pool.pop() {
            Some(triple) => triple,
            None => BeaverTriple::random_with_rng(&mut self.rng),
        }
    }

    /// Number of triples consumed so far
    pub fn issued(&self) -> usize {
        self.issued
    }
}

/// Beaver multiplication in the ring, without fixed-point truncation
///
/// Returns shares of x * y mod 2^64. The opened masks d and e are public.
pub fn beaver_multiply(x: &SharedScalar, y: &SharedScalar, triple: &BeaverTriple) -> SharedScalar {
    // d = x - a, e = y - b, each opened from both parties' shares
    let d = x.sub(&triple.a).reconstruct_raw();
    let e = y.sub(&triple.b).reconstruct_raw();

    // z = c + a*e + d*b + d*e; d*e is public so only the client adds it
    let client = triple
        .c
        .client
        .wrapping_add(triple.a.client.wrapping_mul(e))
        .wrapping_add(d.wrapping_mul(triple.b.client))
        .wrapping_add(d.wrapping_mul(e));
    let server = triple
        .c
        .server
        .wrapping_add(triple.a.server.wrapping_mul(e))
        .wrapping_add(d.wrapping_mul(triple.b.server));

    SharedScalar { client, server }
}
