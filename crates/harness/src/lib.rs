//! Obliv Test Harness
//!
//! Plaintext reference implementation and a secure-session driver for
//! validating that the oblivious computations reveal correct results.

mod error;
mod plaintext;
mod secure;

pub use error::{HarnessError, Result};
pub use plaintext::{max_abs_diff, PlainMatrix};
pub use secure::{Report, SecureSession};
