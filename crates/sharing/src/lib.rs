//! Obliv Secret Sharing
//!
//! The boundary between the oblivious linear-algebra core and the
//! secret-sharing runtime that executes it. [`SecretRuntime`] lists the
//! primitives the core consumes; [`LocalRuntime`] is an in-process two-party
//! simulation of that runtime (additive shares over Z_2^64, Beaver-triple
//! multiplication, dealer-assisted truncation and nonlinear functions) used
//! by tests, the harness and the demo.

mod beaver;
mod config;
mod error;
mod local;
mod runtime;
mod share;

pub use beaver::{beaver_multiply, BeaverTriple, TripleDealer};
pub use config::RuntimeConfig;
pub use error::{Result, SharingError};
pub use local::{LocalRuntime, RuntimeStats};
pub use runtime::SecretRuntime;
pub use share::{Share, SharePair, SharedScalar};
