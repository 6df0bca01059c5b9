//! Error handling for the retrieval cache
//!
//! Every failure is surfaced to callers as a typed [`CacheError`]; nothing in
//! this crate panics on I/O, network or database faults.

mod conversions;
mod recovery;
mod types;

pub use recovery::RecoveryHint;
pub use types::*;
