//! Shared utilities for pincache
//!
//! Path resolution following the XDG base directory layout and the
//! tracing subscriber setup used by the command-line front end.

pub mod tracing;
pub mod xdg;

pub use xdg::*;
