//! Test utilities for the bulletin board crates.
//!
//! Provides `MockSession` for building authenticated requests.
//! Import in `#[cfg(test)]` blocks and `tests/` only — never in production code.

pub mod session;
