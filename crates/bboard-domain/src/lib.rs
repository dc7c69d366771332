//! Domain types shared across the bulletin board crates.
//!
//! This crate contains only pure types with no framework dependencies.
//! Import in `usecase/` and `domain/` layers; `handlers/` only read them.

pub mod form;
pub mod pagination;
