//! Cross-cutting web plumbing shared by the bulletin board binaries.

pub mod config;
pub mod health;
pub mod html;
pub mod middleware;
pub mod sea_ext;
pub mod tracing;
