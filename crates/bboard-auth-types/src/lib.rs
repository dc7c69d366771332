//! Auth types shared across the bulletin board crates.
//!
//! Provides session-token issuing and validation, cookie builders, the
//! `CurrentUser`/`MaybeUser` extractors and the activation-link signer.

pub mod cookie;
pub mod session;
pub mod signer;
pub mod token;
