//! Access control for the HTTP layer.
//!
//! - [`guard`]: failure table and the allow/deny/throttle decision
//! - [`credentials`]: Basic header parsing and the user table
//! - [`client`]: client key derivation (spoofable, see module docs)

pub mod client;
pub mod credentials;
mod guard;

pub use client::client_key;
pub use guard::{AccessDecision, AccessGuard, UnauthorizedAccessRecord};
