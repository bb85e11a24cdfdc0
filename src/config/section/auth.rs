//! `[auth]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [auth]
//! mode = "basic"              # "none" (default) or "basic"
//! trust_forwarded_for = false # Key clients by X-Forwarded-For first hop
//! block_threshold = 5         # Failures before a client is throttled
//! block_window_secs = 1800    # Window measured from the first failure
//! reset_on_success = false    # Clear a client's failures after a good login
//!
//! [auth.users]
//! alice = "s3cret"
//! ```
//!
//! `trust_forwarded_for` must only be enabled behind a reverse proxy that
//! overwrites the header. Otherwise any client can pick its own key and
//! dodge throttling.

use std::time::Duration;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    None,
    Basic,
}

/// Access control settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,

    pub trust_forwarded_for: bool,

    /// Failure count at which a client becomes blocked.
    pub block_threshold: u32,

    /// Block window in seconds, measured from the first failure.
    pub block_window_secs: u64,

    pub reset_on_success: bool,

    /// Username → password.
    pub users: FxHashMap<String, String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::None,
            trust_forwarded_for: false,
            block_threshold: 5,
            block_window_secs: 30 * 60,
            reset_on_success: false,
            users: FxHashMap::default(),
        }
    }
}

impl AuthConfig {
    pub fn is_enabled(&self) -> bool {
        self.mode == AuthMode::Basic
    }

    pub fn block_window(&self) -> Duration {
        Duration::from_secs(self.block_window_secs)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.is_enabled() && self.users.is_empty() {
            diag.error_with_hint(
                FieldPath::new("auth.users"),
                "basic auth is enabled but no users are configured",
                "add `[auth.users]` entries or set `mode = \"none\"`",
            );
        }
        if self.block_threshold == 0 {
            diag.error(FieldPath::new("auth.block_threshold"), "must be at least 1");
        }
        if !self.is_enabled() && self.trust_forwarded_for {
            diag.warn(
                FieldPath::new("auth.trust_forwarded_for"),
                "has no effect while `auth.mode` is \"none\"",
            );
        }
        for name in self.users.keys() {
            if name.contains(':') {
                diag.error(
                    FieldPath::new("auth.users"),
                    format!("username `{name}` must not contain `:`"),
                );
            }
        }
    }
}
