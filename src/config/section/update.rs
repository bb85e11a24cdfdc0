//! `[update]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [update]
//! command = ["./scripts/reindex.sh", "$DEBREPO_DIST"]
//! max_queued = 2      # Requests allowed to wait behind a running rebuild
//! on_start = true     # Rebuild every distribution when `serve` starts
//! ```
//!
//! The command receives `$DEBREPO_DIST`, `$DEBREPO_DIST_DIR` and
//! `$DEBREPO_ROOT`, both substituted into arguments and exported.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Rebuild settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Command and arguments that rebuild and sign one distribution.
    pub command: Vec<String>,
    pub max_queued: usize,
    pub on_start: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            command: vec!["./reindex.sh".to_string(), "$DEBREPO_DIST".to_string()],
            max_queued: 2,
            on_start: true,
        }
    }
}

impl UpdateConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.command.first().is_none_or(|program| program.trim().is_empty()) {
            diag.error_with_hint(
                FieldPath::new("update.command"),
                "rebuild command is empty",
                "e.g. `command = [\"./reindex.sh\", \"$DEBREPO_DIST\"]`",
            );
        }
        if self.max_queued == 0 {
            diag.error(
                FieldPath::new("update.max_queued"),
                "must be at least 1 so a request can wait for its own rebuild",
            );
        }
    }
}
