//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! enable = true
//! min_trigger_interval_ms = 1000  # Events closer than this to the last trigger are one burst
//! settle_delay_ms = 500           # Delay between a trigger and the rebuild
//! poll_interval_ms = 200          # Shutdown polling bound for the event loop
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Upper bound for the event loop poll interval.
pub const MAX_POLL_INTERVAL_MS: u64 = 500;

/// Pool watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enable: bool,
    pub min_trigger_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enable: true,
            min_trigger_interval_ms: 1000,
            settle_delay_ms: 500,
            poll_interval_ms: 200,
        }
    }
}

impl WatchConfig {
    pub fn min_trigger_interval(&self) -> Duration {
        Duration::from_millis(self.min_trigger_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !(1..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            diag.error_with_hint(
                FieldPath::new("watch.poll_interval_ms"),
                format!("{} is out of range", self.poll_interval_ms),
                format!("use a value between 1 and {MAX_POLL_INTERVAL_MS}"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_watch_defaults() {
        let config = test_parse_config("");
        assert!(config.watch.enable);
        assert_eq!(config.watch.min_trigger_interval(), Duration::from_secs(1));
        assert_eq!(config.watch.settle_delay(), Duration::from_millis(500));
        assert_eq!(config.watch.poll_interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_watch_poll_interval_bounds() {
        let config = test_parse_config("[watch]\npoll_interval_ms = 2000");
        let mut diag = ConfigDiagnostics::new();
        config.watch.validate(&mut diag);
        assert!(!diag.is_empty());

        let config = test_parse_config("[watch]\npoll_interval_ms = 500");
        let mut diag = ConfigDiagnostics::new();
        config.watch.validate(&mut diag);
        assert!(diag.is_empty());
    }
}
