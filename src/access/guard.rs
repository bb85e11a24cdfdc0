use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::credentials::{Credentials, UserTable};
use crate::config::AuthConfig;
use crate::log;

/// What the HTTP layer should do with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    /// 401 with a Basic challenge.
    Deny,
    /// 429, credentials not even looked at.
    Throttle,
}

/// Failures seen from one client in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnauthorizedAccessRecord {
    pub count: u32,
    pub first: Instant,
}

/// Per-client throttle for repeated authentication failures.
///
/// ```text
/// unknown ──fail──→ tracked (count < threshold)
///                      │ fail
///                      ▼
///                   blocked (count >= threshold, now - first < window)
///                      │ checked after window
///                      ▼
///                   record deleted → unknown
/// ```
///
/// Expiry is lazy: a blocked record is only removed when `is_blocked_at`
/// checks it after the window.
///
/// Records below the threshold are never deleted (short of a successful
/// login with `reset_on_success`), so the table grows by one entry per
/// distinct failing client key. With `trust_forwarded_for` the key comes
/// from a client-controlled header, so a client can grow the table at will;
/// see [`super::client`].
pub struct AccessGuard {
    enabled: bool,
    users: UserTable,
    threshold: u32,
    window: Duration,
    reset_on_success: bool,
    records: Mutex<FxHashMap<String, UnauthorizedAccessRecord>>,
}

impl AccessGuard {
    pub fn new(users: UserTable, threshold: u32, window: Duration) -> Self {
        Self {
            enabled: true,
            users,
            threshold,
            window,
            reset_on_success: false,
            records: Mutex::new(FxHashMap::default()),
        }
    }

    /// A guard that allows everything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(UserTable::default(), u32::MAX, Duration::ZERO)
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        if !config.is_enabled() {
            return Self::disabled();
        }
        Self::new(
            UserTable::new(config.users.clone()),
            config.block_threshold,
            config.block_window(),
        )
        .with_reset_on_success(config.reset_on_success)
    }

    pub fn with_reset_on_success(mut self, reset: bool) -> Self {
        self.reset_on_success = reset;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // ========================================================================
    // failure table
    // ========================================================================

    pub fn is_blocked_at(&self, client: &str, now: Instant) -> bool {
        let mut records = self.records.lock();
        let Some(record) = records.get(client) else {
            return false;
        };
        if record.count < self.threshold {
            return false;
        }
        if now.saturating_duration_since(record.first) < self.window {
            return true;
        }
        records.remove(client);
        false
    }

    /// Count a failure; `first` is kept from the earliest failure in the window.
    pub fn record_failure_at(&self, client: &str, now: Instant) {
        let mut records = self.records.lock();
        records
            .entry(client.to_string())
            .and_modify(|record| record.count = record.count.saturating_add(1))
            .or_insert(UnauthorizedAccessRecord {
                count: 1,
                first: now,
            });
    }

    pub fn clear(&self, client: &str) {
        self.records.lock().remove(client);
    }

    pub fn record(&self, client: &str) -> Option<UnauthorizedAccessRecord> {
        self.records.lock().get(client).copied()
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.records.lock().len()
    }

    // ========================================================================
    // request check
    // ========================================================================

    /// Decide on a request from `client` carrying the raw `Authorization` value.
    pub fn authorize(&self, client: &str, header: Option<&str>) -> AccessDecision {
        self.authorize_at(client, header, Instant::now())
    }

    pub fn authorize_at(&self, client: &str, header: Option<&str>, now: Instant) -> AccessDecision {
        if !self.enabled {
            return AccessDecision::Allow;
        }

        if self.is_blocked_at(client, now) {
            log!("auth"; "{} is throttled", client);
            return AccessDecision::Throttle;
        }

        let verified = header
            .and_then(Credentials::from_basic_header)
            .is_some_and(|credentials| self.users.verify(&credentials));

        if verified {
            if self.reset_on_success {
                self.clear(client);
            }
            return AccessDecision::Allow;
        }

        self.record_failure_at(client, now);
        log!("auth"; "unauthorized request from {}", client);
        AccessDecision::Deny
    }
}
