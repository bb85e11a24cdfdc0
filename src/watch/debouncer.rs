use std::time::{Duration, Instant};

/// Process-wide rate limit on scheduling rebuild triggers.
///
/// One clock is shared by every watched pool: an event arriving less than
/// `min_interval` after the last *scheduled* trigger belongs to the same
/// burst and is dropped, whichever distribution it touches.
pub(super) struct TriggerGate {
    min_interval: Duration,
    last_scheduled: Option<Instant>,
}

impl TriggerGate {
    pub(super) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_scheduled: None,
        }
    }

    /// Returns `true` and restarts the clock if a trigger may be scheduled at `now`.
    pub(super) fn try_schedule_at(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_scheduled
            && now.saturating_duration_since(last) < self.min_interval
        {
            return false;
        }
        self.last_scheduled = Some(now);
        true
    }

    #[cfg(test)]
    pub(super) fn last_scheduled(&self) -> Option<Instant> {
        self.last_scheduled
    }
}
