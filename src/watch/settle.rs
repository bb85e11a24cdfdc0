use std::time::Instant;

/// A rebuild waiting for its settle delay to pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTrigger {
    pub dist: String,
    pub fire_at: Instant,
}

/// Pending triggers, at most one per distribution.
///
/// Replaces chained one-shot timers: the watcher loop sleeps until the
/// earliest `fire_at` (bounded by its poll interval) and fires what is due.
#[derive(Debug, Default)]
pub(super) struct SettleQueue {
    pending: Vec<PendingTrigger>,
}

impl SettleQueue {
    /// Schedule `dist`, superseding a trigger already pending for it.
    pub(super) fn schedule(&mut self, dist: String, fire_at: Instant) {
        match self.pending.iter_mut().find(|t| t.dist == dist) {
            Some(existing) => existing.fire_at = fire_at,
            None => self.pending.push(PendingTrigger { dist, fire_at }),
        }
    }

    pub(super) fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|t| t.fire_at).min()
    }

    /// Remove and return every trigger due at `now`, earliest first.
    pub(super) fn take_due(&mut self, now: Instant) -> Vec<PendingTrigger> {
        let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|t| t.fire_at <= now);
        self.pending = rest;
        due.sort_by_key(|t| t.fire_at);
        due
    }

    pub(super) fn len(&self) -> usize {
        self.pending.len()
    }
}
