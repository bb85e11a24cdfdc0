//! Per-distribution admission control around the rebuild operation.
//!
//! Every distribution owns a [`DistributionState`]: an execution lock that
//! serializes rebuilds, and a counter of requests admitted but still waiting
//! for that lock. A request arriving while `max_queued` others already wait
//! is discarded.
//!
//! ```text
//! request_update("jammy")
//!   ├── waiting >= max_queued ──→ Discarded (logged)
//!   └── waiting += 1
//!         └── lock exec ──→ waiting -= 1 ──→ rebuild ──→ unlock
//! ```
//!
//! Both the counter and the lock are released by guards, so a failing or
//! panicking rebuild never leaves a distribution stuck.

mod rebuild;

pub use rebuild::{CommandRebuild, Rebuild};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::{debug, log};

// =============================================================================
// Public API
// =============================================================================

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("unknown distribution `{0}`")]
    UnknownDistribution(String),

    #[error("rebuilding `{dist}` failed")]
    Rebuild {
        dist: String,
        #[source]
        source: anyhow::Error,
    },
}

/// What happened to an admitted or rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Completed,
    /// The queue was full; nothing ran.
    Discarded,
}

/// Point-in-time view of a distribution, for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionSnapshot {
    pub name: String,
    pub waiting: usize,
    pub running: bool,
}

// =============================================================================
// State
// =============================================================================

pub struct DistributionState {
    name: String,
    /// Held for the whole rebuild.
    exec: Mutex<()>,
    /// Admitted requests not yet holding `exec`.
    waiting: Mutex<usize>,
    running: AtomicBool,
}

impl DistributionState {
    fn new(name: String) -> Self {
        Self {
            name,
            exec: Mutex::new(()),
            waiting: Mutex::new(0),
            running: AtomicBool::new(false),
        }
    }

    fn snapshot(&self) -> DistributionSnapshot {
        DistributionSnapshot {
            name: self.name.clone(),
            waiting: *self.waiting.lock(),
            running: self.running.load(Ordering::SeqCst),
        }
    }
}

/// A reserved place in a distribution's waiting queue.
struct QueueSlot<'a> {
    waiting: &'a Mutex<usize>,
}

impl<'a> QueueSlot<'a> {
    fn admit(state: &'a DistributionState, max_queued: usize) -> Option<Self> {
        let mut waiting = state.waiting.lock();
        if *waiting >= max_queued {
            return None;
        }
        *waiting += 1;
        Some(Self {
            waiting: &state.waiting,
        })
    }
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        let mut waiting = self.waiting.lock();
        *waiting = waiting.saturating_sub(1);
    }
}

struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Serializes rebuilds per distribution and bounds how many may wait.
pub struct UpdateCoordinator {
    dists: FxHashMap<String, DistributionState>,
    /// Configured order, for `request_all` and snapshots.
    order: Vec<String>,
    max_queued: usize,
    rebuild: Arc<dyn Rebuild>,
}

impl UpdateCoordinator {
    pub fn new<I, S>(dists: I, max_queued: usize, rebuild: Arc<dyn Rebuild>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order: Vec<String> = dists.into_iter().map(Into::into).collect();
        let dists = order
            .iter()
            .map(|name| (name.clone(), DistributionState::new(name.clone())))
            .collect();
        Self {
            dists,
            order,
            max_queued,
            rebuild,
        }
    }

    /// Rebuild `dist`, blocking until the rebuild finishes.
    ///
    /// Returns `Discarded` at once when `max_queued` requests already wait.
    /// Rebuild failures are logged and returned; nothing retries them.
    pub fn request_update(&self, dist: &str) -> Result<UpdateOutcome, UpdateError> {
        let state = self
            .dists
            .get(dist)
            .ok_or_else(|| UpdateError::UnknownDistribution(dist.to_string()))?;

        let Some(slot) = QueueSlot::admit(state, self.max_queued) else {
            log!("update"; "{}: {} requests already queued, discarding", dist, self.max_queued);
            return Ok(UpdateOutcome::Discarded);
        };

        let _exec = state.exec.lock();
        drop(slot);
        let _running = RunningFlag::raise(&state.running);

        debug!("update"; "{}: rebuilding", dist);
        let started = Instant::now();
        match self.rebuild.rebuild(dist) {
            Ok(()) => {
                log!("update"; "{}: updated in {:.1?}", dist, started.elapsed());
                Ok(UpdateOutcome::Completed)
            }
            Err(source) => {
                log!("error"; "{}: rebuild failed: {:#}", dist, source);
                Err(UpdateError::Rebuild {
                    dist: dist.to_string(),
                    source,
                })
            }
        }
    }

    /// Rebuild every distribution in parallel, returning per-distribution results.
    pub fn request_all(&self) -> Vec<(String, Result<UpdateOutcome, UpdateError>)> {
        self.order
            .par_iter()
            .map(|dist| (dist.clone(), self.request_update(dist)))
            .collect()
    }

    pub fn snapshot(&self, dist: &str) -> Option<DistributionSnapshot> {
        self.dists.get(dist).map(DistributionState::snapshot)
    }

    pub fn snapshots(&self) -> Vec<DistributionSnapshot> {
        self.order
            .iter()
            .filter_map(|dist| self.snapshot(dist))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
