//! Pool watcher
//!
//! Turns bursts of filesystem events under the pool directories into one
//! `request_update` per affected distribution.
//!
//! Architecture:
//! ```text
//! notify → RepoEvent (drop read-only) → DistExtractor → TriggerGate → SettleQueue
//!                                                                        │ settle delay
//!                                                                        ▼
//!                                                  thread: UpdateCoordinator::request_update
//! ```
//!
//! The loop never blocks longer than `poll_interval`, so a shutdown request
//! is noticed within one interval. Pending triggers are dropped on shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use notify::RecommendedWatcher;
use rustc_hash::FxHashSet;

use crate::config::RepoConfig;
use crate::core::Shutdown;
use crate::update::UpdateCoordinator;
use crate::utils::plural::plural_count;
use crate::{debug, log};

// Path → distribution mapping.
mod dist;
// Process-wide trigger clock.
mod debouncer;
// notify::EventKind → RepoEvent.
mod event;
// Delayed triggers.
mod settle;
// Watch root attach/re-attach lifecycle.
mod watch_roots;

#[cfg(test)]
mod tests;

pub use dist::DistExtractor;
pub use event::RepoEvent;
pub use settle::PendingTrigger;

use debouncer::TriggerGate;
use settle::SettleQueue;
use watch_roots::WatchRoots;

/// Timing knobs for the dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct WatchTiming {
    pub min_trigger_interval: Duration,
    pub settle_delay: Duration,
    pub poll_interval: Duration,
}

impl WatchTiming {
    pub fn from_config(config: &RepoConfig) -> Self {
        Self {
            min_trigger_interval: config.watch.min_trigger_interval(),
            settle_delay: config.watch.settle_delay(),
            poll_interval: config.watch.poll_interval(),
        }
    }
}

// =============================================================================
// Dispatcher (pure: no threads, no clock reads)
// =============================================================================

/// Decides which events become triggers and when they fire.
pub struct EventDispatcher {
    extractor: DistExtractor,
    known: FxHashSet<String>,
    gate: TriggerGate,
    settle: SettleQueue,
    settle_delay: Duration,
}

impl EventDispatcher {
    pub fn new<I, S>(extractor: DistExtractor, dists: I, timing: WatchTiming) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extractor,
            known: dists.into_iter().map(Into::into).collect(),
            gate: TriggerGate::new(timing.min_trigger_interval),
            settle: SettleQueue::default(),
            settle_delay: timing.settle_delay,
        }
    }

    /// Handle one raw event observed at `now`.
    ///
    /// Returns the distribution a trigger was scheduled for, if any.
    pub fn handle_at(&mut self, event: &notify::Event, now: Instant) -> Option<String> {
        let kind = RepoEvent::from_kind(&event.kind);
        if kind.is_ignored() {
            return None;
        }

        let (path, dist) = event.paths.iter().find_map(|path| {
            self.extractor
                .extract(path)
                .filter(|dist| self.known.contains(dist))
                .map(|dist| (path, dist))
        })?;

        if !self.gate.try_schedule_at(now) {
            debug!("watch"; "{}: {} {} (same burst)", dist, kind.label(), path.display());
            return None;
        }

        log!("watch"; "{}: {} {}", dist, kind.label(), path.display());
        self.settle.schedule(dist.clone(), now + self.settle_delay);
        Some(dist)
    }

    pub fn take_due(&mut self, now: Instant) -> Vec<PendingTrigger> {
        self.settle.take_due(now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.settle.next_deadline()
    }

    pub fn pending(&self) -> usize {
        self.settle.len()
    }

    #[cfg(test)]
    pub fn last_scheduled(&self) -> Option<Instant> {
        self.gate.last_scheduled()
    }
}

// =============================================================================
// Watcher loop
// =============================================================================

/// Watches pool directories and feeds the coordinator.
pub struct ChangeWatcher {
    notify_rx: Receiver<notify::Result<notify::Event>>,
    /// Must be kept alive for events to flow
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    dispatcher: EventDispatcher,
    coordinator: Arc<UpdateCoordinator>,
    poll_interval: Duration,
}

impl ChangeWatcher {
    /// Start watching `roots` immediately; events buffer until `run`.
    pub fn new(
        roots: Vec<PathBuf>,
        dispatcher: EventDispatcher,
        coordinator: Arc<UpdateCoordinator>,
        poll_interval: Duration,
    ) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = mpsc::channel();
        Self::with_channel(notify_tx, notify_rx, roots, dispatcher, coordinator, poll_interval)
    }

    /// Like `new`, with notify results delivered through the given channel.
    fn with_channel(
        notify_tx: Sender<notify::Result<notify::Event>>,
        notify_rx: Receiver<notify::Result<notify::Event>>,
        roots: Vec<PathBuf>,
        dispatcher: EventDispatcher,
        coordinator: Arc<UpdateCoordinator>,
        poll_interval: Duration,
    ) -> notify::Result<Self> {
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut watch_roots = WatchRoots::new(roots);
        watch_roots.attach_existing(&mut watcher)?;

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            dispatcher,
            coordinator,
            poll_interval,
        })
    }

    pub fn from_config(
        config: &RepoConfig,
        coordinator: Arc<UpdateCoordinator>,
    ) -> notify::Result<Self> {
        let timing = WatchTiming::from_config(config);
        let dispatcher = EventDispatcher::new(
            DistExtractor::new(&config.repo.anchor, &config.repo.pool),
            config.repo.dists.iter().cloned(),
            timing,
        );
        Self::new(
            config.repo.pool_paths(),
            dispatcher,
            coordinator,
            timing.poll_interval,
        )
    }

    /// Run until `shutdown` is triggered.
    pub fn run(mut self, shutdown: &Shutdown) {
        log!("watch"; "watching {}", plural_count(self.watch_roots.attached(), "pool"));

        while !shutdown.is_triggered() {
            match self.notify_rx.recv_timeout(self.next_timeout()) {
                Ok(Ok(event)) => {
                    self.dispatcher.handle_at(&event, Instant::now());
                }
                // Backend hiccups (e.g. queue overflow) are not fatal.
                Ok(Err(e)) => debug!("watch"; "notify error: {}", e),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log!("watch"; "event source closed");
                    break;
                }
            }

            if shutdown.is_triggered() {
                break;
            }
            self.fire_due(Instant::now());
            self.watch_roots.maintain(&mut self.watcher);
        }

        let dropped = self.dispatcher.pending();
        if dropped > 0 {
            debug!("watch"; "dropping {}", plural_count(dropped, "pending trigger"));
        }
        debug!("watch"; "stopped");
    }

    /// Sleep until the next trigger is due, bounded by the poll interval.
    fn next_timeout(&self) -> Duration {
        self.dispatcher
            .next_deadline()
            .map_or(self.poll_interval, |deadline| {
                deadline
                    .saturating_duration_since(Instant::now())
                    .min(self.poll_interval)
            })
    }

    /// Fire due triggers, each on its own thread so a slow rebuild never
    /// stalls the event loop.
    fn fire_due(&mut self, now: Instant) {
        for trigger in self.dispatcher.take_due(now) {
            let coordinator = Arc::clone(&self.coordinator);
            let spawned = thread::Builder::new()
                .name(format!("update-{}", trigger.dist))
                .spawn(move || {
                    // Failures are already logged by the coordinator.
                    let _ = coordinator.request_update(&trigger.dist);
                });
            if let Err(e) = spawned {
                log!("error"; "failed to spawn update thread: {}", e);
            }
        }
    }
}
