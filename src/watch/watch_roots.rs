use std::path::PathBuf;

use notify::{RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

/// Keeps every pool directory attached to the watcher.
///
/// Pools missing at startup, or removed and recreated later, are picked up
/// on the next `maintain` call.
pub(super) struct WatchRoots {
    desired: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    pub(super) fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            desired: paths,
            attached: FxHashSet::default(),
        }
    }

    pub(super) fn attach_existing<W: Watcher>(&mut self, watcher: &mut W) -> notify::Result<()> {
        for path in &self.desired {
            if !path.is_dir() {
                crate::log!(
                    "watch"; "{} does not exist yet, will attach when created",
                    path.display()
                );
                continue;
            }
            watcher.watch(path, RecursiveMode::Recursive)?;
            self.attached.insert(path.clone());
        }
        Ok(())
    }

    pub(super) fn maintain<W: Watcher>(&mut self, watcher: &mut W) {
        self.attached.retain(|path| path.is_dir());

        for path in &self.desired {
            if self.attached.contains(path) || !path.is_dir() {
                continue;
            }
            if watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                self.attached.insert(path.clone());
                crate::debug!("watch"; "re-attached {}", path.display());
            }
        }
    }

    pub(super) fn attached(&self) -> usize {
        self.attached.len()
    }
}
