//! Retention: keep the newest `copies` archives.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::archive::ArchiveKind;
use crate::log;
use crate::utils::date::DateTimeUtc;

/// An archive found in the backup destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArtifact {
    pub path: PathBuf,
    pub created: SystemTime,
    pub kind: ArchiveKind,
}

impl BackupArtifact {
    /// Timestamp embedded in the file name, if it follows the naming scheme.
    pub fn stamp(&self) -> Option<DateTimeUtc> {
        let name = self.path.file_name()?.to_str()?;
        let stem = name.strip_suffix(self.kind.extension())?.strip_suffix('.')?;
        DateTimeUtc::parse_archive_stamp(stem)
    }
}

/// Outcome of one prune pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// List archives in `destination`, oldest first.
///
/// Ordered by creation time (modification time where the filesystem does
/// not record creation), then by name.
pub fn list_artifacts(destination: &Path) -> Vec<BackupArtifact> {
    let Ok(read_dir) = fs::read_dir(destination) else {
        return Vec::new();
    };

    let mut artifacts: Vec<_> = read_dir
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name();
            let kind = ArchiveKind::from_file_name(&name.to_string_lossy())?;
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            Some(BackupArtifact {
                path: entry.path(),
                created,
                kind,
            })
        })
        .collect();

    artifacts.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.path.cmp(&b.path)));
    artifacts
}

/// Delete the oldest archives until at most `copies` remain.
///
/// A failed deletion is logged and the pass continues with the next file.
pub fn prune(destination: &Path, copies: usize) -> PruneReport {
    prune_artifacts(list_artifacts(destination), copies, |path| fs::remove_file(path))
}

/// Remove all but the last `copies` of `artifacts` (oldest first) with `remove`.
fn prune_artifacts(
    artifacts: Vec<BackupArtifact>,
    copies: usize,
    mut remove: impl FnMut(&Path) -> io::Result<()>,
) -> PruneReport {
    let excess = artifacts.len().saturating_sub(copies);

    let mut report = PruneReport::default();
    for artifact in artifacts.into_iter().take(excess) {
        match remove(&artifact.path) {
            Ok(()) => {
                log!("backup"; "removed old backup {}", artifact.path.display());
                report.removed.push(artifact.path);
            }
            Err(e) => {
                log!("backup"; "failed to remove {}: {}", artifact.path.display(), e);
                report.failed.push(artifact.path);
            }
        }
    }
    report
}
