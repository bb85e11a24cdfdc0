//! Periodic repository backups.
//!
//! One cycle is `backup()` followed by `prune()`. Cycles never overlap: the
//! next wait starts only after the previous cycle finished, so slow archive
//! writes push the schedule back instead of piling up.
//!
//! ```text
//! run ─→ cycle ─→ wait(interval | shutdown) ─→ cycle ─→ ...
//! ```

mod archive;
mod prune;

pub use archive::ArchiveKind;
pub use prune::{BackupArtifact, PruneReport, list_artifacts};

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::config::{BackupFormat, MAX_INTERVAL_HOURS, RepoConfig};
use crate::core::Shutdown;
use crate::log;
use crate::utils::date::DateTimeUtc;
use crate::utils::plural::plural_count;

/// Smallest allowed interval between cycles.
pub const MIN_INTERVAL_HOURS: f64 = 1.0;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup source `{0}` is not a directory")]
    MissingSource(PathBuf),

    #[error("I/O error on `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write zip archive")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to walk backup source")]
    Walk(#[from] jwalk::Error),
}

impl BackupError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Io { path, source }
    }
}

/// Archives a source directory on a fixed interval and keeps the newest copies.
#[derive(Debug, Clone)]
pub struct BackupScheduler {
    source: PathBuf,
    destination: PathBuf,
    format: BackupFormat,
    copies: usize,
    interval: Duration,
}

impl BackupScheduler {
    /// `interval_hours` below one hour is raised to one hour with a warning.
    pub fn new(
        source: PathBuf,
        destination: PathBuf,
        format: BackupFormat,
        copies: usize,
        interval_hours: f64,
    ) -> Self {
        Self {
            source,
            destination,
            format,
            copies,
            interval: clamp_interval(interval_hours),
        }
    }

    pub fn from_config(config: &RepoConfig) -> Self {
        Self::new(
            config.repo.root.clone(),
            config.backup.destination.clone(),
            config.backup.format,
            config.backup.copies,
            config.backup.interval_hours,
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Write one archive per configured format, stamped with the current time.
    pub fn backup(&self) -> Result<Vec<PathBuf>, BackupError> {
        self.backup_stamped(&DateTimeUtc::now().to_archive_stamp())
    }

    fn backup_stamped(&self, stamp: &str) -> Result<Vec<PathBuf>, BackupError> {
        std::fs::create_dir_all(&self.destination).map_err(BackupError::io(&self.destination))?;
        archive::remove_partials(&self.destination);

        // The destination may live inside the source tree.
        let exclude = crate::utils::path::normalize_path(&self.destination);
        let source = crate::utils::path::normalize_path(&self.source);
        let entries = archive::collect_entries(&source, Some(&exclude))?;

        let kinds = [
            (self.format.wants_zip(), ArchiveKind::Zip),
            (self.format.wants_tar(), ArchiveKind::TarGz),
        ];
        let mut written = Vec::new();
        for (wanted, kind) in kinds {
            if !wanted {
                continue;
            }
            let target = self.destination.join(kind.file_name(stamp));
            archive::write_archive(kind, &entries, &target)?;
            log!("backup"; "created {}", target.display());
            written.push(target);
        }
        Ok(written)
    }

    pub fn prune(&self) -> PruneReport {
        prune::prune(&self.destination, self.copies)
    }

    /// Backup then prune. Failures are logged; nothing here is fatal.
    pub fn run_cycle(&self) -> Result<(), BackupError> {
        let result = self.backup();
        if let Err(e) = &result {
            log!("error"; "backup failed: {}", display_chain(e));
        }

        let report = self.prune();
        if !report.failed.is_empty() {
            log!("backup"; "could not remove {}", plural_count(report.failed.len(), "old archive"));
        }
        result.map(|_| ())
    }

    /// Run cycles until `shutdown`, the first one immediately.
    pub fn run(&self, shutdown: &Shutdown) {
        log!(
            "backup"; "every {:.1}h into {}, keeping {}",
            self.interval.as_secs_f64() / 3600.0,
            self.destination.display(),
            plural_count(self.copies, "archive")
        );

        while !shutdown.is_triggered() {
            let _ = self.run_cycle();
            if shutdown.wait_timeout(self.interval) {
                break;
            }
        }
    }
}

fn clamp_interval(hours: f64) -> Duration {
    let hours = if hours < MIN_INTERVAL_HOURS || hours.is_nan() {
        log!("warning"; "backup interval cannot be under 1 hour, using 1 hour");
        MIN_INTERVAL_HOURS
    } else {
        hours
    };
    Duration::try_from_secs_f64(hours * 3600.0).unwrap_or_else(|_| {
        log!(
            "warning"; "backup interval of {} hours is too long, using {}",
            hours, MAX_INTERVAL_HOURS
        );
        Duration::from_secs(MAX_INTERVAL_HOURS as u64 * 3600)
    })
}

fn display_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
