//! `debrepo backup`: one backup and prune cycle.

use anyhow::{Context, Result};

use crate::backup::{BackupScheduler, list_artifacts};
use crate::config::RepoConfig;
use crate::log;
use crate::utils::path::display_relative;
use crate::utils::plural::plural_count;

pub fn run_backup(config: &RepoConfig) -> Result<()> {
    let scheduler = BackupScheduler::from_config(config);
    scheduler
        .run_cycle()
        .with_context(|| format!("backup of {} failed", config.repo.root.display()))?;

    let artifacts = list_artifacts(scheduler.destination());
    let newest = artifacts
        .last()
        .and_then(|artifact| artifact.stamp())
        .map(|stamp| format!(", newest from {}", stamp.to_archive_stamp()))
        .unwrap_or_default();
    log!(
        "backup"; "{} in {}{}",
        plural_count(artifacts.len(), "archive"),
        display_relative(scheduler.destination(), &config.root),
        newest
    );
    Ok(())
}
