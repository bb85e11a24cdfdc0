//! debrepo - control plane for a self-hosted Debian repository.

mod access;
mod backup;
mod cli;
mod config;
mod core;
mod logger;
mod update;
mod utils;
mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::RepoConfig;
use core::Shutdown;
use update::{CommandRebuild, UpdateCoordinator};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = RepoConfig::load(&cli)?;
    let coordinator = Arc::new(UpdateCoordinator::new(
        config.repo.dists.iter().cloned(),
        config.update.max_queued,
        Arc::new(CommandRebuild::from_config(&config)),
    ));

    match &cli.command {
        Commands::Serve { .. } => serve(&config, coordinator),
        Commands::Update { dists } => cli::update::run_update(&coordinator, dists),
        Commands::Backup => cli::backup::run_backup(&config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

/// Bind, start background workers, then serve until Ctrl+C.
fn serve(config: &RepoConfig, coordinator: Arc<UpdateCoordinator>) -> Result<()> {
    let shutdown = Shutdown::new();
    shutdown.install_ctrlc_handler()?;

    create_pool_dirs(config)?;

    // Bind first so a busy port fails before any rebuild runs
    let bound = cli::serve::bind_server(config, &shutdown)?;

    if config.update.on_start {
        // Failures are logged by the coordinator; serving goes on regardless
        let _ = coordinator.request_all();
    }

    let mut workers = cli::serve::Workers::new();

    if config.watch.enable {
        match watch::ChangeWatcher::from_config(config, Arc::clone(&coordinator)) {
            Ok(watcher) => {
                let shutdown = shutdown.clone();
                workers.spawn("watch", move || watcher.run(&shutdown))?;
            }
            Err(e) => log!("error"; "failed to start watcher: {}", e),
        }
    }

    if config.backup.enable {
        let scheduler = backup::BackupScheduler::from_config(config);
        let shutdown = shutdown.clone();
        workers.spawn("backup", move || scheduler.run(&shutdown))?;
    }

    let ctx = Arc::new(cli::serve::ServeContext::from_config(config, shutdown.clone()));
    let result = bound.run(ctx, config.serve.threads);

    // The request loop also ends on a bind-level failure; stop the workers either way
    shutdown.trigger();
    workers.join();

    for dist in coordinator.snapshots().iter().filter(|s| s.running) {
        log!("update"; "{}: rebuild still running at exit", dist.name);
    }
    result
}

/// Create each distribution's pool so the watcher has roots to attach to.
fn create_pool_dirs(config: &RepoConfig) -> Result<()> {
    for pool in config.repo.pool_paths() {
        std::fs::create_dir_all(&pool)
            .with_context(|| format!("failed to create pool directory {}", pool.display()))?;
    }
    Ok(())
}
