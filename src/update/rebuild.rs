//! The rebuild operation invoked by the coordinator.
//!
//! Indexing and signing are opaque to this crate: a rebuild either succeeds
//! or fails. Production uses [`CommandRebuild`], which runs the configured
//! `[update] command` once per distribution.

use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::Result;

use crate::config::RepoConfig;
use crate::utils::exec::Cmd;

/// Rebuilds the index of one distribution.
pub trait Rebuild: Send + Sync {
    fn rebuild(&self, dist: &str) -> Result<()>;
}

impl<F> Rebuild for F
where
    F: Fn(&str) -> Result<()> + Send + Sync,
{
    fn rebuild(&self, dist: &str) -> Result<()> {
        self(dist)
    }
}

/// Runs an external command for each rebuild.
///
/// Arguments may reference `$DEBREPO_DIST`, `$DEBREPO_DIST_DIR` and
/// `$DEBREPO_ROOT`; the same variables are exported to the child. The
/// command runs from the directory holding the config file.
#[derive(Debug, Clone)]
pub struct CommandRebuild {
    command: Vec<String>,
    cwd: PathBuf,
    repo_root: PathBuf,
    dists_path: PathBuf,
}

impl CommandRebuild {
    pub fn new(
        command: Vec<String>,
        cwd: PathBuf,
        repo_root: PathBuf,
        dists_path: PathBuf,
    ) -> Self {
        Self {
            command,
            cwd,
            repo_root,
            dists_path,
        }
    }

    pub fn from_config(config: &RepoConfig) -> Self {
        Self::new(
            config.update.command.clone(),
            config.root.clone(),
            config.repo.root.clone(),
            config.repo.dists_path(),
        )
    }

    fn env_for(&self, dist: &str) -> [(&'static str, String); 3] {
        [
            ("DEBREPO_DIST", dist.to_string()),
            (
                "DEBREPO_DIST_DIR",
                self.dists_path.join(dist).display().to_string(),
            ),
            ("DEBREPO_ROOT", self.repo_root.display().to_string()),
        ]
    }

    /// Substitute repository variables, then fall back to the process environment.
    fn expand<'a>(arg: &'a str, env: &[(&'static str, String)]) -> Cow<'a, str> {
        let expanded = shellexpand::env_with_context_no_errors(arg, |var| {
            env.iter()
                .find(|(key, _)| *key == var)
                .map(|(_, value)| value.clone())
                .or_else(|| std::env::var(var).ok())
        });
        if expanded.starts_with('~') {
            Cow::Owned(shellexpand::tilde(&expanded).into_owned())
        } else {
            expanded
        }
    }

    /// The argv that would be executed for `dist`.
    pub fn argv(&self, dist: &str) -> Vec<String> {
        let env = self.env_for(dist);
        self.command
            .iter()
            .map(|arg| Self::expand(arg, &env).into_owned())
            .collect()
    }
}

impl Rebuild for CommandRebuild {
    fn rebuild(&self, dist: &str) -> Result<()> {
        Cmd::from_slice(&self.argv(dist))
            .cwd(&self.cwd)
            .envs(self.env_for(dist))
            .run()?;
        Ok(())
    }
}
