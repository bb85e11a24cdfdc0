//! Repository configuration management for `debrepo.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # One file per `[section]`
//! ├── types/         # ConfigError, ConfigDiagnostics
//! ├── util           # Config file lookup
//! └── mod.rs         # RepoConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section     | Purpose                                             |
//! |-------------|-----------------------------------------------------|
//! | `[repo]`    | Repository root, distributions, path markers        |
//! | `[serve]`   | HTTP listener (interface, port, threads)            |
//! | `[auth]`    | Basic auth and brute-force throttling               |
//! | `[watch]`   | Pool watcher timing                                 |
//! | `[update]`  | Rebuild command and queue depth                     |
//! | `[backup]`  | Periodic archives and retention                     |

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{
    AuthConfig, BackupConfig, BackupFormat, MAX_INTERVAL_HOURS, RepoSectionConfig, ServeConfig,
    UpdateConfig, WatchConfig,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{
    cli::{Cli, Commands},
    log,
};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing debrepo.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory holding the config file; relative paths resolve against it
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub repo: RepoSectionConfig,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub update: UpdateConfig,

    #[serde(default)]
    pub backup: BackupConfig,
}

impl RepoConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. Relative paths inside it
    /// are resolved against the config file's directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let Some(config_path) = find_config_file(&cli.config) else {
            bail!(ConfigError::Validation(format!(
                "config file '{}' not found",
                cli.config.display()
            )));
        };

        let mut config = Self::from_path(&config_path)?;
        config.config_path = config_path;
        config.finalize(cli);
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} are ignored: {}", display_path, fields.join(", "));
    }

    /// Resolve paths and apply CLI overrides.
    fn finalize(&mut self, cli: &Cli) {
        let root = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let root = crate::utils::path::normalize_path(&root);

        self.config_path = crate::utils::path::normalize_path(&self.config_path);
        self.repo.normalize(&root);
        self.backup.normalize(&root);
        self.root = root;

        crate::logger::set_verbose(cli.verbose);
        self.apply_command_options(cli);
    }

    fn apply_command_options(&mut self, cli: &Cli) {
        if let Commands::Serve {
            interface,
            port,
            no_watch,
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            if *no_watch {
                self.watch.enable = false;
            }
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Validate every section, reporting all errors at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.repo.validate(&mut diag);
        self.serve.validate(&mut diag);
        self.auth.validate(&mut diag);
        self.watch.validate(&mut diag);
        self.update.validate(&mut diag);
        self.backup.validate(&mut diag);

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> RepoConfig {
    let (parsed, ignored) = RepoConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_invalid_toml() {
        let result = RepoConfig::from_str("[repo\ndists = [\"x\"]");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(RepoConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[repo]\ndists = [\"jammy\"]\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = RepoConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.repo.dists, vec!["jammy".to_string()]);
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_validate_collects_errors_across_sections() {
        let config = test_parse_config(
            "[repo]\ndists = []\n[backup]\ncopies = 0\n[serve]\nthreads = 0",
        );
        let err = config.validate().unwrap_err();
        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::Diagnostics(diag)) => assert_eq!(diag.len(), 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_serve_overrides_applied() {
        let cli: &'static Cli = Box::leak(Box::new(<Cli as clap::Parser>::parse_from([
            "debrepo", "serve", "--port", "9000", "--no-watch",
        ])));
        let mut config = test_parse_config("[serve]\nport = 8000");
        config.config_path = std::env::temp_dir().join("debrepo.toml");
        config.finalize(cli);

        assert_eq!(config.serve.port, 9000);
        assert!(!config.watch.enable);
        assert!(config.repo.root.is_absolute());
        assert!(config.backup.destination.is_absolute());
    }
}
