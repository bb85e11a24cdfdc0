//! `[backup]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [backup]
//! enable = true
//! destination = "backups"   # Relative to the config file
//! interval_hours = 24       # Values under 1 are raised to 1
//! copies = 5                # Archives kept after pruning
//! format = "both"           # "zip", "tar" (tar.gz) or "both"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFormat {
    #[default]
    Zip,
    Tar,
    Both,
}

impl BackupFormat {
    pub fn wants_zip(self) -> bool {
        matches!(self, Self::Zip | Self::Both)
    }

    pub fn wants_tar(self) -> bool {
        matches!(self, Self::Tar | Self::Both)
    }
}

/// Longest accepted interval between backups.
pub const MAX_INTERVAL_HOURS: f64 = 24.0 * 365.0;

/// Backup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub enable: bool,
    pub destination: PathBuf,
    pub interval_hours: f64,
    pub copies: usize,
    pub format: BackupFormat,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enable: false,
            destination: PathBuf::from("backups"),
            interval_hours: 24.0,
            copies: 5,
            format: BackupFormat::Zip,
        }
    }
}

impl BackupConfig {
    pub fn normalize(&mut self, base: &Path) {
        self.destination = crate::utils::path::normalize_path(&base.join(&self.destination));
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.copies == 0 {
            diag.error(FieldPath::new("backup.copies"), "must keep at least 1 copy");
        }
        if !self.interval_hours.is_finite() {
            diag.error(FieldPath::new("backup.interval_hours"), "must be a finite number");
        } else if self.interval_hours > MAX_INTERVAL_HOURS {
            diag.error_with_hint(
                FieldPath::new("backup.interval_hours"),
                format!("must be at most {MAX_INTERVAL_HOURS} (one year)"),
                "use `interval_hours = 8760` for a yearly backup",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_backup_defaults() {
        let config = test_parse_config("");
        assert!(!config.backup.enable);
        assert_eq!(config.backup.copies, 5);
        assert_eq!(config.backup.format, BackupFormat::Zip);
        assert!((config.backup.interval_hours - 24.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_backup_format_variants() {
        let config = test_parse_config("[backup]\nformat = \"both\"");
        assert!(config.backup.format.wants_zip());
        assert!(config.backup.format.wants_tar());

        let config = test_parse_config("[backup]\nformat = \"tar\"");
        assert!(!config.backup.format.wants_zip());
        assert!(config.backup.format.wants_tar());
    }

    #[test]
    fn test_backup_invalid_format_rejected() {
        let result = crate::config::RepoConfig::from_str("[backup]\nformat = \"rar\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_backup_huge_interval_rejected() {
        let config = test_parse_config("[backup]\nenable = true\ninterval_hours = 1e300");
        let mut diag = ConfigDiagnostics::new();
        config.backup.validate(&mut diag);
        assert_eq!(diag.len(), 1);

        let config = test_parse_config("[backup]\ninterval_hours = 8760");
        let mut diag = ConfigDiagnostics::new();
        config.backup.validate(&mut diag);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_backup_zero_copies_rejected() {
        let config = test_parse_config("[backup]\ncopies = 0");
        let mut diag = ConfigDiagnostics::new();
        config.backup.validate(&mut diag);
        assert!(!diag.is_empty());
    }
}
