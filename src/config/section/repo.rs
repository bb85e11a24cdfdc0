//! `[repo]` section configuration.
//!
//! Describes where the repository lives on disk and which distributions
//! it carries.
//!
//! # Example
//!
//! ```toml
//! [repo]
//! root = "repo"               # Served directory (relative to config file)
//! dists_dir = "debian/dists"  # Distributions directory (relative to root)
//! dists = ["jammy", "noble"]
//! anchor = "dists/"           # Marker preceding a distribution name in a path
//! pool = "pool"               # Boundary following the distribution name
//! ```
//!
//! Layout on disk:
//!
//! ```text
//! repo/debian/dists/jammy/pool/...   ← watched
//! repo/debian/dists/jammy/Release    ← produced by the rebuild command
//! ```

use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Repository layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoSectionConfig {
    /// Served directory.
    pub root: PathBuf,

    /// Directory holding one sub-directory per distribution, relative to `root`.
    pub dists_dir: PathBuf,

    /// Configured distributions.
    pub dists: Vec<String>,

    /// Path marker that precedes the distribution name.
    pub anchor: String,

    /// Path component that follows the distribution name.
    pub pool: String,
}

impl Default for RepoSectionConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("repo"),
            dists_dir: PathBuf::from("debian/dists"),
            dists: vec!["stable".to_string()],
            anchor: "dists/".to_string(),
            pool: "pool".to_string(),
        }
    }
}

impl RepoSectionConfig {
    /// Absolute directory containing all distributions.
    pub fn dists_path(&self) -> PathBuf {
        self.root.join(&self.dists_dir)
    }

    /// Directory of a single distribution.
    pub fn dist_path(&self, dist: &str) -> PathBuf {
        self.dists_path().join(dist)
    }

    /// Package pool directory of a single distribution.
    pub fn pool_path(&self, dist: &str) -> PathBuf {
        self.dist_path(dist).join(&self.pool)
    }

    /// Pool directories of every configured distribution.
    pub fn pool_paths(&self) -> Vec<PathBuf> {
        self.dists.iter().map(|d| self.pool_path(d)).collect()
    }

    pub fn normalize(&mut self, base: &Path) {
        self.root = crate::utils::path::normalize_path(&base.join(&self.root));
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let field = FieldPath::new("repo.dists");

        if self.dists.is_empty() {
            diag.error_with_hint(
                field,
                "no distributions configured",
                "add at least one, e.g. `dists = [\"stable\"]`",
            );
        }

        let mut seen = FxHashSet::default();
        for dist in &self.dists {
            if dist.is_empty() || dist.contains('/') {
                diag.error(field, format!("invalid distribution name `{dist}`"));
            } else if !seen.insert(dist.as_str()) {
                diag.error(field, format!("duplicate distribution `{dist}`"));
            }
        }

        if self.anchor.is_empty() {
            diag.error(FieldPath::new("repo.anchor"), "must not be empty");
        }
        if self.pool.is_empty() || self.pool.contains('/') {
            diag.error(FieldPath::new("repo.pool"), "must be a single path component");
        }
    }
}
