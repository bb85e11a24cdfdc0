//! `[serve]` section configuration.
//!
//! Contains HTTP server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "0.0.0.0"       # Network interface (0.0.0.0 = all interfaces)
//! port = 8645                 # HTTP port number
//! threads = 4                 # Request worker threads
//! ```
//!
//! Use `interface = "127.0.0.1"` when a reverse proxy sits in front.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `0.0.0.0` (default): all interfaces
    /// - `127.0.0.1`: localhost only
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Worker threads handling requests.
    pub threads: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8645,
            threads: 4,
        }
    }
}

impl ServeConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.threads == 0 {
            diag.error(FieldPath::new("serve.threads"), "must be at least 1");
        }
    }
}
