//! Configuration section definitions.
//!
//! Each module corresponds to a section in `debrepo.toml`:
//!
//! | Module   | TOML Section | Purpose                                    |
//! |----------|--------------|--------------------------------------------|
//! | `repo`   | `[repo]`     | Repository layout and distributions        |
//! | `serve`  | `[serve]`    | HTTP server                                |
//! | `auth`   | `[auth]`     | Basic auth and failure throttling          |
//! | `watch`  | `[watch]`    | Pool watcher debounce/settle timing        |
//! | `update` | `[update]`   | External rebuild command and admission cap |
//! | `backup` | `[backup]`   | Snapshot schedule and retention            |

mod auth;
mod backup;
mod repo;
mod serve;
mod update;
mod watch;

pub use auth::AuthConfig;
pub use backup::{BackupConfig, BackupFormat, MAX_INTERVAL_HOURS};
pub use repo::RepoSectionConfig;
pub use serve::ServeConfig;
pub use update::UpdateConfig;
pub use watch::WatchConfig;
