//! Path utilities.
//!
//! - [`fs`]: Filesystem path normalization (`normalize_path`, `display_relative`)
//! - [`url`]: Request URL to served file resolution

pub mod fs;
pub mod url;

pub use fs::{display_relative, normalize_path};
pub use url::resolve_request_path;
