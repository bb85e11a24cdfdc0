//! Request URL to filesystem path resolution.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Resolve a request URL to a regular file under `serve_root`.
///
/// Returns `None` for directories, missing files, undecodable URLs and
/// anything that escapes `serve_root` (via `..` or symlinks).
pub fn resolve_request_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url)?;

    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    let canonical = serve_root.join(&clean).canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;

    if !canonical.starts_with(&root_canonical) || !canonical.is_file() {
        return None;
    }
    Some(canonical)
}

/// Decode, strip query string and fragment, trim slashes.
fn normalize_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    if decoded.contains('\0') || decoded.contains('\\') {
        return None;
    }
    Some(decoded.trim_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        let pool = dir.path().join("debian/dists/jammy/pool");
        fs::create_dir_all(&pool).unwrap();
        fs::write(pool.join("hello_1.0~rc1_amd64.deb"), b"deb").unwrap();
        fs::write(dir.path().join("debian/dists/jammy/Release"), b"r").unwrap();
        dir
    }

    #[test]
    fn test_resolves_file() {
        let dir = repo();
        let path = resolve_request_path("/debian/dists/jammy/Release", dir.path()).unwrap();
        assert!(path.ends_with("Release"));
    }

    #[test]
    fn test_decodes_percent_escapes() {
        let dir = repo();
        let path = resolve_request_path(
            "/debian/dists/jammy/pool/hello_1.0%7erc1_amd64.deb?x=1",
            dir.path(),
        );
        assert!(path.is_some());
    }

    #[test]
    fn test_rejects_traversal() {
        let dir = repo();
        assert!(resolve_request_path("/../etc/passwd", dir.path()).is_none());
        assert!(resolve_request_path("/debian/%2e%2e/%2e%2e/x", dir.path()).is_none());
    }

    #[test]
    fn test_directories_not_served() {
        let dir = repo();
        assert!(resolve_request_path("/debian/dists/jammy", dir.path()).is_none());
        assert!(resolve_request_path("/", dir.path()).is_none());
    }
}
