use std::path::Path;

/// Maps an event path to the distribution it belongs to.
///
/// The distribution is the single path segment between `anchor` and the
/// `pool` component:
///
/// ```text
/// /srv/repo/debian/dists/jammy/pool/main/h/hello.deb
///                  ^^^^^^ ^^^^^ ^^^^
///                  anchor dist  pool
/// ```
#[derive(Debug, Clone)]
pub struct DistExtractor {
    anchor: String,
    pool: String,
}

impl DistExtractor {
    pub fn new(anchor: impl Into<String>, pool: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            pool: pool.into(),
        }
    }

    pub fn extract(&self, path: &Path) -> Option<String> {
        if self.anchor.is_empty() {
            return None;
        }
        let text = path.to_string_lossy();

        // Later anchors win: the repository root itself may contain the marker.
        text.rmatch_indices(self.anchor.as_str())
            .find_map(|(start, _)| self.dist_after(&text[start + self.anchor.len()..]))
    }

    fn dist_after(&self, rest: &str) -> Option<String> {
        let (dist, tail) = rest.split_once('/')?;
        if dist.is_empty() {
            return None;
        }
        let after_pool = tail.strip_prefix(self.pool.as_str())?;
        (after_pool.is_empty() || after_pool.starts_with('/')).then(|| dist.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn extractor() -> DistExtractor {
        DistExtractor::new("dists/", "pool")
    }

    #[test]
    fn test_extracts_dist_from_pool_path() {
        let path = PathBuf::from("/srv/repo/debian/dists/jammy/pool/main/h/hello_1.0_amd64.deb");
        assert_eq!(extractor().extract(&path).as_deref(), Some("jammy"));
    }

    #[test]
    fn test_pool_directory_itself() {
        let path = PathBuf::from("/srv/repo/debian/dists/noble/pool");
        assert_eq!(extractor().extract(&path).as_deref(), Some("noble"));
    }

    #[test]
    fn test_no_pool_boundary() {
        let path = PathBuf::from("/srv/repo/debian/dists/jammy/Release");
        assert_eq!(extractor().extract(&path), None);
        let path = PathBuf::from("/srv/repo/debian/dists/jammy/poolside/x.deb");
        assert_eq!(extractor().extract(&path), None);
    }

    #[test]
    fn test_anchor_inside_root_path() {
        let path = PathBuf::from("/home/dists/repo/debian/dists/bookworm/pool/x.deb");
        assert_eq!(extractor().extract(&path).as_deref(), Some("bookworm"));
    }

    #[test]
    fn test_no_anchor() {
        let path = PathBuf::from("/srv/repo/pool/x.deb");
        assert_eq!(extractor().extract(&path), None);
    }
}
