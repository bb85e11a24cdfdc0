//! MIME type detection for repository files.

use std::path::Path;

/// MIME type constants.
pub mod types {
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const DEB: &str = "application/vnd.debian.binary-package";
    pub const GZIP: &str = "application/gzip";
    pub const XZ: &str = "application/x-xz";
    pub const BZIP2: &str = "application/x-bzip2";
    pub const ZSTD: &str = "application/zstd";
    pub const PGP_SIGNATURE: &str = "application/pgp-signature";
    pub const PGP_KEYS: &str = "application/pgp-keys";
    pub const ZIP: &str = "application/zip";
}

/// Guess MIME type from a repository path.
///
/// Index files (`Release`, `Packages`, `Sources`, ...) carry no extension
/// and are served as plain text.
pub fn from_path(path: &Path) -> &'static str {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if matches!(
        name,
        "Release" | "InRelease" | "Packages" | "Sources" | "Contents" | "Index"
    ) {
        return types::PLAIN;
    }
    from_extension(path.extension().and_then(|e| e.to_str()))
}

/// Guess MIME type from file extension string.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("deb" | "udeb" | "ddeb") => types::DEB,
        Some("gz" | "tgz") => types::GZIP,
        Some("xz") => types::XZ,
        Some("bz2") => types::BZIP2,
        Some("zst") => types::ZSTD,
        Some("gpg" | "sig") => types::PGP_SIGNATURE,
        Some("asc" | "key") => types::PGP_KEYS,
        Some("dsc" | "changes" | "buildinfo" | "txt" | "list" | "sources") => types::PLAIN,
        Some("html" | "htm") => types::HTML,
        Some("zip") => types::ZIP,
        _ => types::OCTET_STREAM,
    }
}
