//! Archive writers.
//!
//! Both formats store entries under the source directory's own name:
//!
//! ```text
//! /srv/apt/repo/debian/dists/jammy/Release  →  repo/debian/dists/jammy/Release
//! ```
//!
//! Archives are written to a `.partial` file and renamed into place, so a
//! listing of the destination never sees half-written archives.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use zip::CompressionMethod;
use zip::write::FileOptions;

use super::BackupError;
use crate::log;

/// On-disk archive flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }

    /// Recognize an archive by file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(".tar.gz") {
            Some(Self::TarGz)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    pub fn file_name(self, stamp: &str) -> String {
        format!("{stamp}.{}", self.extension())
    }
}

/// One file or directory to archive.
#[derive(Debug, Clone)]
pub(super) struct Entry {
    pub(super) path: PathBuf,
    /// `/`-separated, prefixed with the source base name.
    pub(super) name: String,
    pub(super) is_dir: bool,
}

/// Collect archive entries under `source`, skipping anything under `exclude`.
pub(super) fn collect_entries(
    source: &Path,
    exclude: Option<&Path>,
) -> Result<Vec<Entry>, BackupError> {
    if !source.is_dir() {
        return Err(BackupError::MissingSource(source.to_path_buf()));
    }
    let base = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string());

    let mut entries = Vec::new();
    for entry in jwalk::WalkDir::new(source).sort(true).skip_hidden(false) {
        let entry = entry?;
        let path = entry.path();
        if exclude.is_some_and(|ex| path.starts_with(ex)) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(source) else {
            continue;
        };

        let file_type = entry.file_type();
        if !(file_type.is_file() || file_type.is_dir()) {
            continue;
        }

        let name = std::iter::once(base.clone())
            .chain(
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned()),
            )
            .collect::<Vec<_>>()
            .join("/");

        entries.push(Entry {
            path,
            name,
            is_dir: file_type.is_dir(),
        });
    }
    Ok(entries)
}

/// Write `entries` to `target` in the given format.
pub(super) fn write_archive(
    kind: ArchiveKind,
    entries: &[Entry],
    target: &Path,
) -> Result<(), BackupError> {
    let partial = target.with_extension(format!("{}.partial", target_ext(target)));
    let result = match kind {
        ArchiveKind::Zip => write_zip(entries, &partial),
        ArchiveKind::TarGz => write_tar_gz(entries, &partial),
    };

    match result {
        Ok(()) => fs::rename(&partial, target).map_err(BackupError::io(target)),
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

/// Delete `.partial` files left behind by an interrupted write.
pub(super) fn remove_partials(destination: &Path) -> Vec<PathBuf> {
    let Ok(read_dir) = fs::read_dir(destination) else {
        return Vec::new();
    };

    let mut removed = Vec::new();
    for entry in read_dir.flatten() {
        let path = entry.path();
        let is_partial = path.extension().is_some_and(|ext| ext == "partial");
        if !is_partial || !path.is_file() {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                log!("backup"; "removed unfinished archive {}", path.display());
                removed.push(path);
            }
            Err(e) => log!("backup"; "failed to remove {}: {}", path.display(), e),
        }
    }
    removed
}

fn target_ext(target: &Path) -> String {
    target
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_zip(entries: &[Entry], target: &Path) -> Result<(), BackupError> {
    let file = File::create(target).map_err(BackupError::io(target))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    for entry in entries {
        if entry.is_dir {
            zip.add_directory(entry.name.as_str(), options)?;
            continue;
        }
        zip.start_file(entry.name.as_str(), options)?;
        let mut source = File::open(&entry.path).map_err(BackupError::io(&entry.path))?;
        io::copy(&mut source, &mut zip).map_err(BackupError::io(&entry.path))?;
    }

    zip.finish()?;
    Ok(())
}

fn write_tar_gz(entries: &[Entry], target: &Path) -> Result<(), BackupError> {
    let file = File::create(target).map_err(BackupError::io(target))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut tar = tar::Builder::new(encoder);

    for entry in entries {
        let added = if entry.is_dir {
            tar.append_dir(&entry.name, &entry.path)
        } else {
            tar.append_path_with_name(&entry.path, &entry.name)
        };
        added.map_err(BackupError::io(&entry.path))?;
    }

    let encoder = tar.into_inner().map_err(BackupError::io(target))?;
    encoder.finish().map_err(BackupError::io(target))?;
    Ok(())
}
