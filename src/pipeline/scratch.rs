//! Scoped temp files for staged uploads.
//!
//! The external converter only accepts a file-system path, so every upload
//! is written to a [`TempFileScope`] for the duration of its conversion.
//! The scope owns a [`tempfile::NamedTempFile`]: calling
//! [`TempFileScope::release`] deletes it and reports a failed delete; if the
//! scope is dropped instead (early return, panic) `tempfile` removes it.

use crate::error::{BookkeepingError, Drop2MdError};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const TEMP_PREFIX: &str = "drop2md-";

/// A uniquely named temp file that is removed exactly once.
#[derive(Debug)]
pub struct TempFileScope {
    file: NamedTempFile,
}

impl TempFileScope {
    /// Create a temp file in `dir` holding `bytes`.
    ///
    /// `extension` (without the dot) is kept as the file suffix so the
    /// converter can sniff the format from the name. `dir` is created when
    /// missing.
    pub async fn create(dir: &Path, extension: &str, bytes: &[u8]) -> Result<Self, Drop2MdError> {
        let staging_failed = |source| Drop2MdError::TempFileFailed {
            dir: dir.to_path_buf(),
            source,
        };

        tokio::fs::create_dir_all(dir).await.map_err(staging_failed)?;

        let suffix = if extension.is_empty() {
            String::new()
        } else {
            format!(".{extension}")
        };
        // Only the empty file is created here; the upload goes through tokio.
        let file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(staging_failed)?;
        tokio::fs::write(file.path(), bytes)
            .await
            .map_err(staging_failed)?;

        debug!("Staged {} bytes at {}", bytes.len(), file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the temp file now.
    pub fn release(self) -> Result<(), BookkeepingError> {
        let path = self.file.path().to_path_buf();
        self.file
            .close()
            .map_err(|source| BookkeepingError::TempCleanup { path, source })
    }
}

/// Delete regular files in `dir` whose modification time is older than
/// `max_age`, returning how many were removed.
///
/// Picks up files left behind when a process was killed mid-conversion.
/// A missing directory counts as clean.
pub fn clean_stale(dir: &Path, max_age: Duration) -> Result<usize, BookkeepingError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(BookkeepingError::TempCleanup {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age <= max_age {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Could not remove stale temp file {}: {}", path.display(), e),
        }
    }

    if removed > 0 {
        info!("Removed {} stale temp files from {}", removed, dir.display());
    }
    Ok(removed)
}

/// Paths in `dir` that carry the drop2md temp prefix.
#[doc(hidden)]
pub fn staged_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(TEMP_PREFIX))
                })
                .collect()
        })
        .unwrap_or_default()
}
