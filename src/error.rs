//! Error types for the drop2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Drop2MdError`] — **Fatal**: the request cannot produce Markdown
//!   (unsupported upload, converter failure, temp file could not be
//!   written). Returned as `Err(Drop2MdError)` from the gateway, the batch
//!   orchestrator and the archive builder.
//!
//! * [`BookkeepingError`] — **Non-fatal**: history read/write or temp-file
//!   deletion failed. These never block the primary conversion path; the
//!   caller receives them as a `Result` and logs them.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// All fatal errors returned by the drop2md library.
#[derive(Debug, Error)]
pub enum Drop2MdError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// Upload extension is not in the configured allow-list.
    #[error("Unsupported file format for '{name}': '.{extension}'")]
    UnsupportedFormat { name: String, extension: String },

    /// Upload exceeds the configured size limit.
    #[error("File size exceeds limit: '{name}' is {size} bytes (max {limit} bytes)")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    /// A batch was submitted without any files.
    #[error("No files to convert")]
    EmptyBatch,

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The external converter rejected the input or exited with an error.
    #[error("Conversion failed for '{name}': {message}")]
    ConversionFailed { name: String, message: String },

    /// The external converter did not finish within the configured timeout.
    #[error("Conversion timeout for '{name}' after {secs}s")]
    ConversionTimeout { name: String, secs: u64 },

    /// A file in a batch failed; the batch stopped at that item.
    ///
    /// `index` is 1-based. `completed` results were produced before the
    /// failure and have been discarded.
    #[error("Batch aborted at file {index}/{total}: {source}")]
    BatchAborted {
        index: usize,
        total: usize,
        completed: usize,
        #[source]
        source: Box<Drop2MdError>,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The temp file for an upload could not be created or written.
    #[error("Failed to stage upload in '{dir}': {source}")]
    TempFileFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The zip archive could not be assembled.
    #[error("Failed to build archive: {0}")]
    ArchiveFailed(#[from] zip::result::ZipError),

    /// Could not write a Markdown file or archive to disk.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Drop2MdError {
    /// True for errors raised before any conversion was attempted.
    pub fn is_validation(&self) -> bool {
        match self {
            Drop2MdError::UnsupportedFormat { .. }
            | Drop2MdError::FileTooLarge { .. }
            | Drop2MdError::EmptyBatch => true,
            Drop2MdError::BatchAborted { source, .. } => source.is_validation(),
            _ => false,
        }
    }

    /// True when the external converter itself failed or timed out.
    pub fn is_conversion(&self) -> bool {
        match self {
            Drop2MdError::ConversionFailed { .. } | Drop2MdError::ConversionTimeout { .. } => true,
            Drop2MdError::BatchAborted { source, .. } => source.is_conversion(),
            _ => false,
        }
    }

    /// The innermost error, looking through [`Drop2MdError::BatchAborted`].
    pub fn root(&self) -> &Drop2MdError {
        match self {
            Drop2MdError::BatchAborted { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn timeout(name: impl Into<String>, timeout: Duration) -> Self {
        Drop2MdError::ConversionTimeout {
            name: name.into(),
            secs: timeout.as_secs(),
        }
    }
}

/// A non-fatal error from history bookkeeping or temp-file cleanup.
///
/// Never propagated past the component that produced it: callers log it
/// with `tracing::warn!` and carry on.
#[derive(Debug, Error)]
pub enum BookkeepingError {
    /// History file exists but could not be read.
    #[error("Failed to read conversion history '{path}': {source}")]
    HistoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// History file was read but is not a valid record list.
    #[error("Conversion history '{path}' is corrupt: {source}")]
    HistoryCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// History could not be serialised or persisted.
    #[error("Failed to save conversion history '{path}': {detail}")]
    HistoryWrite { path: PathBuf, detail: String },

    /// A temp file could not be deleted.
    #[error("Failed to remove temp file '{path}': {source}")]
    TempCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
