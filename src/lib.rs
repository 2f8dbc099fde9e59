//! # drop2md
//!
//! Drag documents in, get Markdown out.
//!
//! drop2md stages each uploaded file in a scoped temp file, hands it to an
//! external document converter (`markitdown` by default), and returns one
//! `.md` file for a single upload or a zip of `.md` files for several. Each
//! successful conversion is appended to a bounded JSON history that backs
//! a small statistics view.
//!
//! ## Pipeline Overview
//!
//! ```text
//! uploads (name + bytes)
//!  │
//!  ├─ 1. Validate  extension allow-list, per-file size limit (whole batch first)
//!  ├─ 2. Stage     bytes → temp file with the original extension
//!  ├─ 3. Convert   external converter, with timeout; temp file removed after
//!  ├─ 4. Package   one result → <stem>.md, several → drop2md_results.zip
//!  └─ 5. Record    one history record per converted file
//! ```
//!
//! Files are converted one at a time, in upload order. The first failure
//! stops the batch and nothing is downloadable.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use drop2md::{AppConfig, BatchOrchestrator, UploadHandle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::builder().max_file_size_mb(20).build()?;
//!     let orchestrator = BatchOrchestrator::from_config(config);
//!
//!     let upload = UploadHandle::new("report.pdf", std::fs::read("report.pdf")?);
//!     let output = orchestrator.run(&[upload]).await?;
//!     eprintln!("{} chars, {} words", output.total_chars(), output.total_words());
//!
//!     let download = output.into_download()?;
//!     let filename = download.filename().to_owned();
//!     std::fs::write(filename, download.into_bytes())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | `drop2md` binary support (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | Local web UI and JSON API (axum + tower-http) |
//!
//! Disable both when using only the library:
//! ```toml
//! drop2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod format;
pub mod history;
pub mod output;
pub mod pipeline;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{save_download, BatchOrchestrator};
pub use config::{AppConfig, AppConfigBuilder, ConverterOptions};
pub use error::{BookkeepingError, Drop2MdError};
pub use format::{format_duration, format_file_size, markdown_preview, output_filename, sanitize_filename};
pub use history::{ConversionStats, HistoryRecord, HistoryStore};
pub use output::{BatchOutput, ConversionResult, Download};
pub use pipeline::archive::{build_archive, ARCHIVE_FILENAME};
pub use pipeline::gateway::{
    ConversionGateway, ConvertedDocument, ConverterError, DocumentConverter, MarkItDownCommand,
};
pub use pipeline::scratch::{clean_stale, TempFileScope};
pub use pipeline::upload::{resolve_file_info, FileInfo, UploadHandle};
pub use progress::{
    BatchProgressCallback, BatchState, LogProgressCallback, ProgressCallback,
};
