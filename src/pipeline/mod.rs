//! Pipeline stages for upload-to-Markdown conversion.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the converter can be swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ scratch ──▶ gateway ──▶ archive
//! (bytes)    (temp file) (converter) (zip, batches only)
//! ```
//!
//! 1. [`upload`]  — display metadata and allow-list / size validation
//! 2. [`scratch`] — stage the bytes in a scoped temp file; the external
//!    converter only reads from paths
//! 3. [`gateway`] — run the external converter with a timeout, map failures
//! 4. [`archive`] — pack several Markdown results into one zip

pub mod archive;
pub mod gateway;
pub mod scratch;
pub mod upload;
