//! Results produced by a conversion batch and the download they become.

use crate::error::Drop2MdError;
use crate::format::{output_filename, stem_of};
use crate::pipeline::archive::{build_archive, ARCHIVE_FILENAME};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One converted upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Name of the uploaded file, as given.
    pub source_name: String,
    /// Upload name without its extension.
    pub stem: String,
    pub markdown: String,
    /// Unicode scalar values in `markdown`.
    pub char_count: usize,
    /// Whitespace-separated tokens in `markdown`.
    pub word_count: usize,
    /// Size of the upload in bytes.
    pub input_size: u64,
    #[serde(with = "duration_ms", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

impl ConversionResult {
    pub fn new(source_name: &str, markdown: String, input_size: u64, elapsed: Duration) -> Self {
        Self {
            source_name: source_name.to_string(),
            stem: stem_of(source_name),
            char_count: markdown.chars().count(),
            word_count: markdown.split_whitespace().count(),
            markdown,
            input_size,
            elapsed,
        }
    }

    /// Download name: `<stem>.md`.
    pub fn output_filename(&self) -> String {
        output_filename(&self.source_name, false)
    }

    /// Size of the Markdown in bytes.
    pub fn output_size(&self) -> u64 {
        self.markdown.len() as u64
    }
}

/// Every result of a batch that completed, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutput {
    pub results: Vec<ConversionResult>,
    #[serde(with = "duration_ms", rename = "total_elapsed_ms")]
    pub total_elapsed: Duration,
}

impl BatchOutput {
    pub fn total_chars(&self) -> usize {
        self.results.iter().map(|r| r.char_count).sum()
    }

    pub fn total_words(&self) -> usize {
        self.results.iter().map(|r| r.word_count).sum()
    }

    /// A single Markdown file for one result, a zip for several.
    pub fn into_download(self) -> Result<Download, Drop2MdError> {
        let mut results = self.results;
        match results.len() {
            0 => Err(Drop2MdError::EmptyBatch),
            1 => {
                let result = results.remove(0);
                Ok(Download::Markdown {
                    filename: result.output_filename(),
                    text: result.markdown,
                })
            }
            _ => {
                let entries: Vec<(String, String)> = results
                    .into_iter()
                    .map(|r| (r.output_filename(), r.markdown))
                    .collect();
                Ok(Download::Archive {
                    filename: ARCHIVE_FILENAME.to_string(),
                    bytes: build_archive(&entries)?,
                })
            }
        }
    }
}

/// What the user receives at the end of a successful batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Download {
    Markdown { filename: String, text: String },
    Archive { filename: String, bytes: Vec<u8> },
}

impl Download {
    pub fn filename(&self) -> &str {
        match self {
            Download::Markdown { filename, .. } | Download::Archive { filename, .. } => filename,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Download::Markdown { .. } => "text/markdown; charset=utf-8",
            Download::Archive { .. } => "application/zip",
        }
    }

    /// Size of the download body in bytes.
    pub fn size(&self) -> u64 {
        match self {
            Download::Markdown { text, .. } => text.len() as u64,
            Download::Archive { bytes, .. } => bytes.len() as u64,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Download::Markdown { text, .. } => text.into_bytes(),
            Download::Archive { bytes, .. } => bytes,
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
