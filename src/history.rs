//! Persisted conversion history and aggregate statistics.
//!
//! The log is a JSON array of [`HistoryRecord`]s, oldest first, capped at
//! the configured limit (100 by default). Every append reads the whole file,
//! pushes, trims from the front and writes the whole file back through a
//! temp file + rename, so a crash never leaves a half-written log.
//!
//! There is no lock: two processes appending at the same moment can lose one
//! update. Within one server process appends are serialised by the
//! conversion lane.
//!
//! Nothing here may block a conversion. Read problems degrade to an empty
//! history (logged); write problems come back as [`BookkeepingError`] for
//! the caller to log.

use crate::config::AppConfig;
use crate::error::BookkeepingError;
use crate::format::{extension_of, round2};
use crate::output::ConversionResult;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// One logged outcome of a past conversion.
///
/// Missing fields in older logs fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryRecord {
    pub timestamp: NaiveDateTime,
    pub filename: String,
    pub file_extension: String,
    pub input_size: u64,
    pub output_size: u64,
    /// Seconds, rounded to two decimals.
    pub conversion_time: f64,
    /// `output_size / input_size`, rounded to two decimals; 0 for empty input.
    pub compression_ratio: f64,
}

impl Default for HistoryRecord {
    fn default() -> Self {
        Self {
            timestamp: NaiveDateTime::default(),
            filename: String::new(),
            file_extension: "unknown".to_string(),
            input_size: 0,
            output_size: 0,
            conversion_time: 0.0,
            compression_ratio: 0.0,
        }
    }
}

impl HistoryRecord {
    pub fn new(filename: &str, input_size: u64, output_size: u64, elapsed: Duration) -> Self {
        let compression_ratio = if input_size > 0 {
            round2(output_size as f64 / input_size as f64)
        } else {
            0.0
        };
        Self {
            timestamp: Local::now().naive_local(),
            filename: filename.to_string(),
            file_extension: extension_of(filename),
            input_size,
            output_size,
            conversion_time: round2(elapsed.as_secs_f64()),
            compression_ratio,
        }
    }

    pub fn from_result(result: &ConversionResult) -> Self {
        Self::new(
            &result.source_name,
            result.input_size,
            result.output_size(),
            result.elapsed,
        )
    }
}

/// Aggregate view over the whole history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_conversions: usize,
    pub total_files_processed: usize,
    /// Seconds, rounded to two decimals.
    pub average_conversion_time: f64,
    /// `"None"` for an empty history.
    pub most_common_format: String,
    pub total_input_size: u64,
    pub total_output_size: u64,
    /// Total output / total input, rounded to two decimals; 0 for no input.
    pub compression_ratio: f64,
}

impl ConversionStats {
    pub fn from_records(records: &[HistoryRecord]) -> Self {
        if records.is_empty() {
            return Self {
                total_conversions: 0,
                total_files_processed: 0,
                average_conversion_time: 0.0,
                most_common_format: "None".to_string(),
                total_input_size: 0,
                total_output_size: 0,
                compression_ratio: 0.0,
            };
        }

        let total = records.len();
        let total_input_size: u64 = records.iter().map(|r| r.input_size).sum();
        let total_output_size: u64 = records.iter().map(|r| r.output_size).sum();
        let total_time: f64 = records.iter().map(|r| r.conversion_time).sum();
        let compression_ratio = if total_input_size > 0 {
            round2(total_output_size as f64 / total_input_size as f64)
        } else {
            0.0
        };

        Self {
            total_conversions: total,
            total_files_processed: total,
            average_conversion_time: round2(total_time / total as f64),
            most_common_format: most_common_extension(records),
            total_input_size,
            total_output_size,
            compression_ratio,
        }
    }
}

/// Most frequent extension; on a tie the one seen first wins.
fn most_common_extension(records: &[HistoryRecord]) -> String {
    // Insertion-ordered counts keep the tie-break stable.
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for record in records {
        match counts.iter_mut().find(|(ext, _)| *ext == record.file_extension) {
            Some((_, n)) => *n += 1,
            None => counts.push((record.file_extension.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (ext, n) in counts {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((ext, n));
        }
    }
    best.map(|(ext, _)| ext.to_string())
        .unwrap_or_else(|| "None".to_string())
}

/// Bounded, file-backed conversion log.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    limit: usize,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit: limit.max(1),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.history_path(), config.history_limit)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the log. A missing file is an empty history.
    pub async fn try_load(&self) -> Result<Vec<HistoryRecord>, BookkeepingError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(BookkeepingError::HistoryRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw).map_err(|source| BookkeepingError::HistoryCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Read the log, treating an unreadable or corrupt file as empty.
    pub async fn load(&self) -> Vec<HistoryRecord> {
        self.try_load().await.unwrap_or_else(|e| {
            warn!("{}; treating history as empty", e);
            Vec::new()
        })
    }

    pub async fn append(&self, record: HistoryRecord) -> Result<(), BookkeepingError> {
        self.append_all([record]).await
    }

    /// Append records in order, then keep only the newest `limit`.
    pub async fn append_all(
        &self,
        records: impl IntoIterator<Item = HistoryRecord>,
    ) -> Result<(), BookkeepingError> {
        let mut history = self.load().await;
        history.extend(records);
        if history.len() > self.limit {
            let excess = history.len() - self.limit;
            history.drain(..excess);
        }
        self.persist(&history).await?;
        debug!("History now holds {} records", history.len());
        Ok(())
    }

    pub async fn stats(&self) -> ConversionStats {
        ConversionStats::from_records(&self.load().await)
    }

    async fn persist(&self, history: &[HistoryRecord]) -> Result<(), BookkeepingError> {
        let write_failed = |detail: String| BookkeepingError::HistoryWrite {
            path: self.path.clone(),
            detail,
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_failed(e.to_string()))?;
        }
        let json =
            serde_json::to_string_pretty(history).map_err(|e| write_failed(e.to_string()))?;

        // Write to a sibling temp file first, then rename over the log.
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| write_failed(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| write_failed(e.to_string()))
    }
}
