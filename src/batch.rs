//! Batch conversion: validate, stage, convert, record.
//!
//! [`BatchOrchestrator::run`] walks the uploads strictly in order, one at a
//! time; the external converter is not assumed to be thread-safe. Each file
//! goes through its own [`TempFileScope`], which is released before the next
//! file starts. The first failure stops the batch and discards the results
//! gathered so far; history is written only after every file succeeded.

use crate::config::AppConfig;
use crate::error::Drop2MdError;
use crate::history::{HistoryRecord, HistoryStore};
use crate::output::{BatchOutput, ConversionResult, Download};
use crate::pipeline::gateway::ConversionGateway;
use crate::pipeline::scratch::TempFileScope;
use crate::pipeline::upload::{validate_upload, UploadHandle};
use crate::progress::{BatchState, ProgressCallback};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives a list of uploads through the conversion gateway.
pub struct BatchOrchestrator {
    config: AppConfig,
    gateway: ConversionGateway,
    history: Option<HistoryStore>,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("config", &self.config)
            .field("gateway", &self.gateway)
            .field("history", &self.history)
            .field("progress", &self.progress.as_ref().map(|_| "<dyn BatchProgressCallback>"))
            .finish()
    }
}

impl BatchOrchestrator {
    /// Orchestrator that records history under `config.output_dir`.
    pub fn new(config: AppConfig, gateway: ConversionGateway) -> Self {
        let history = HistoryStore::from_config(&config);
        Self {
            config,
            gateway,
            history: Some(history),
            progress: None,
        }
    }

    /// Orchestrator around the configured external converter program.
    pub fn from_config(config: AppConfig) -> Self {
        let gateway = ConversionGateway::from_options(&config.converter);
        Self::new(config, gateway)
    }

    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    pub fn without_history(mut self) -> Self {
        self.history = None;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn history(&self) -> Option<&HistoryStore> {
        self.history.as_ref()
    }

    /// Check every upload against the allow-list and size limit.
    pub fn validate(&self, uploads: &[UploadHandle]) -> Result<(), Drop2MdError> {
        if uploads.is_empty() {
            return Err(Drop2MdError::EmptyBatch);
        }
        uploads
            .iter()
            .try_for_each(|upload| validate_upload(upload, &self.config))
    }

    /// Convert every upload, in order, stopping at the first failure.
    ///
    /// # Errors
    /// - validation errors, before any file is staged
    /// - [`Drop2MdError::BatchAborted`] wrapping the first conversion or
    ///   staging failure
    pub async fn run(&self, uploads: &[UploadHandle]) -> Result<BatchOutput, Drop2MdError> {
        self.emit(&BatchState::Pending);
        self.validate(uploads)?;

        let total = uploads.len();
        let started = Instant::now();
        info!("Starting batch of {} file(s)", total);
        self.emit(&BatchState::Running {
            completed: 0,
            total,
        });

        let mut results = Vec::with_capacity(total);
        for (i, upload) in uploads.iter().enumerate() {
            let index = i + 1;
            if let Some(ref cb) = self.progress {
                cb.on_file_start(index, total, &upload.name);
            }

            match self.convert_one(upload).await {
                Ok(result) => {
                    if let Some(ref cb) = self.progress {
                        cb.on_file_complete(index, total, &upload.name, result.char_count);
                    }
                    results.push(result);
                    self.emit(&BatchState::Running {
                        completed: index,
                        total,
                    });
                }
                Err(e) => {
                    if let Some(ref cb) = self.progress {
                        cb.on_file_error(index, total, &upload.name, &e.to_string());
                    }
                    self.emit(&BatchState::Failed { at: index, total });
                    warn!("Batch aborted at {}/{}: {}", index, total, e);
                    return Err(Drop2MdError::BatchAborted {
                        index,
                        total,
                        completed: results.len(),
                        source: Box::new(e),
                    });
                }
            }
        }

        self.emit(&BatchState::Completed { total });
        let output = BatchOutput {
            results,
            total_elapsed: started.elapsed(),
        };
        info!(
            "Batch complete: {} file(s), {} chars in {}ms",
            total,
            output.total_chars(),
            output.total_elapsed.as_millis()
        );

        self.record_history(&output).await;
        Ok(output)
    }

    /// Stage one upload, convert it, release the temp file.
    async fn convert_one(&self, upload: &UploadHandle) -> Result<ConversionResult, Drop2MdError> {
        let started = Instant::now();
        let scope =
            TempFileScope::create(&self.config.temp_dir, &upload.extension(), &upload.bytes)
                .await?;

        let converted = self.gateway.convert(&upload.name, scope.path()).await;

        if let Err(e) = scope.release() {
            warn!("{}", e);
        }

        let doc = converted?;
        Ok(ConversionResult::new(
            &upload.name,
            doc.markdown,
            upload.size(),
            started.elapsed(),
        ))
    }

    async fn record_history(&self, output: &BatchOutput) {
        let Some(ref history) = self.history else {
            return;
        };
        let records = output.results.iter().map(HistoryRecord::from_result);
        match history.append_all(records).await {
            Ok(()) => debug!("Recorded {} conversion(s) in history", output.results.len()),
            Err(e) => warn!("{}", e),
        }
    }

    fn emit(&self, state: &BatchState) {
        debug!("Batch {}", state);
        if let Some(ref cb) = self.progress {
            cb.on_progress(state);
        }
    }
}

/// Write a download into `dir` and return its path.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn save_download(download: Download, dir: &Path) -> Result<PathBuf, Drop2MdError> {
    let path = dir.join(download.filename());
    let write_failed = |source| Drop2MdError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(write_failed)?;

    let tmp_path = path.with_extension("part");
    tokio::fs::write(&tmp_path, download.into_bytes())
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(write_failed)?;

    Ok(path)
}
