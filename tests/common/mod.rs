//! Shared helpers for the integration tests.

#![allow(dead_code)]

use drop2md::{
    AppConfig, BatchOrchestrator, ConversionGateway, ConvertedDocument, ConverterError,
    DocumentConverter,
};
use futures::future::BoxFuture;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Uploads starting with this marker make [`ScriptedConverter`] fail.
pub const FAIL_MARKER: &[u8] = b"FAIL";
pub const FAIL_MESSAGE: &str = "could not read xref table";

/// Stand-in for the external converter.
///
/// - bytes starting with `%PDF` → a fixed report of 2,000 chars / 300 words
/// - bytes starting with [`FAIL_MARKER`] → [`FAIL_MESSAGE`]
/// - anything else → the bytes as UTF-8, prefixed with a heading
#[derive(Default)]
pub struct ScriptedConverter {
    pub calls: AtomicUsize,
}

impl ScriptedConverter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentConverter for ScriptedConverter {
    fn name(&self) -> &str {
        "scripted"
    }

    fn convert<'a>(
        &'a self,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<ConvertedDocument, ConverterError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| ConverterError::new(e.to_string()))?;
            if bytes.starts_with(FAIL_MARKER) {
                return Err(ConverterError::new(FAIL_MESSAGE));
            }
            if bytes.starts_with(b"%PDF") {
                return Ok(ConvertedDocument::new(report_markdown()));
            }
            let text = String::from_utf8_lossy(&bytes);
            Ok(ConvertedDocument::new(format!("# Converted\n\n{text}\n")))
        })
    }
}

/// 300 whitespace-separated words totalling exactly 2,000 chars.
pub fn report_markdown() -> String {
    let mut words = vec!["w".to_string(); 299];
    words.push("x".repeat(2000 - 2 * 299));
    let text = words.join(" ");
    debug_assert_eq!(text.chars().count(), 2000);
    text
}

/// A fake PDF upload of exactly `size` bytes.
pub fn pdf_bytes(size: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.resize(size, b'.');
    bytes
}

pub fn test_config(root: &Path) -> AppConfig {
    AppConfig::builder()
        .temp_dir(root.join("temp"))
        .output_dir(root.join("output"))
        .max_file_size_mb(1)
        .build()
        .expect("valid test config")
}

pub fn orchestrator(root: &Path, converter: Arc<ScriptedConverter>) -> BatchOrchestrator {
    let gateway = ConversionGateway::new(converter, Duration::from_secs(10));
    BatchOrchestrator::new(test_config(root), gateway)
}
