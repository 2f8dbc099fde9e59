//! Configuration for upload validation, conversion and bookkeeping.
//!
//! Every component receives the same [`AppConfig`], built through
//! [`AppConfigBuilder`]. Nothing reads global state: the supported extension
//! set, size limits, directories and converter toggles all travel in this
//! struct.

use crate::error::Drop2MdError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extensions accepted by the upload boundary, grouped by family.
pub const DEFAULT_SUPPORTED_EXTENSIONS: &[&str] = &[
    // Documents
    "pdf", "docx", "pptx", "xlsx", "xls",
    // Images
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp",
    // Audio
    "mp3", "wav", "m4a", "aac",
    // Web and markup
    "html", "htm", "xml", "xhtml",
    // Data
    "csv", "json", "yaml", "yml",
    // Archives and ebooks
    "zip", "epub",
    // Text
    "txt", "rtf", "md",
];

/// File name of the persisted history log inside `output_dir`.
pub const HISTORY_FILE_NAME: &str = "conversion_history.json";

/// Options forwarded verbatim to the external converter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterOptions {
    /// Program invoked for each file. Default: `markitdown`.
    pub program: String,

    /// Ask the converter to load third-party plugins. Default: false.
    pub enable_plugins: bool,

    /// Ask the converter to OCR embedded images. Default: true.
    pub enable_ocr: bool,

    /// Upper bound for a single conversion, in seconds. Default: 300.
    ///
    /// The child process is killed when the bound is hit.
    pub timeout_secs: u64,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            program: "markitdown".to_string(),
            enable_plugins: false,
            enable_ocr: true,
            timeout_secs: 300,
        }
    }
}

impl ConverterOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration shared by every drop2md component.
///
/// Built via [`AppConfig::builder()`] or [`AppConfig::default()`].
///
/// # Example
/// ```rust
/// use drop2md::AppConfig;
///
/// let config = AppConfig::builder()
///     .max_file_size_mb(10)
///     .temp_dir("/tmp/drop2md")
///     .timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_file_size_bytes, 10 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Lower-case extensions (without the dot) accepted for upload.
    pub supported_extensions: Vec<String>,

    /// Largest accepted upload in bytes. Default: 50 MiB.
    pub max_file_size_bytes: u64,

    /// Largest accepted HTTP request body. Default: 10 × `max_file_size_bytes`.
    pub max_request_bytes: u64,

    /// Directory for staged uploads. Default: `data/temp`.
    pub temp_dir: PathBuf,

    /// Directory for the history log and CLI output. Default: `data/output`.
    pub output_dir: PathBuf,

    /// Number of history records kept on disk. Default: 100.
    pub history_limit: usize,

    /// Temp files older than this are swept by `clean_stale`. Default: 3600 s.
    pub stale_temp_secs: u64,

    /// Address the HTTP server binds to. Default: `127.0.0.1:8501`.
    pub bind_addr: String,

    /// External converter pass-through options.
    pub converter: ConverterOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        let max_file_size_bytes = 50 * 1024 * 1024;
        Self {
            supported_extensions: DEFAULT_SUPPORTED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            max_file_size_bytes,
            max_request_bytes: max_file_size_bytes * 10,
            temp_dir: PathBuf::from("data").join("temp"),
            output_dir: PathBuf::from("data").join("output"),
            history_limit: 100,
            stale_temp_secs: 3600,
            bind_addr: "127.0.0.1:8501".to_string(),
            converter: ConverterOptions::default(),
        }
    }
}

impl AppConfig {
    /// Create a new builder for `AppConfig`.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder {
            config: Self::default(),
            size_overflow: None,
        }
    }

    /// Case-insensitive allow-list check.
    pub fn is_supported(&self, extension: &str) -> bool {
        let ext = extension.to_ascii_lowercase();
        self.supported_extensions.iter().any(|e| *e == ext)
    }

    /// Path of the persisted history log.
    pub fn history_path(&self) -> PathBuf {
        self.output_dir.join(HISTORY_FILE_NAME)
    }

    pub fn stale_temp_age(&self) -> Duration {
        Duration::from_secs(self.stale_temp_secs)
    }
}

/// Builder for [`AppConfig`].
#[derive(Debug)]
pub struct AppConfigBuilder {
    config: AppConfig,
    /// Set when `max_file_size_mb` does not fit in bytes; reported by `build()`.
    size_overflow: Option<u64>,
}

impl AppConfigBuilder {
    pub fn supported_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.supported_extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Also raises `max_request_bytes` to 10 × the new limit.
    ///
    /// A limit too large to express in bytes makes `build()` fail.
    pub fn max_file_size_mb(mut self, mb: u64) -> Self {
        let limits = mb
            .max(1)
            .checked_mul(1024 * 1024)
            .and_then(|bytes| bytes.checked_mul(10).map(|request| (bytes, request)));
        match limits {
            Some((bytes, request)) => {
                self.config.max_file_size_bytes = bytes;
                self.config.max_request_bytes = request;
                self.size_overflow = None;
            }
            None => self.size_overflow = Some(mb),
        }
        self
    }

    pub fn max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_size_bytes = bytes;
        self
    }

    pub fn max_request_bytes(mut self, bytes: u64) -> Self {
        self.config.max_request_bytes = bytes;
        self
    }

    pub fn temp_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.temp_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn history_limit(mut self, n: usize) -> Self {
        self.config.history_limit = n.max(1);
        self
    }

    pub fn stale_temp_secs(mut self, secs: u64) -> Self {
        self.config.stale_temp_secs = secs;
        self
    }

    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    pub fn converter_program(mut self, program: impl Into<String>) -> Self {
        self.config.converter.program = program.into();
        self
    }

    pub fn enable_plugins(mut self, v: bool) -> Self {
        self.config.converter.enable_plugins = v;
        self
    }

    pub fn enable_ocr(mut self, v: bool) -> Self {
        self.config.converter.enable_ocr = v;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.converter.timeout_secs = secs.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AppConfig, Drop2MdError> {
        if let Some(mb) = self.size_overflow {
            return Err(Drop2MdError::InvalidConfig(format!(
                "Max file size of {mb} MB is too large"
            )));
        }
        let c = &self.config;
        if c.supported_extensions.is_empty() {
            return Err(Drop2MdError::InvalidConfig(
                "At least one supported extension is required".into(),
            ));
        }
        if c.max_file_size_bytes == 0 {
            return Err(Drop2MdError::InvalidConfig(
                "Max file size must be > 0".into(),
            ));
        }
        if c.max_request_bytes < c.max_file_size_bytes {
            return Err(Drop2MdError::InvalidConfig(format!(
                "Request body cap ({} bytes) is smaller than the file size limit ({} bytes)",
                c.max_request_bytes, c.max_file_size_bytes
            )));
        }
        if c.converter.program.trim().is_empty() {
            return Err(Drop2MdError::InvalidConfig(
                "Converter program must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upload_boundary() {
        let c = AppConfig::default();
        assert_eq!(c.max_file_size_bytes, 50 * 1024 * 1024);
        assert_eq!(c.history_limit, 100);
        assert_eq!(c.converter.timeout_secs, 300);
        assert!(c.converter.enable_ocr);
        assert!(!c.converter.enable_plugins);
        assert_eq!(c.supported_extensions.len(), DEFAULT_SUPPORTED_EXTENSIONS.len());
    }

    #[test]
    fn supported_check_ignores_case() {
        let c = AppConfig::default();
        assert!(c.is_supported("PDF"));
        assert!(c.is_supported("docx"));
        assert!(!c.is_supported("exe"));
        assert!(!c.is_supported(""));
    }

    #[test]
    fn builder_normalises_extensions() {
        let c = AppConfig::builder()
            .supported_extensions([".PDF", "Txt"])
            .build()
            .unwrap();
        assert_eq!(c.supported_extensions, vec!["pdf", "txt"]);
    }

    #[test]
    fn builder_rejects_empty_allow_list() {
        let err = AppConfig::builder()
            .supported_extensions(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, Drop2MdError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_body_cap_below_file_limit() {
        let err = AppConfig::builder()
            .max_file_size_bytes(1000)
            .max_request_bytes(10)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Request body cap"));
    }

    #[test]
    fn oversized_mb_limit_is_rejected_not_wrapped() {
        let err = AppConfig::builder()
            .max_file_size_mb(18_446_744_073_709)
            .build()
            .unwrap_err();
        assert!(matches!(err, Drop2MdError::InvalidConfig(ref m) if m.contains("too large")));

        // Fits in bytes, but 10 × overflows the request cap.
        let err = AppConfig::builder()
            .max_file_size_mb(u64::MAX / (1024 * 1024))
            .build()
            .unwrap_err();
        assert!(matches!(err, Drop2MdError::InvalidConfig(_)));

        // A later valid value clears the error.
        let c = AppConfig::builder()
            .max_file_size_mb(u64::MAX)
            .max_file_size_mb(20)
            .build()
            .unwrap();
        assert_eq!(c.max_file_size_bytes, 20 * 1024 * 1024);
        assert_eq!(c.max_request_bytes, 200 * 1024 * 1024);
    }

    #[test]
    fn history_path_lives_in_output_dir() {
        let c = AppConfig::builder().output_dir("/srv/out").build().unwrap();
        assert_eq!(c.history_path(), PathBuf::from("/srv/out/conversion_history.json"));
    }
}
