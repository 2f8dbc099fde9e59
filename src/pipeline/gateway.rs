//! The boundary to the external document converter.
//!
//! Everything format-specific (PDF parsing, OCR, audio transcription) happens
//! inside a third-party tool. [`DocumentConverter`] is the seam: the default
//! [`MarkItDownCommand`] runs the `markitdown` CLI on a staged file, tests
//! plug in their own. [`ConversionGateway`] wraps whichever converter is
//! configured with the timeout and turns every failure into a
//! [`Drop2MdError`] carrying the converter's message. Nothing is retried.

use crate::config::ConverterOptions;
use crate::error::Drop2MdError;
use futures::future::BoxFuture;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Text extracted by a converter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertedDocument {
    pub markdown: String,
}

impl ConvertedDocument {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
        }
    }
}

/// Failure reported by a converter, in the converter's own words.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ConverterError {
    pub message: String,
}

impl ConverterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Turns one file on disk into Markdown.
///
/// Calls are made one at a time; implementations need not be re-entrant
/// but must be `Send + Sync` to live behind an `Arc` in the server state.
pub trait DocumentConverter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn convert<'a>(&'a self, path: &'a Path)
        -> BoxFuture<'a, Result<ConvertedDocument, ConverterError>>;
}

/// Runs an external converter program (by default `markitdown`) as a child
/// process and reads Markdown from its stdout.
#[derive(Debug, Clone)]
pub struct MarkItDownCommand {
    program: String,
    enable_plugins: bool,
    enable_ocr: bool,
}

impl MarkItDownCommand {
    pub fn new(options: &ConverterOptions) -> Self {
        Self {
            program: options.program.clone(),
            enable_plugins: options.enable_plugins,
            enable_ocr: options.enable_ocr,
        }
    }

    fn command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        if self.enable_plugins {
            cmd.arg("--use-plugins");
        }
        cmd.arg(path)
            .env("MARKITDOWN_ENABLE_OCR", if self.enable_ocr { "1" } else { "0" })
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out conversion drops this future; take the child with it.
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, path: &Path) -> Result<ConvertedDocument, ConverterError> {
        debug!("Running {} on {}", self.program, path.display());

        let output = self.command(path).output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConverterError::new(format!(
                    "converter '{}' was not found on PATH (install it with: pip install 'markitdown[all]')",
                    self.program
                ))
            } else {
                ConverterError::new(format!("failed to start '{}': {}", self.program, e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            let message = if detail.is_empty() {
                format!("'{}' exited with {}", self.program, output.status)
            } else {
                detail.lines().last().unwrap_or(detail).to_string()
            };
            return Err(ConverterError::new(message));
        }

        let markdown = String::from_utf8(output.stdout).unwrap_or_else(|e| {
            warn!("Converter output was not valid UTF-8; replacing invalid bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        });
        Ok(ConvertedDocument::new(markdown))
    }
}

impl DocumentConverter for MarkItDownCommand {
    fn name(&self) -> &str {
        &self.program
    }

    fn convert<'a>(
        &'a self,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<ConvertedDocument, ConverterError>> {
        Box::pin(self.run(path))
    }
}

/// A configured converter plus its per-call timeout.
#[derive(Clone)]
pub struct ConversionGateway {
    converter: Arc<dyn DocumentConverter>,
    timeout: Duration,
}

impl std::fmt::Debug for ConversionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionGateway")
            .field("converter", &self.converter.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConversionGateway {
    pub fn new(converter: Arc<dyn DocumentConverter>, timeout: Duration) -> Self {
        Self { converter, timeout }
    }

    /// Gateway around [`MarkItDownCommand`] built from the options.
    pub fn from_options(options: &ConverterOptions) -> Self {
        Self::new(Arc::new(MarkItDownCommand::new(options)), options.timeout())
    }

    /// Convert the staged file at `path`; `name` is the upload name used in errors.
    ///
    /// Single attempt. Converter errors become
    /// [`Drop2MdError::ConversionFailed`], an elapsed timeout becomes
    /// [`Drop2MdError::ConversionTimeout`].
    pub async fn convert(&self, name: &str, path: &Path) -> Result<ConvertedDocument, Drop2MdError> {
        match tokio::time::timeout(self.timeout, self.converter.convert(path)).await {
            Ok(Ok(doc)) => Ok(doc),
            Ok(Err(e)) => Err(Drop2MdError::ConversionFailed {
                name: name.to_string(),
                message: e.message,
            }),
            Err(_) => Err(Drop2MdError::timeout(name, self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sleepy;

    impl DocumentConverter for Sleepy {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn convert<'a>(
            &'a self,
            _path: &'a Path,
        ) -> BoxFuture<'a, Result<ConvertedDocument, ConverterError>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(ConvertedDocument::default())
            })
        }
    }

    struct Broken;

    impl DocumentConverter for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn convert<'a>(
            &'a self,
            _path: &'a Path,
        ) -> BoxFuture<'a, Result<ConvertedDocument, ConverterError>> {
            Box::pin(async { Err(ConverterError::new("File may be corrupted")) })
        }
    }

    #[tokio::test]
    async fn converter_error_keeps_message() {
        let gateway = ConversionGateway::new(Arc::new(Broken), Duration::from_secs(5));
        let err = gateway
            .convert("scan.pdf", Path::new("/tmp/x.pdf"))
            .await
            .unwrap_err();
        match err {
            Drop2MdError::ConversionFailed { name, message } => {
                assert_eq!(name, "scan.pdf");
                assert_eq!(message, "File may be corrupted");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let gateway = ConversionGateway::new(Arc::new(Sleepy), Duration::from_millis(50));
        let err = gateway
            .convert("slow.pdf", Path::new("/tmp/slow.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, Drop2MdError::ConversionTimeout { ref name, .. } if name == "slow.pdf"));
    }

    #[tokio::test]
    async fn missing_program_is_a_conversion_failure() {
        let options = ConverterOptions {
            program: "drop2md-no-such-converter-binary".into(),
            ..ConverterOptions::default()
        };
        let gateway = ConversionGateway::from_options(&options);
        let err = gateway
            .convert("a.pdf", Path::new("/tmp/a.pdf"))
            .await
            .unwrap_err();
        assert!(err.is_conversion());
        assert!(err.to_string().contains("not found on PATH"), "got: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_stdout_becomes_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "# Hello\n\nworld\n").unwrap();

        let options = ConverterOptions {
            program: "cat".into(),
            ..ConverterOptions::default()
        };
        let doc = ConversionGateway::from_options(&options)
            .convert("note.txt", &path)
            .await
            .unwrap();
        assert_eq!(doc.markdown, "# Hello\n\nworld\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_reports_stderr() {
        let options = ConverterOptions {
            program: "cat".into(),
            ..ConverterOptions::default()
        };
        let err = ConversionGateway::from_options(&options)
            .convert("gone.txt", Path::new("/definitely/not/here.txt"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No such file"), "got: {err}");
    }

    /// Writes an executable that prints the OCR env var and its arguments.
    #[cfg(unix)]
    fn echo_converter(dir: &Path) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-markitdown");
        std::fs::write(&script, "#!/bin/sh\necho \"$MARKITDOWN_ENABLE_OCR $@\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    async fn echoed(program: &str, enable_plugins: bool, enable_ocr: bool) -> String {
        let options = ConverterOptions {
            program: program.to_string(),
            enable_plugins,
            enable_ocr,
            ..ConverterOptions::default()
        };
        ConversionGateway::from_options(&options)
            .convert("a.pdf", Path::new("/tmp/a.pdf"))
            .await
            .unwrap()
            .markdown
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn plugins_flag_passed_only_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let program = echo_converter(dir.path());

        let on = echoed(&program, true, true).await;
        assert!(on.contains("--use-plugins /tmp/a.pdf"), "got: {on}");

        let off = echoed(&program, false, true).await;
        assert!(!off.contains("--use-plugins"), "got: {off}");
        assert!(off.contains("/tmp/a.pdf"), "got: {off}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ocr_toggle_reaches_child_env() {
        let dir = tempfile::tempdir().unwrap();
        let program = echo_converter(dir.path());

        assert!(echoed(&program, false, true).await.starts_with("1 "));
        assert!(echoed(&program, false, false).await.starts_with("0 "));
    }
}
