//! CLI binary for drop2md.
//!
//! `drop2md serve` starts the local drag-and-drop web UI; `drop2md convert`
//! runs the same batch pipeline on files from disk.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use drop2md::server::start_server;
use drop2md::{
    clean_stale, format_duration, format_file_size, markdown_preview, output_filename,
    save_download, AppConfig, BatchOrchestrator, BatchProgressCallback, BatchState, Download,
    HistoryStore, LogProgressCallback, ProgressCallback, UploadHandle,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar with one log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn file_elapsed(&self) -> String {
        let elapsed = self
            .started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed())
            .unwrap_or_default();
        format_duration(elapsed)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_progress(&self, state: &BatchState) {
        match *state {
            BatchState::Running { completed: 0, total } => {
                self.bar.set_length(total as u64);
                self.bar.println(format!(
                    "{} {}",
                    cyan("◆"),
                    bold(&format!("Converting {total} file(s)…"))
                ));
            }
            BatchState::Running { completed, .. } => self.bar.set_position(completed as u64),
            BatchState::Completed { total } => {
                self.bar.finish_and_clear();
                eprintln!("{} {} file(s) converted", green("✔"), bold(&total.to_string()));
            }
            BatchState::Failed { at, total } => {
                self.bar.abandon();
                eprintln!("{} stopped at file {}/{}", red("✘"), at, total);
            }
            BatchState::Pending => {}
        }
    }

    fn on_file_start(&self, _index: usize, _total: usize, name: &str) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, name: &str, char_count: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{char_count:>7} chars")),
            dim(&self.file_elapsed()),
        ));
    }

    fn on_file_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(&msg),
            dim(&self.file_elapsed()),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the drag-and-drop UI on http://127.0.0.1:8501
  drop2md serve

  # Convert one file into ./report.md
  drop2md convert report.pdf

  # Convert several files into ./out/drop2md_results.zip
  drop2md convert a.docx b.pptx c.xlsx -o out

  # Show conversion history statistics
  drop2md stats --json

ENVIRONMENT VARIABLES:
  DROP2MD_CONVERTER       Converter program (default: markitdown)
  DROP2MD_TEMP_DIR        Scratch directory for staged uploads
  DROP2MD_OUTPUT_DIR      Directory holding the conversion history
  DROP2MD_MAX_FILE_MB     Per-file size limit in MiB
  DROP2MD_TIMEOUT         Per-file converter timeout in seconds
  DROP2MD_ADDR            Listen address for `serve`
  RUST_LOG                Overrides the log filter

SETUP:
  pip install 'markitdown[all]'
"#;

/// Convert dropped documents to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "drop2md",
    version,
    about = "Convert documents to Markdown with an external converter",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// External converter program.
    #[arg(long, global = true, env = "DROP2MD_CONVERTER", default_value = "markitdown")]
    converter: String,

    /// Scratch directory for staged uploads.
    #[arg(long, global = true, env = "DROP2MD_TEMP_DIR", default_value = "data/temp")]
    temp_dir: PathBuf,

    /// Directory holding the conversion history.
    #[arg(long, global = true, env = "DROP2MD_OUTPUT_DIR", default_value = "data/output")]
    output_dir: PathBuf,

    /// Per-file size limit in MiB.
    #[arg(long, global = true, env = "DROP2MD_MAX_FILE_MB", default_value_t = 50)]
    max_file_size_mb: u64,

    /// Per-file converter timeout in seconds.
    #[arg(long, global = true, env = "DROP2MD_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Number of history records to keep.
    #[arg(long, global = true, env = "DROP2MD_HISTORY_LIMIT", default_value_t = 100)]
    history_limit: usize,

    /// Let the converter load its plugins.
    #[arg(long, global = true, env = "DROP2MD_ENABLE_PLUGINS")]
    enable_plugins: bool,

    /// Ask the converter not to OCR images.
    #[arg(long, global = true, env = "DROP2MD_NO_OCR")]
    no_ocr: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DROP2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DROP2MD_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the local drag-and-drop web UI.
    Serve {
        /// Listen address.
        #[arg(long, env = "DROP2MD_ADDR", default_value = "127.0.0.1:8501")]
        addr: String,
    },

    /// Convert files from disk; one file gives a .md, several give a zip.
    Convert {
        /// Files to convert, in order.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory the download is written to.
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Append a timestamp to a single Markdown file name.
        #[arg(long)]
        timestamp: bool,

        /// Print a JSON summary of the batch on stdout.
        #[arg(long)]
        json: bool,

        /// Disable the progress bar.
        #[arg(long, env = "DROP2MD_NO_PROGRESS")]
        no_progress: bool,
    },

    /// Show aggregate statistics from the conversion history.
    Stats {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Delete leftover temp files older than the given age.
    CleanTemp {
        /// Minimum age in seconds.
        #[arg(long, default_value_t = 3600)]
        max_age_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar gives all the feedback a convert run needs.
    let show_progress = matches!(
        cli.command,
        Command::Convert { json: false, no_progress: false, .. }
    ) && !g.quiet;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(g, &cli.command)?;

    match cli.command {
        Command::Serve { .. } => {
            let orchestrator = BatchOrchestrator::from_config(config)
                .with_progress(Arc::new(LogProgressCallback));
            start_server(orchestrator).await.context("Server failed")?;
        }

        Command::Convert {
            ref files,
            ref out,
            timestamp,
            json,
            ..
        } => {
            let progress: ProgressCallback = if show_progress {
                CliProgressCallback::new() as ProgressCallback
            } else {
                Arc::new(LogProgressCallback) as ProgressCallback
            };
            let orchestrator = BatchOrchestrator::from_config(config).with_progress(progress);

            let mut uploads = Vec::with_capacity(files.len());
            for path in files {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                uploads.push(UploadHandle::new(name, bytes));
            }

            let output = orchestrator.run(&uploads).await.context("Conversion failed")?;

            if json {
                let summary =
                    serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
                println!("{summary}");
            }

            let chars = output.total_chars();
            let words = output.total_words();
            let elapsed = output.total_elapsed;
            let first_source = output.results.first().map(|r| r.source_name.clone());
            let preview = output
                .results
                .first()
                .filter(|_| output.results.len() == 1)
                .map(|r| markdown_preview(&r.markdown, 400));

            let mut download = output.into_download().context("Packaging failed")?;
            if let (true, Download::Markdown { filename, .. }, Some(source)) =
                (timestamp, &mut download, first_source)
            {
                *filename = output_filename(&source, true);
            }
            let size = download.size();
            let path = save_download(download, out)
                .await
                .context("Failed to write download")?;

            if !g.quiet && !json {
                eprintln!(
                    "{}  {} chars  {} words  {}  →  {} ({})",
                    green("✔"),
                    chars,
                    words,
                    format_duration(elapsed),
                    bold(&path.display().to_string()),
                    format_file_size(size),
                );
                if let Some(preview) = preview {
                    eprintln!("{}", dim(&preview));
                }
            }
        }

        Command::Stats { json } => {
            let stats = HistoryStore::from_config(&config).stats().await;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
                );
            } else {
                println!("Conversions:         {}", stats.total_conversions);
                println!("Files processed:     {}", stats.total_files_processed);
                println!("Average time:        {:.2}s", stats.average_conversion_time);
                println!("Most common format:  {}", stats.most_common_format);
                println!("Total input:         {}", format_file_size(stats.total_input_size));
                println!("Total output:        {}", format_file_size(stats.total_output_size));
                println!("Output / input:      {:.2}", stats.compression_ratio);
            }
        }

        Command::CleanTemp { .. } => {
            let removed = clean_stale(&config.temp_dir, config.stale_temp_age())
                .context("Failed to clean temp directory")?;
            if !g.quiet {
                eprintln!(
                    "Removed {} stale file(s) from {}",
                    removed,
                    config.temp_dir.display()
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `AppConfig`.
fn build_config(g: &GlobalArgs, command: &Command) -> Result<AppConfig> {
    let mut builder = AppConfig::builder()
        .converter_program(g.converter.clone())
        .temp_dir(&g.temp_dir)
        .output_dir(&g.output_dir)
        .max_file_size_mb(g.max_file_size_mb)
        .timeout_secs(g.timeout)
        .history_limit(g.history_limit)
        .enable_plugins(g.enable_plugins)
        .enable_ocr(!g.no_ocr);

    match command {
        Command::Serve { addr } => builder = builder.bind_addr(addr.clone()),
        Command::CleanTemp { max_age_secs } => builder = builder.stale_temp_secs(*max_age_secs),
        _ => {}
    }

    builder.build().context("Invalid configuration")
}
