//! Display helpers: sizes, durations, download names and previews.
//!
//! Everything here is a pure `&str`/number → `String` function so the HTTP
//! layer, the CLI and the history store render values identically.

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::time::Duration;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Fallback used when a name sanitises or resolves to nothing.
pub const UNTITLED: &str = "untitled";

// ── Sizes ────────────────────────────────────────────────────────────────────

/// Format a byte count with 1024-based units.
///
/// Bytes are printed as an integer, larger units with one decimal:
/// `0 B`, `512 B`, `1.0 KB`, `12.1 KB`, `50.0 MB`.
pub fn format_file_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", size_bytes, SIZE_UNITS[0])
    } else {
        format!("{:.1} {}", size, SIZE_UNITS[unit])
    }
}

// ── Durations ────────────────────────────────────────────────────────────────

/// Format an elapsed time: `850ms`, `2.5s`, `3m 5s`, `1h 2m`.
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let minutes = (secs / 60.0).floor() as u64;
        format!("{}m {:.0}s", minutes, secs % 60.0)
    } else {
        let hours = (secs / 3600.0).floor() as u64;
        let minutes = ((secs % 3600.0) / 60.0).floor() as u64;
        format!("{}h {}m", hours, minutes)
    }
}

// ── Names ────────────────────────────────────────────────────────────────────

static RE_UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("static regex"));

/// Replace path-unsafe characters with `_` and trim spaces and dots.
///
/// Never returns an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = RE_UNSAFE_CHARS.replace_all(name, "_");
    let trimmed = replaced.trim_matches(|c: char| c == ' ' || c == '.');
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Last path component of an uploaded name.
///
/// Browsers and CLIs may send `dir/report.pdf` or `C:\dir\report.pdf`.
pub fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Lower-case extension without the dot; empty when there is none.
pub fn extension_of(name: &str) -> String {
    Path::new(base_name(name))
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// File name without its final extension, falling back to `untitled`.
pub fn stem_of(name: &str) -> String {
    Path::new(base_name(name))
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Download name for a converted upload: `<stem>.md`, or
/// `<stem>_<YYYYmmdd_HHMMSS>.md` when `with_timestamp` is set.
pub fn output_filename(input_name: &str, with_timestamp: bool) -> String {
    let stem = sanitize_filename(&stem_of(input_name));
    if with_timestamp {
        format!("{}_{}.md", stem, Local::now().format("%Y%m%d_%H%M%S"))
    } else {
        format!("{}.md", stem)
    }
}

// ── Previews ─────────────────────────────────────────────────────────────────

const TRUNCATION_NOTE: &str = "\n\n... (Content too long, truncated)";

/// Cut `content` to at most `max_chars` characters for display.
///
/// Prefers to cut at the last space or newline, but only when that keeps at
/// least 80 % of the budget.
pub fn markdown_preview(content: &str, max_chars: usize) -> String {
    let Some((byte_end, _)) = content.char_indices().nth(max_chars) else {
        return content.to_string();
    };

    let truncated = &content[..byte_end];
    let floor = max_chars as f64 * 0.8;
    let cut = truncated
        .rfind([' ', '\n'])
        .filter(|&idx| truncated[..idx].chars().count() as f64 > floor)
        .unwrap_or(byte_end);

    format!("{}{}", &content[..cut], TRUNCATION_NOTE)
}

/// Round to two decimal places, as stored in history records.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
