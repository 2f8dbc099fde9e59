//! In-memory zip packaging for batch downloads.

use crate::error::Drop2MdError;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Name of the archive offered for multi-file downloads.
pub const ARCHIVE_FILENAME: &str = "drop2md_results.zip";

/// Pack `(entry name, text)` pairs into a deflate-compressed zip.
///
/// Entries keep the given names and order. When a name repeats, only the
/// last text is kept, at the position of its last occurrence. Every entry
/// carries the zip epoch as its timestamp so identical input yields
/// identical bytes.
pub fn build_archive<N, T>(entries: &[(N, T)]) -> Result<Vec<u8>, Drop2MdError>
where
    N: AsRef<str>,
    T: AsRef<str>,
{
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (i, (name, text)) in entries.iter().enumerate() {
        let name = name.as_ref();
        let overwritten = entries[i + 1..].iter().any(|(later, _)| later.as_ref() == name);
        if overwritten {
            continue;
        }
        writer.start_file(name, options)?;
        writer
            .write_all(text.as_ref().as_bytes())
            .map_err(|e| Drop2MdError::ArchiveFailed(e.into()))?;
    }

    Ok(writer.finish()?.into_inner())
}
