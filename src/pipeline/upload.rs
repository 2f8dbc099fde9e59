//! Upload handles, display metadata and validation.
//!
//! [`resolve_file_info`] is what the page shows right after a drop, before
//! the user asks for a conversion. [`validate_upload`] runs before any temp
//! file is written, so a rejected upload never touches the converter.

use crate::config::AppConfig;
use crate::error::Drop2MdError;
use crate::format::{base_name, extension_of, format_file_size, UNTITLED};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user-submitted file held in memory for the duration of one request.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadHandle {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadHandle {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lower-case extension of the uploaded name, without the dot.
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }
}

impl fmt::Debug for UploadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadHandle")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Display metadata derived from an [`UploadHandle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub size_display: String,
    pub extension: String,
    pub type_label: String,
    pub upload_time: String,
}

/// Derive display metadata for an upload. Never fails.
pub fn resolve_file_info(upload: &UploadHandle) -> FileInfo {
    let name = base_name(upload.name.trim());
    let name = if name.is_empty() { UNTITLED } else { name };
    let extension = extension_of(name);

    FileInfo {
        name: name.to_string(),
        size: upload.size(),
        size_display: format_file_size(upload.size()),
        type_label: type_label(&extension),
        extension,
        upload_time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

/// Human-readable type label for an extension.
pub fn type_label(extension: &str) -> String {
    let ext = extension.to_ascii_lowercase();
    let known = match ext.as_str() {
        "pdf" => "📄 PDF Document",
        "docx" => "📝 Word Document",
        "pptx" => "📊 PowerPoint Presentation",
        "xlsx" => "📈 Excel Spreadsheet",
        "xls" => "📈 Excel Spreadsheet (Legacy)",
        "jpg" | "jpeg" => "🖼️ JPEG Image",
        "png" => "🖼️ PNG Image",
        "gif" => "🖼️ GIF Image",
        "bmp" => "🖼️ BMP Image",
        "tiff" => "🖼️ TIFF Image",
        "webp" => "🖼️ WebP Image",
        "mp3" => "🎵 MP3 Audio",
        "wav" => "🎵 WAV Audio",
        "m4a" => "🎵 M4A Audio",
        "aac" => "🎵 AAC Audio",
        "html" | "htm" => "🌐 HTML Page",
        "xml" => "🌐 XML Document",
        "xhtml" => "🌐 XHTML Page",
        "csv" => "📊 CSV Data",
        "json" => "📊 JSON Data",
        "yaml" | "yml" => "📊 YAML Data",
        "zip" => "🗜️ ZIP Archive",
        "epub" => "📚 EPUB eBook",
        "txt" => "📄 Text File",
        "rtf" => "📄 RTF Document",
        "md" => "📝 Markdown Document",
        "" => "📄 Unknown File",
        _ => return format!("📄 {} File", ext.to_ascii_uppercase()),
    };
    known.to_string()
}

/// Reject an upload whose extension or size falls outside the configuration.
pub fn validate_upload(upload: &UploadHandle, config: &AppConfig) -> Result<(), Drop2MdError> {
    let extension = upload.extension();
    if !config.is_supported(&extension) {
        return Err(Drop2MdError::UnsupportedFormat {
            name: upload.name.clone(),
            extension,
        });
    }
    if upload.size() > config.max_file_size_bytes {
        return Err(Drop2MdError::FileTooLarge {
            name: upload.name.clone(),
            size: upload.size(),
            limit: config.max_file_size_bytes,
        });
    }
    Ok(())
}
