//! Media types accepted by the asset upload endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Pdf,
    Doc,
    Docx,
    Ppt,
    Pptx,
    Xls,
    Xlsx,
    Rtf,
    Txt,
    Html,
    Zip,
    Bmp,
    Gif,
    Jpeg,
    Png,
    Tiff,
}

impl MediaType {
    /// MIME string sent as `mediaType` and `Content-Type`.
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Doc => "application/msword",
            MediaType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            MediaType::Ppt => "application/vnd.ms-powerpoint",
            MediaType::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            MediaType::Xls => "application/vnd.ms-excel",
            MediaType::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            MediaType::Rtf => "text/rtf",
            MediaType::Txt => "text/plain",
            MediaType::Html => "text/html",
            MediaType::Zip => "application/zip",
            MediaType::Bmp => "image/bmp",
            MediaType::Gif => "image/gif",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Tiff => "image/tiff",
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::Doc => "doc",
            MediaType::Docx => "docx",
            MediaType::Ppt => "ppt",
            MediaType::Pptx => "pptx",
            MediaType::Xls => "xls",
            MediaType::Xlsx => "xlsx",
            MediaType::Rtf => "rtf",
            MediaType::Txt => "txt",
            MediaType::Html => "html",
            MediaType::Zip => "zip",
            MediaType::Bmp => "bmp",
            MediaType::Gif => "gif",
            MediaType::Jpeg => "jpeg",
            MediaType::Png => "png",
            MediaType::Tiff => "tiff",
        }
    }

    /// Infer from a file extension (case-insensitive, with or without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        let media = match ext.as_str() {
            "pdf" => MediaType::Pdf,
            "doc" => MediaType::Doc,
            "docx" => MediaType::Docx,
            "ppt" => MediaType::Ppt,
            "pptx" => MediaType::Pptx,
            "xls" => MediaType::Xls,
            "xlsx" => MediaType::Xlsx,
            "rtf" => MediaType::Rtf,
            "txt" => MediaType::Txt,
            "htm" | "html" => MediaType::Html,
            "zip" => MediaType::Zip,
            "bmp" => MediaType::Bmp,
            "gif" => MediaType::Gif,
            "jpg" | "jpeg" => MediaType::Jpeg,
            "png" => MediaType::Png,
            "tif" | "tiff" => MediaType::Tiff,
            _ => return None,
        };
        Some(media)
    }

    /// Infer from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Reverse of [`MediaType::mime`]. Parameters after `;` are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        ALL.iter()
            .copied()
            .find(|m| m.mime().eq_ignore_ascii_case(essence))
    }
}

const ALL: [MediaType; 16] = [
    MediaType::Pdf,
    MediaType::Doc,
    MediaType::Docx,
    MediaType::Ppt,
    MediaType::Pptx,
    MediaType::Xls,
    MediaType::Xlsx,
    MediaType::Rtf,
    MediaType::Txt,
    MediaType::Html,
    MediaType::Zip,
    MediaType::Bmp,
    MediaType::Gif,
    MediaType::Jpeg,
    MediaType::Png,
    MediaType::Tiff,
];

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}
