//! File classification and target formats.
//!
//! [`classify`] buckets an input into a [`Category`] from its file name and
//! declared MIME type. Declared types are often missing (`""`) or generic
//! (`application/octet-stream`), so the extension is the fallback signal and
//! the rule order below is significant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Classification bucket governing which targets are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Image,
    Document,
    Spreadsheet,
    Text,
    Pdf,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Document => "document",
            Category::Spreadsheet => "spreadsheet",
            Category::Text => "text",
            Category::Pdf => "pdf",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-cased extension of `filename`, without the dot.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Classify a file into a [`Category`].
///
/// First match wins:
/// 1. `image/*` declared type, or `.heic .heif .tiff .tif`
/// 2. `.docx .doc`
/// 3. `.xlsx .xls .csv .ods`
/// 4. `text/*` declared type, or `.txt .html .rtf`
/// 5. `application/pdf` declared type, or `.pdf`
///
/// Returns `None` for anything else.
pub fn classify(filename: &str, declared_mime: &str) -> Option<Category> {
    let ext = extension_of(filename);
    let ext = ext.as_deref().unwrap_or("");
    let mime = declared_mime.trim().to_ascii_lowercase();

    if mime.starts_with("image/") || matches!(ext, "heic" | "heif" | "tiff" | "tif") {
        return Some(Category::Image);
    }
    if matches!(ext, "docx" | "doc") {
        return Some(Category::Document);
    }
    if matches!(ext, "xlsx" | "xls" | "csv" | "ods") {
        return Some(Category::Spreadsheet);
    }
    if mime.starts_with("text/") || matches!(ext, "txt" | "html" | "rtf") {
        return Some(Category::Text);
    }
    if mime == "application/pdf" || ext == "pdf" {
        return Some(Category::Pdf);
    }
    None
}

/// An output format the converter can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Jpeg,
    Png,
    WebP,
    Bmp,
    Gif,
    Pdf,
    Csv,
    Html,
    PlainText,
    Docx,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 10] = [
        TargetFormat::Jpeg,
        TargetFormat::Png,
        TargetFormat::WebP,
        TargetFormat::Bmp,
        TargetFormat::Gif,
        TargetFormat::Pdf,
        TargetFormat::Csv,
        TargetFormat::Html,
        TargetFormat::PlainText,
        TargetFormat::Docx,
    ];

    pub fn mime(&self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "image/jpeg",
            TargetFormat::Png => "image/png",
            TargetFormat::WebP => "image/webp",
            TargetFormat::Bmp => "image/bmp",
            TargetFormat::Gif => "image/gif",
            TargetFormat::Pdf => "application/pdf",
            TargetFormat::Csv => "text/csv",
            TargetFormat::Html => "text/html",
            TargetFormat::PlainText => "text/plain",
            TargetFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    /// Download extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "jpg",
            TargetFormat::Png => "png",
            TargetFormat::WebP => "webp",
            TargetFormat::Bmp => "bmp",
            TargetFormat::Gif => "gif",
            TargetFormat::Pdf => "pdf",
            TargetFormat::Csv => "csv",
            TargetFormat::Html => "html",
            TargetFormat::PlainText => "txt",
            TargetFormat::Docx => "docx",
        }
    }

    /// Short human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "JPEG",
            TargetFormat::Png => "PNG",
            TargetFormat::WebP => "WebP",
            TargetFormat::Bmp => "BMP",
            TargetFormat::Gif => "GIF",
            TargetFormat::Pdf => "PDF",
            TargetFormat::Csv => "CSV",
            TargetFormat::Html => "HTML",
            TargetFormat::PlainText => "plain text",
            TargetFormat::Docx => "DOCX",
        }
    }

    /// Parse an exact MIME type. Parameters (`; charset=…`) are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.mime() == essence)
    }

    /// Parse either a MIME type or a bare extension (`jpg`, `.pdf`, `text`).
    pub fn parse(value: &str) -> Option<Self> {
        if let Some(t) = Self::from_mime(value) {
            return Some(t);
        }
        let ext = value.trim().trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(TargetFormat::Jpeg),
            "png" => Some(TargetFormat::Png),
            "webp" => Some(TargetFormat::WebP),
            "bmp" => Some(TargetFormat::Bmp),
            "gif" => Some(TargetFormat::Gif),
            "pdf" => Some(TargetFormat::Pdf),
            "csv" => Some(TargetFormat::Csv),
            "html" | "htm" => Some(TargetFormat::Html),
            "txt" | "text" => Some(TargetFormat::PlainText),
            "docx" => Some(TargetFormat::Docx),
            _ => None,
        }
    }

    /// Raster targets are encoded from a pixel buffer.
    pub fn is_raster(&self) -> bool {
        matches!(
            self,
            TargetFormat::Jpeg
                | TargetFormat::Png
                | TargetFormat::WebP
                | TargetFormat::Bmp
                | TargetFormat::Gif
        )
    }

    /// Targets with no alpha channel; sources are flattened onto white.
    pub fn is_opaque_only(&self) -> bool {
        matches!(self, TargetFormat::Jpeg | TargetFormat::Bmp)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Extension used when saving output of the given MIME type.
///
/// Unknown types fall back to `bin`.
pub fn extension_for_mime(mime: &str) -> &'static str {
    TargetFormat::from_mime(mime)
        .map(|t| t.extension())
        .unwrap_or("bin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_examples() {
        assert_eq!(classify("photo.HEIC", ""), Some(Category::Image));
        assert_eq!(
            classify("report.docx", "application/octet-stream"),
            Some(Category::Document)
        );
        assert_eq!(classify("data.csv", ""), Some(Category::Spreadsheet));
        assert_eq!(classify("notes.txt", ""), Some(Category::Text));
        assert_eq!(classify("scan.pdf", ""), Some(Category::Pdf));
        assert_eq!(classify("archive.zip", "application/zip"), None);
    }

    #[test]
    fn classify_declared_type_wins_over_extension_order() {
        // image/* is rule 1, so it beats the spreadsheet extension.
        assert_eq!(classify("odd.csv", "image/png"), Some(Category::Image));
        // spreadsheet extension (rule 3) beats text/* (rule 4).
        assert_eq!(classify("data.csv", "text/csv"), Some(Category::Spreadsheet));
        assert_eq!(classify("page.md", "text/markdown"), Some(Category::Text));
        assert_eq!(classify("blob", "application/pdf"), Some(Category::Pdf));
        assert_eq!(classify("scan.TIF", ""), Some(Category::Image));
    }

    #[test]
    fn classify_without_extension_or_type() {
        assert_eq!(classify("README", ""), None);
        assert_eq!(classify("", ""), None);
    }

    #[test]
    fn target_from_mime_and_extension() {
        assert_eq!(TargetFormat::from_mime("image/jpeg"), Some(TargetFormat::Jpeg));
        assert_eq!(
            TargetFormat::from_mime("text/plain; charset=utf-8"),
            Some(TargetFormat::PlainText)
        );
        assert_eq!(TargetFormat::from_mime("image/x-unknown"), None);
        assert_eq!(TargetFormat::parse(".JPG"), Some(TargetFormat::Jpeg));
        assert_eq!(TargetFormat::parse("pdf"), Some(TargetFormat::Pdf));
        assert_eq!(TargetFormat::parse("zip"), None);
    }

    #[test]
    fn extension_table() {
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("application/pdf"), "pdf");
        assert_eq!(extension_for_mime("text/csv"), "csv");
        assert_eq!(extension_for_mime("text/plain"), "txt");
        assert_eq!(extension_for_mime("application/x-whatever"), "bin");
    }

    #[test]
    fn every_target_round_trips_through_its_mime() {
        for t in TargetFormat::ALL {
            assert_eq!(TargetFormat::from_mime(t.mime()), Some(t));
        }
    }
}
