//! Static compatibility table: which targets each [`Category`] may request.
//!
//! The router consults this table before touching any bytes. A pair that is
//! absent here is rejected even when a decoder and encoder for it exist.

use crate::format::{classify, Category, TargetFormat};
use crate::pipeline::decode::heic;
use crate::source::{SourceFile, SourceFormat};
use serde::Serialize;

/// One legal output for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompatibilityEntry {
    pub target: TargetFormat,
    pub label: &'static str,
}

const fn entry(target: TargetFormat, label: &'static str) -> CompatibilityEntry {
    CompatibilityEntry { target, label }
}

const IMAGE_TARGETS: &[CompatibilityEntry] = &[
    entry(TargetFormat::Jpeg, "JPEG"),
    entry(TargetFormat::Png, "PNG"),
    entry(TargetFormat::WebP, "WebP"),
    entry(TargetFormat::Bmp, "BMP"),
    entry(TargetFormat::Gif, "GIF"),
    entry(TargetFormat::Pdf, "PDF"),
];

const DOCUMENT_TARGETS: &[CompatibilityEntry] = &[
    entry(TargetFormat::Pdf, "PDF"),
    entry(TargetFormat::Html, "HTML"),
];

const SPREADSHEET_TARGETS: &[CompatibilityEntry] = &[
    entry(TargetFormat::Pdf, "PDF"),
    entry(TargetFormat::Csv, "CSV"),
    entry(TargetFormat::Html, "HTML"),
];

const TEXT_TARGETS: &[CompatibilityEntry] = &[
    entry(TargetFormat::Pdf, "PDF"),
    entry(TargetFormat::Docx, "DOCX (basic)"),
];

const PDF_TARGETS: &[CompatibilityEntry] = &[entry(TargetFormat::PlainText, "Plain text")];

/// Ordered legal targets for `category`.
pub fn compatible_targets(category: Category) -> &'static [CompatibilityEntry] {
    match category {
        Category::Image => IMAGE_TARGETS,
        Category::Document => DOCUMENT_TARGETS,
        Category::Spreadsheet => SPREADSHEET_TARGETS,
        Category::Text => TEXT_TARGETS,
        Category::Pdf => PDF_TARGETS,
    }
}

/// Legal targets for a file; empty when the file cannot be classified.
///
/// HEIC/HEIF files get no targets in builds without the `heic` feature,
/// since every conversion of them would fail.
pub fn targets_for_file(filename: &str, declared_mime: &str) -> &'static [CompatibilityEntry] {
    match classify(filename, declared_mime) {
        Some(Category::Image) if !heic::SUPPORTED && is_heic(filename, declared_mime) => &[],
        Some(category) => compatible_targets(category),
        None => &[],
    }
}

fn is_heic(filename: &str, declared_mime: &str) -> bool {
    let file = SourceFile::new(filename, declared_mime, Vec::new());
    SourceFormat::detect(Category::Image, &file) == SourceFormat::Heic
}

/// `true` when the table lists `target` for `category`.
pub fn is_compatible(category: Category, target: TargetFormat) -> bool {
    compatible_targets(category).iter().any(|e| e.target == target)
}
