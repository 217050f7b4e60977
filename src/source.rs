//! Input files and the router's per-format dispatch tag.

use crate::format::{extension_of, Category};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::ConvertError;

/// An immutable input file as handed over by the intake layer.
///
/// Cloning is cheap: the bytes are shared, never copied or mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    declared_mime: String,
    bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        declared_mime: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            declared_mime: declared_mime.into(),
            bytes: Arc::from(bytes),
        }
    }

    /// Read a file from disk. The declared type is left for the caller.
    pub async fn from_path(
        path: impl AsRef<Path>,
        declared_mime: impl Into<String>,
    ) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| ConvertError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, declared_mime, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_mime(&self) -> &str {
        &self.declared_mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lower-cased extension of the file name.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("declared_mime", &self.declared_mime)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// Concrete source format inside a [`Category`].
///
/// Every variant has exactly one router branch; adding a format means adding
/// a variant here and the compiler points at every match that must handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Heic,
    Tiff,
    Raster,
    Docx,
    LegacyDoc,
    Workbook,
    Csv,
    Html,
    PlainText,
    Rtf,
    Pdf,
}

impl SourceFormat {
    /// Resolve the format of a file already classified as `category`.
    pub fn detect(category: Category, file: &SourceFile) -> Self {
        let ext = file.extension();
        let ext = ext.as_deref().unwrap_or("");
        let mime = file.declared_mime().trim().to_ascii_lowercase();

        match category {
            Category::Image => match ext {
                "heic" | "heif" => SourceFormat::Heic,
                "tiff" | "tif" => SourceFormat::Tiff,
                _ if mime == "image/tiff" => SourceFormat::Tiff,
                _ if mime == "image/heic" || mime == "image/heif" => SourceFormat::Heic,
                _ => SourceFormat::Raster,
            },
            Category::Document => match ext {
                "doc" => SourceFormat::LegacyDoc,
                _ => SourceFormat::Docx,
            },
            Category::Spreadsheet => match ext {
                "csv" => SourceFormat::Csv,
                _ => SourceFormat::Workbook,
            },
            Category::Text => match ext {
                "html" | "htm" => SourceFormat::Html,
                "rtf" => SourceFormat::Rtf,
                "txt" => SourceFormat::PlainText,
                _ if mime == "text/html" => SourceFormat::Html,
                _ if mime == "text/rtf" => SourceFormat::Rtf,
                _ => SourceFormat::PlainText,
            },
            Category::Pdf => SourceFormat::Pdf,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Heic => "HEIC",
            SourceFormat::Tiff => "TIFF",
            SourceFormat::Raster => "raster image",
            SourceFormat::Docx => "DOCX",
            SourceFormat::LegacyDoc => "DOC",
            SourceFormat::Workbook => "workbook",
            SourceFormat::Csv => "CSV",
            SourceFormat::Html => "HTML",
            SourceFormat::PlainText => "plain text",
            SourceFormat::Rtf => "RTF",
            SourceFormat::Pdf => "PDF",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
