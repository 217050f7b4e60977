//! Output types returned by a conversion.

use crate::format::{Category, TargetFormat};
use crate::source::SourceFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The complete result of converting one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Converted bytes in the requested target format. Never empty.
    #[serde(skip)]
    pub bytes: Vec<u8>,

    pub target: TargetFormat,

    pub category: Category,

    /// Concrete source format the router dispatched on.
    pub source_format: SourceFormat,

    pub stats: ConversionStats,
}

/// Size and timing of a single conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub input_bytes: usize,
    pub output_bytes: usize,
    /// Wall-clock time spent decoding and encoding.
    pub duration_ms: u64,
}

impl ConversionOutput {
    /// Download name for this output: the original stem plus the target
    /// extension (`holiday.heic` → `holiday.jpg`).
    pub fn file_name_for(&self, original_name: &str) -> String {
        output_file_name(original_name, self.target)
    }

    pub fn mime(&self) -> &'static str {
        self.target.mime()
    }
}

/// `original_name` with its extension replaced by the target's.
pub fn output_file_name(original_name: &str, target: TargetFormat) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "converted".to_string());
    format!("{stem}.{}", target.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_extension() {
        assert_eq!(output_file_name("holiday.HEIC", TargetFormat::Jpeg), "holiday.jpg");
        assert_eq!(output_file_name("report.v2.docx", TargetFormat::Pdf), "report.v2.pdf");
        assert_eq!(output_file_name("README", TargetFormat::PlainText), "README.txt");
    }

    #[test]
    fn empty_name_gets_placeholder_stem() {
        assert_eq!(output_file_name("", TargetFormat::Csv), "converted.csv");
    }

    #[test]
    fn json_skips_bytes() {
        let out = ConversionOutput {
            bytes: vec![1, 2, 3],
            target: TargetFormat::Png,
            category: Category::Image,
            source_format: SourceFormat::Raster,
            stats: ConversionStats {
                input_bytes: 10,
                output_bytes: 3,
                duration_ms: 1,
            },
        };
        let json = serde_json::to_value(&out).expect("serialize");
        assert!(json.get("bytes").is_none());
        assert_eq!(json["target"], "png");
        assert_eq!(json["stats"]["output_bytes"], 3);
    }
}
