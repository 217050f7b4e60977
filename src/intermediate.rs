//! Format-agnostic decoded forms passed from decoders to encoders.

use image::RgbaImage;

/// Decoded RGBA pixels at the source's native resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Build from tightly packed RGBA samples; `None` when the length is wrong.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, rgba).map(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn has_transparency(&self) -> bool {
        self.image.pixels().any(|p| p.0[3] < 255)
    }
}

/// Rows of cell text from the first worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// What a decoder hands to an encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Intermediate {
    Pixels(PixelBuffer),
    Markup(String),
    PlainText(String),
    Sheet(Sheet),
}

impl Intermediate {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Intermediate::Pixels(_) => "pixel buffer",
            Intermediate::Markup(_) => "markup",
            Intermediate::PlainText(_) => "plain text",
            Intermediate::Sheet(_) => "sheet",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_checks_length() {
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn transparency_detection() {
        let opaque = PixelBuffer::from_rgba(1, 1, vec![1, 2, 3, 255]).unwrap();
        let clear = PixelBuffer::from_rgba(1, 1, vec![1, 2, 3, 0]).unwrap();
        assert!(!opaque.has_transparency());
        assert!(clear.has_transparency());
    }

    #[test]
    fn ragged_sheet_column_count() {
        let sheet = Sheet::new(vec![vec!["a".into()], vec!["b".into(), "c".into()]]);
        assert_eq!(sheet.column_count(), 2);
    }
}
