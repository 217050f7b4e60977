//! Fixed output-shaping constants.
//!
//! These values are part of the conversion contract: golden-output tests and
//! downstream consumers rely on them, so they are constants rather than
//! configuration.

/// Quality factor for lossy raster targets (0.9 on a 0–1 scale).
pub const LOSSY_QUALITY: f32 = 0.9;

/// [`LOSSY_QUALITY`] on the 1–100 scale used by the JPEG encoder.
pub const JPEG_QUALITY: u8 = 90;

/// Text and markup PDFs use A4 portrait, in millimetres.
pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;

/// Left and top offset of the content box.
pub const PAGE_MARGIN_MM: f32 = 10.0;

/// Width of the content box; text wraps at this width.
pub const CONTENT_WIDTH_MM: f32 = 190.0;

/// Virtual layout widths for markup rendering, in CSS pixels.
pub const DOCX_VIRTUAL_WIDTH: f32 = 800.0;
pub const SHEET_VIRTUAL_WIDTH: f32 = 800.0;
pub const HTML_VIRTUAL_WIDTH: f32 = 650.0;

/// Font size for plain-text PDFs, in points.
pub const TEXT_FONT_SIZE_PT: f32 = 11.0;

/// Base font size of a markup layout, in CSS pixels before scaling.
pub const MARKUP_BASE_FONT_PX: f32 = 16.0;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.15;

/// Points per millimetre.
pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// Convert millimetres to PDF points.
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * PT_PER_MM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_quality_matches_lossy_quality() {
        assert_eq!(JPEG_QUALITY, (LOSSY_QUALITY * 100.0).round() as u8);
    }

    #[test]
    fn content_box_fits_page() {
        assert_eq!(PAGE_MARGIN_MM * 2.0 + CONTENT_WIDTH_MM, PAGE_WIDTH_MM);
    }

    #[test]
    fn a4_in_points() {
        assert!((mm_to_pt(PAGE_WIDTH_MM) - 595.28).abs() < 0.05);
        assert!((mm_to_pt(PAGE_HEIGHT_MM) - 841.89).abs() < 0.05);
    }
}
