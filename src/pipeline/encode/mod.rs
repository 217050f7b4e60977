//! Encoders: [`Intermediate`] → target bytes.
//!
//! [`encode`] is the single dispatch point. A representation/target pair
//! with no encoder is an [`ConvertError::Encode`]; the router never produces
//! one for a pair the compatibility table allows.

pub mod delimited;
pub mod html;
pub mod layout;
pub mod markup;
pub mod pdf;
pub mod raster;

use crate::error::ConvertError;
use crate::format::TargetFormat;
use crate::intermediate::Intermediate;
use crate::policy::SHEET_VIRTUAL_WIDTH;

/// Per-call encoder settings chosen by the router.
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions<'a> {
    /// CSS pixel width that markup is laid out on before scaling into the
    /// PDF content box.
    pub virtual_width: f32,
    /// Document title for PDF metadata and HTML `<title>`.
    pub title: Option<&'a str>,
}

impl<'a> EncodeOptions<'a> {
    /// Options for targets that do no markup layout.
    pub fn titled(title: Option<&'a str>) -> Self {
        Self {
            title,
            ..Self::default()
        }
    }

    /// Lay markup out on `virtual_width` CSS pixels.
    pub fn with_virtual_width(self, virtual_width: f32) -> Self {
        Self {
            virtual_width,
            ..self
        }
    }
}

impl Default for EncodeOptions<'_> {
    fn default() -> Self {
        Self {
            virtual_width: SHEET_VIRTUAL_WIDTH,
            title: None,
        }
    }
}

pub fn encode(
    intermediate: &Intermediate,
    target: TargetFormat,
    options: &EncodeOptions<'_>,
) -> Result<Vec<u8>, ConvertError> {
    match (intermediate, target) {
        (Intermediate::Pixels(pixels), t) if t.is_raster() => raster::encode_raster(pixels, t),
        (Intermediate::Pixels(pixels), TargetFormat::Pdf) => pdf::encode_image_pdf(pixels),

        (Intermediate::PlainText(text), TargetFormat::Pdf) => {
            pdf::encode_text_pdf(text, options.title)
        }
        (Intermediate::PlainText(text), TargetFormat::PlainText) => Ok(text.as_bytes().to_vec()),

        (Intermediate::Markup(markup), TargetFormat::Pdf) => {
            pdf::encode_markup_pdf(markup, options.virtual_width, options.title)
        }
        (Intermediate::Markup(markup), TargetFormat::Html) => {
            Ok(html::wrap_document(markup, options.title).into_bytes())
        }

        (Intermediate::Sheet(sheet), TargetFormat::Csv) => delimited::encode_csv(sheet),
        (Intermediate::Sheet(sheet), TargetFormat::Html) => {
            Ok(html::sheet_to_html(sheet, options.title).into_bytes())
        }
        (Intermediate::Sheet(sheet), TargetFormat::Pdf) => {
            let table = html::sheet_to_html(sheet, options.title);
            pdf::encode_markup_pdf(&table, options.virtual_width, options.title)
        }

        (other, target) => Err(ConvertError::encode(
            target.label(),
            format!("no encoder from {}", other.variant_name()),
        )),
    }
}
