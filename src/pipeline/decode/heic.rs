//! HEIC/HEIF decoding through libheif.
//!
//! Requires the `heic` cargo feature and a libheif installation on the host.
//! Without the feature HEIC files still classify as images, but
//! [`targets_for_file`](crate::compat::targets_for_file) offers them no
//! targets and a direct conversion fails with an external-library error.
//!
//! Only the primary image is decoded; bursts and image sequences keep their
//! other frames out of the output.

use crate::error::ConvertError;
use crate::intermediate::PixelBuffer;

/// Whether this build can decode HEIC/HEIF.
pub const SUPPORTED: bool = cfg!(feature = "heic");

#[cfg(feature = "heic")]
pub fn decode_heic(bytes: &[u8]) -> Result<PixelBuffer, ConvertError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};
    use tracing::{debug, warn};

    if bytes.is_empty() {
        return Err(ConvertError::decode("HEIC", "input is empty"));
    }

    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(bytes).map_err(|e| ConvertError::decode("HEIC", e))?;

    let top_level = ctx.number_of_top_level_images();
    if top_level > 1 {
        warn!("HEIC container holds {} images; using the primary one", top_level);
    }

    let handle = ctx
        .primary_image_handle()
        .map_err(|e| ConvertError::decode("HEIC", e))?;

    let image = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
        .map_err(|e| ConvertError::external("libheif", "decoding primary image", e))?;

    let width = image.width();
    let height = image.height();
    let planes = image.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| ConvertError::external("libheif", "reading pixels", "no interleaved plane"))?;

    let row_len = width as usize * 4;
    let mut rgba = Vec::with_capacity(row_len * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        let end = row_len.min(row.len());
        rgba.extend_from_slice(&row[..end]);
    }

    debug!("Decoded HEIC primary image → {}x{} px", width, height);

    PixelBuffer::from_rgba(width, height, rgba)
        .ok_or_else(|| ConvertError::decode("HEIC", "pixel plane shorter than image"))
}

#[cfg(not(feature = "heic"))]
pub fn decode_heic(_bytes: &[u8]) -> Result<PixelBuffer, ConvertError> {
    Err(ConvertError::external(
        "libheif",
        "decoding HEIC",
        "built without the `heic` feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[cfg(not(feature = "heic"))]
    #[test]
    fn missing_codec_is_external_error() {
        let err = decode_heic(b"\0\0\0\x18ftypheic").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalLibraryError);
    }

    #[cfg(feature = "heic")]
    #[test]
    fn garbage_is_decode_error() {
        let err = decode_heic(b"not a heif container").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }
}
