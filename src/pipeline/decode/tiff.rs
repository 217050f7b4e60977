//! TIFF decoding. Only the first image file directory (page) is read.

use super::image_decode_error;
use crate::error::ConvertError;
use crate::intermediate::PixelBuffer;
use image::codecs::tiff::TiffDecoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

pub fn decode_tiff(bytes: &[u8]) -> Result<PixelBuffer, ConvertError> {
    let decoder =
        TiffDecoder::new(Cursor::new(bytes)).map_err(|e| image_decode_error("TIFF", e))?;
    let image = DynamicImage::from_decoder(decoder).map_err(|e| image_decode_error("TIFF", e))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(ConvertError::decode("TIFF", "first page has zero size"));
    }

    debug!("Decoded TIFF page 1 → {}x{} px", image.width(), image.height());
    Ok(PixelBuffer::new(image.to_rgba8()))
}
