//! Generic raster decoding through the `image` crate.
//!
//! The container format is sniffed from the leading bytes, so a file named
//! `photo.png` that is really a JPEG still decodes.

use super::image_decode_error;
use crate::error::ConvertError;
use crate::intermediate::PixelBuffer;
use image::ImageReader;
use std::io::Cursor;
use tracing::debug;

/// Decode a PNG, JPEG, WebP, BMP, GIF (first frame) or TIFF image.
pub fn decode_raster(bytes: &[u8]) -> Result<PixelBuffer, ConvertError> {
    if bytes.is_empty() {
        return Err(ConvertError::decode("image", "input is empty"));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ConvertError::decode("image", e))?;

    let format = reader
        .format()
        .ok_or_else(|| ConvertError::decode("image", "unrecognised image signature"))?;

    let image = reader
        .decode()
        .map_err(|e| image_decode_error(&format!("{format:?}"), e))?;

    debug!(
        "Decoded {:?} image → {}x{} px",
        format,
        image.width(),
        image.height()
    );

    Ok(PixelBuffer::new(image.to_rgba8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode png");
        buf
    }

    #[test]
    fn decodes_png_at_native_size() {
        let pixels = decode_raster(&png_bytes(7, 3)).expect("decode");
        assert_eq!((pixels.width(), pixels.height()), (7, 3));
        assert_eq!(pixels.as_image().get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn garbage_is_decode_error() {
        let err = decode_raster(b"definitely not an image").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }

    #[test]
    fn truncated_png_is_decode_error() {
        let mut bytes = png_bytes(16, 16);
        bytes.truncate(40);
        let err = decode_raster(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }

    #[test]
    fn empty_input_is_decode_error() {
        assert_eq!(decode_raster(&[]).unwrap_err().kind(), ErrorKind::DecodeError);
    }
}
