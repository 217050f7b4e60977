//! Raster re-encoding.
//!
//! Pixels are written at their decoded resolution. JPEG and BMP have no
//! alpha channel here, so translucent pixels are composited onto opaque
//! white first.

use crate::error::ConvertError;
use crate::format::TargetFormat;
use crate::intermediate::PixelBuffer;
use crate::policy::JPEG_QUALITY;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Composite RGBA pixels onto white, dropping alpha.
pub fn flatten_onto_white(pixels: &PixelBuffer) -> RgbImage {
    let src = pixels.as_image();
    RgbImage::from_fn(src.width(), src.height(), |x, y| {
        let [r, g, b, a] = src.get_pixel(x, y).0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

pub fn encode_raster(pixels: &PixelBuffer, target: TargetFormat) -> Result<Vec<u8>, ConvertError> {
    let mut out = Vec::new();
    let failed = |e: image::ImageError| {
        ConvertError::external("image", format!("encoding {}", target.label()), e)
    };

    match target {
        TargetFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(flatten_onto_white(pixels));
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))
                .map_err(failed)?;
        }
        TargetFormat::Bmp => {
            let rgb = DynamicImage::ImageRgb8(flatten_onto_white(pixels));
            rgb.write_with_encoder(BmpEncoder::new(&mut out))
                .map_err(failed)?;
        }
        TargetFormat::Png => {
            DynamicImage::ImageRgba8(pixels.as_image().clone())
                .write_with_encoder(PngEncoder::new(&mut out))
                .map_err(failed)?;
        }
        TargetFormat::WebP => {
            DynamicImage::ImageRgba8(pixels.as_image().clone())
                .write_with_encoder(WebPEncoder::new_lossless(&mut out))
                .map_err(failed)?;
        }
        TargetFormat::Gif => {
            DynamicImage::ImageRgba8(pixels.as_image().clone())
                .write_to(&mut Cursor::new(&mut out), ImageFormat::Gif)
                .map_err(failed)?;
        }
        other => {
            return Err(ConvertError::encode(
                other.label(),
                "not a raster image format",
            ))
        }
    }

    debug!(
        "Encoded {}x{} px as {} ({} bytes)",
        pixels.width(),
        pixels.height(),
        target.label(),
        out.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn half_transparent() -> PixelBuffer {
        let mut img = RgbaImage::from_pixel(6, 4, Rgba([255, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 128]));
        PixelBuffer::new(img)
    }

    #[test]
    fn flatten_blends_onto_white() {
        let flat = flatten_onto_white(&half_transparent());
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(flat.get_pixel(1, 0).0, [127, 127, 127]);
        assert_eq!(flat.get_pixel(2, 0).0, [255, 0, 0]);
    }

    #[test]
    fn every_raster_target_sniffs_as_itself() {
        let pixels = half_transparent();
        for (target, format) in [
            (TargetFormat::Jpeg, ImageFormat::Jpeg),
            (TargetFormat::Png, ImageFormat::Png),
            (TargetFormat::WebP, ImageFormat::WebP),
            (TargetFormat::Bmp, ImageFormat::Bmp),
            (TargetFormat::Gif, ImageFormat::Gif),
        ] {
            let bytes = encode_raster(&pixels, target).expect("encode");
            assert_eq!(image::guess_format(&bytes).expect("sniff"), format, "{target:?}");
            let back = image::load_from_memory(&bytes).expect("reload");
            assert_eq!(back.dimensions(), (6, 4), "{target:?}");
        }
    }

    #[test]
    fn jpeg_and_bmp_are_opaque() {
        for target in [TargetFormat::Jpeg, TargetFormat::Bmp] {
            let bytes = encode_raster(&half_transparent(), target).expect("encode");
            let back = image::load_from_memory(&bytes).expect("reload").to_rgba8();
            assert!(back.pixels().all(|p| p.0[3] == 255), "{target:?}");
        }
    }

    #[test]
    fn png_keeps_alpha() {
        let bytes = encode_raster(&half_transparent(), TargetFormat::Png).expect("encode");
        let back = image::load_from_memory(&bytes).expect("reload").to_rgba8();
        assert_eq!(back.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn non_raster_target_is_encode_error() {
        let err = encode_raster(&half_transparent(), TargetFormat::Csv).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::EncodeError);
    }
}
