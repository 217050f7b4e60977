//! Decoders: source bytes → [`Intermediate`](crate::intermediate::Intermediate).
//!
//! | Module    | Sources                 | Produces    |
//! |-----------|-------------------------|-------------|
//! | [`raster`]| png, jpeg, webp, bmp, gif | `Pixels`  |
//! | [`tiff`]  | tif, tiff               | `Pixels`    |
//! | [`heic`]  | heic, heif              | `Pixels`    |
//! | [`docx`]  | docx                    | `Markup`    |
//! | [`sheet`] | xlsx, xls, ods, csv     | `Sheet`     |
//! | [`text`]  | txt, rtf, html          | `PlainText` / `Markup` |
//! | [`pdf`]   | pdf                     | `PlainText` |
//!
//! Decoders never resample or otherwise alter pixel dimensions.

pub mod docx;
pub mod heic;
pub mod pdf;
pub mod raster;
pub mod sheet;
pub mod text;
pub mod tiff;

use crate::error::ConvertError;
use image::ImageError;

/// Map an `image` crate error raised while decoding `format`.
///
/// Hitting the decoder's allocation limits is reported against the library;
/// everything else means the input is malformed.
pub(crate) fn image_decode_error(format: &str, err: ImageError) -> ConvertError {
    match err {
        ImageError::Limits(_) => {
            ConvertError::external("image", format!("decoding {format}"), err)
        }
        other => ConvertError::decode(format, other),
    }
}
