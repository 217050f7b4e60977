//! Pipeline stages for file conversion.
//!
//! Each source format has one decoder producing an
//! [`Intermediate`](crate::intermediate::Intermediate); each target has one
//! encoder consuming it. [`crate::convert`] picks the pair.
//!
//! ## Data Flow
//!
//! ```text
//! bytes ──▶ decode ──▶ Intermediate ──▶ encode ──▶ bytes
//!           raster      Pixels            raster (jpeg/png/webp/bmp/gif)
//!           tiff        Markup            pdf    (image page / text / markup)
//!           heic        PlainText         csv
//!           docx        Sheet             html
//!           sheet                         text
//!           text
//!           pdf
//! ```
//!
//! Every stage is a synchronous pure function over byte slices. The async
//! entry points in [`crate::convert`] move the whole pipeline onto
//! `spawn_blocking`, because image codecs, zip inflation and pdfium are all
//! CPU-bound.

pub mod decode;
pub mod encode;
pub mod winansi;

/// Escape text for inclusion in HTML element content or attribute values.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_html;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }
}
