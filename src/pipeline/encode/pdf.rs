//! PDF writing with lopdf.
//!
//! Three page builders share one [`PdfWriter`]:
//!
//! | Input             | Page size                       | Builder                 |
//! |-------------------|---------------------------------|-------------------------|
//! | `Pixels`          | image pixel size, 1 px = 1 pt   | [`encode_image_pdf`]    |
//! | `PlainText`       | A4, wrapped Helvetica lines     | [`encode_text_pdf`]     |
//! | `Markup`          | A4, markup layout               | [`encode_markup_pdf`]   |
//!
//! Text uses the standard Helvetica and Helvetica-Bold fonts with
//! WinAnsiEncoding, so no font data is embedded. Characters outside the code
//! page are written as `?`.

use super::layout::{DrawItem, LaidOutPages, LayoutSurface, Run};
use super::markup::layout_markup;
use crate::error::ConvertError;
use crate::intermediate::PixelBuffer;
use crate::pipeline::winansi;
use crate::policy::TEXT_FONT_SIZE_PT;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";
const IMAGE_NAME: &str = "Im0";

fn real(v: f32) -> Object {
    Object::Real(v)
}

fn encode_err(e: impl ToString) -> ConvertError {
    ConvertError::external("lopdf", "writing PDF", e)
}

/// Builds a PDF document page by page.
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    font_resources: Dictionary,
    kids: Vec<Object>,
}

impl PdfWriter {
    pub fn new(title: Option<&str>) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let font_resources = dictionary! {
            REGULAR_FONT => regular,
            BOLD_FONT => bold,
        };

        if let Some(title) = title {
            let info = doc.add_object(dictionary! {
                "Title" => Object::String(winansi::encode_lossy(title), StringFormat::Literal),
                "Producer" => Object::string_literal(concat!("edgequake-convert ", env!("CARGO_PKG_VERSION"))),
            });
            doc.trailer.set("Info", info);
        }

        Self {
            doc,
            pages_id,
            font_resources,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append a page of `width` × `height` points.
    pub fn add_page(
        &mut self,
        width: f32,
        height: f32,
        operations: Vec<Operation>,
        resources: Dictionary,
    ) -> Result<(), ConvertError> {
        let content = Content { operations };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode().map_err(encode_err)?));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(width), real(height)],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    /// Append a page that draws laid-out text and rectangles.
    pub fn add_drawn_page(
        &mut self,
        width: f32,
        height: f32,
        items: &[DrawItem],
    ) -> Result<(), ConvertError> {
        let mut ops = vec![Operation::new("w", vec![real(0.5)])];
        for item in items {
            match item {
                DrawItem::Text {
                    x,
                    baseline,
                    size,
                    bold,
                    text,
                } => {
                    let font = if *bold { BOLD_FONT } else { REGULAR_FONT };
                    ops.push(Operation::new("BT", vec![]));
                    ops.push(Operation::new("Tf", vec![font.into(), real(*size)]));
                    ops.push(Operation::new("Td", vec![real(*x), real(height - baseline)]));
                    ops.push(Operation::new(
                        "Tj",
                        vec![Object::String(
                            winansi::encode_lossy(text),
                            StringFormat::Literal,
                        )],
                    ));
                    ops.push(Operation::new("ET", vec![]));
                }
                DrawItem::Rect {
                    x,
                    top,
                    width: w,
                    height: h,
                } => {
                    ops.push(Operation::new(
                        "re",
                        vec![real(*x), real(height - top - h), real(*w), real(*h)],
                    ));
                    ops.push(Operation::new("S", vec![]));
                }
            }
        }
        let resources = dictionary! { "Font" => self.font_resources.clone() };
        self.add_page(width, height, ops, resources)
    }

    /// Append a page sized to the image, with the image filling it.
    pub fn add_image_page(&mut self, pixels: &PixelBuffer) -> Result<(), ConvertError> {
        let (w, h) = (pixels.width(), pixels.height());
        let image = pixels.as_image();

        let mut rgb = Vec::with_capacity(w as usize * h as usize * 3);
        let mut alpha = Vec::with_capacity(w as usize * h as usize);
        for p in image.pixels() {
            rgb.extend_from_slice(&p.0[..3]);
            alpha.push(p.0[3]);
        }

        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => w as i64,
            "Height" => h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
        };
        if pixels.has_transparency() {
            let mask_id = self.doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => w as i64,
                    "Height" => h as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8_i64,
                },
                alpha,
            ));
            image_dict.set("SMask", mask_id);
        }
        let image_id = self.doc.add_object(Stream::new(image_dict, rgb));

        let (wf, hf) = (w as f32, h as f32);
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![real(wf), real(0.0), real(0.0), real(hf), real(0.0), real(0.0)],
            ),
            Operation::new("Do", vec![IMAGE_NAME.into()]),
            Operation::new("Q", vec![]),
        ];
        let resources = dictionary! {
            "XObject" => dictionary! { IMAGE_NAME => image_id },
        };
        self.add_page(wf, hf, ops, resources)
    }

    /// Append every page of a finished layout.
    pub fn add_layout(&mut self, laid: &LaidOutPages) -> Result<(), ConvertError> {
        for page in &laid.pages {
            self.add_drawn_page(laid.width, laid.height, page)?;
        }
        Ok(())
    }

    /// Close the page tree and serialise the document.
    pub fn finish(mut self) -> Result<Vec<u8>, ConvertError> {
        if self.kids.is_empty() {
            return Err(ConvertError::encode("PDF", "document has no pages"));
        }
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut out = Vec::new();
        self.doc.save_to(&mut out).map_err(encode_err)?;
        debug!("PDF written: {} pages, {} bytes", count, out.len());
        Ok(out)
    }
}

// ── Page builders ────────────────────────────────────────────────────────

/// One page exactly the size of the image.
pub fn encode_image_pdf(pixels: &PixelBuffer) -> Result<Vec<u8>, ConvertError> {
    let mut writer = PdfWriter::new(None);
    writer.add_image_page(pixels)?;
    writer.finish()
}

/// Plain text wrapped at the content width on A4 pages.
pub fn encode_text_pdf(text: &str, title: Option<&str>) -> Result<Vec<u8>, ConvertError> {
    let mut surface = LayoutSurface::a4();
    surface.paragraph(&[Run::plain(text)], TEXT_FONT_SIZE_PT, 0.0);
    debug!("Text PDF: {} pages", surface.page_count());
    let laid = surface.finish();

    let mut writer = PdfWriter::new(title);
    writer.add_layout(&laid)?;
    writer.finish()
}

/// HTML laid out at `virtual_width` CSS pixels across the content box.
pub fn encode_markup_pdf(
    html: &str,
    virtual_width: f32,
    title: Option<&str>,
) -> Result<Vec<u8>, ConvertError> {
    let laid = layout_markup(html, virtual_width);
    let mut writer = PdfWriter::new(title);
    writer.add_layout(&laid)?;
    writer.finish()
}
