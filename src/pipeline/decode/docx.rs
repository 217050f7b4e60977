//! DOCX → HTML fragment.
//!
//! A `.docx` file is a zip archive; the body lives in `word/document.xml`
//! as WordprocessingML. We stream that part through quick-xml and emit a
//! simple HTML fragment:
//!
//! | WordprocessingML                      | HTML                   |
//! |---------------------------------------|------------------------|
//! | `w:p` with `Heading1`..`Heading6`     | `<h1>`..`<h6>`         |
//! | `w:p` with `Title`                    | `<h1>`                 |
//! | `w:p` with `w:numPr`                  | `<li>` inside `<ul>`   |
//! | other `w:p`                           | `<p>`                  |
//! | `w:b` / `w:i` / `w:u` in a run        | `<strong>` / `<em>` / `<u>` |
//! | `w:br`, `w:cr`                        | `<br/>`                |
//! | `w:tbl` / `w:tr` / `w:tc`             | `<table>` / `<tr>` / `<td>` |
//!
//! Images, headers, footers, comments and tracked deletions are dropped.
//! Paragraphs with no visible text are skipped.

use crate::error::ConvertError;
use crate::pipeline::escape_html;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};
use tracing::debug;

const DOCUMENT_PART: &str = "word/document.xml";

/// Convert DOCX bytes to an HTML fragment.
///
/// `max_part_bytes` bounds the inflated size of the document part. The size
/// recorded in the zip header is not trusted.
pub fn decode_docx(bytes: &[u8], max_part_bytes: usize) -> Result<String, ConvertError> {
    let xml = read_document_part(bytes, max_part_bytes as u64)?;
    let html = document_xml_to_html(&xml)?;
    debug!(
        "DOCX body: {} bytes of XML → {} bytes of HTML",
        xml.len(),
        html.len()
    );
    Ok(html)
}

fn read_document_part(bytes: &[u8], limit: u64) -> Result<Vec<u8>, ConvertError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ConvertError::decode("DOCX", format!("not a zip container: {e}")))?;

    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|_| ConvertError::decode("DOCX", format!("missing {DOCUMENT_PART}")))?;

    let mut xml = Vec::with_capacity(part.size().min(limit) as usize);
    (&mut part)
        .take(limit.saturating_add(1))
        .read_to_end(&mut xml)
        .map_err(|e| ConvertError::decode("DOCX", format!("reading {DOCUMENT_PART}: {e}")))?;
    if xml.len() as u64 > limit {
        return Err(ConvertError::decode(
            "DOCX",
            format!("{DOCUMENT_PART} inflates beyond {limit} bytes"),
        ));
    }
    Ok(xml)
}

// ── Conversion state ─────────────────────────────────────────────────────

#[derive(Default)]
struct RunFormat {
    bold: bool,
    italic: bool,
    underline: bool,
}

struct Paragraph {
    tag: &'static str,
    list_item: bool,
    content: String,
}

impl Paragraph {
    fn new() -> Self {
        Self {
            tag: "p",
            list_item: false,
            content: String::new(),
        }
    }
}

#[derive(Default)]
struct HtmlBuilder {
    out: String,
    paragraph: Option<Paragraph>,
    run: Option<RunFormat>,
    in_run_props: bool,
    in_text: bool,
    list_open: bool,
}

impl HtmlBuilder {
    fn close_list(&mut self) {
        if self.list_open {
            self.out.push_str("</ul>\n");
            self.list_open = false;
        }
    }

    fn finish_paragraph(&mut self) {
        let Some(p) = self.paragraph.take() else {
            return;
        };
        if p.content.trim().is_empty() {
            return;
        }
        if p.list_item {
            if !self.list_open {
                self.out.push_str("<ul>\n");
                self.list_open = true;
            }
            self.out.push_str(&format!("<li>{}</li>\n", p.content));
        } else {
            self.close_list();
            self.out
                .push_str(&format!("<{tag}>{}</{tag}>\n", p.content, tag = p.tag));
        }
    }

    fn push_text(&mut self, text: &str) {
        let Some(p) = self.paragraph.as_mut() else {
            return;
        };
        let fmt = self.run.as_ref();
        let escaped = escape_html(text);
        let mut piece = escaped;
        if let Some(fmt) = fmt {
            if fmt.underline {
                piece = format!("<u>{piece}</u>");
            }
            if fmt.italic {
                piece = format!("<em>{piece}</em>");
            }
            if fmt.bold {
                piece = format!("<strong>{piece}</strong>");
            }
        }
        p.content.push_str(&piece);
    }

    fn push_raw(&mut self, html: &str) {
        if let Some(p) = self.paragraph.as_mut() {
            p.content.push_str(html);
        }
    }

    /// Handle an opening (or self-closing) element.
    fn open(&mut self, e: &BytesStart<'_>) -> Result<(), ConvertError> {
        match e.local_name().as_ref() {
            b"p" => {
                self.finish_paragraph();
                self.paragraph = Some(Paragraph::new());
            }
            b"pStyle" => {
                if let (Some(p), Some(style)) = (self.paragraph.as_mut(), attr_val(e)?) {
                    if let Some(tag) = heading_tag(&style) {
                        p.tag = tag;
                    }
                }
            }
            b"numPr" => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.list_item = true;
                }
            }
            b"r" => self.run = Some(RunFormat::default()),
            b"rPr" if self.run.is_some() => self.in_run_props = true,
            b"b" | b"i" | b"u" if self.in_run_props => {
                let on = toggle_on(e)?;
                if let Some(run) = self.run.as_mut() {
                    match e.local_name().as_ref() {
                        b"b" => run.bold = on,
                        b"i" => run.italic = on,
                        _ => run.underline = on,
                    }
                }
            }
            b"t" if self.run.is_some() => self.in_text = true,
            b"br" | b"cr" if self.run.is_some() => self.push_raw("<br/>"),
            b"tab" if self.run.is_some() => self.push_text(" "),
            b"tbl" => {
                self.finish_paragraph();
                self.close_list();
                self.out.push_str("<table>\n");
            }
            b"tr" => self.out.push_str("<tr>"),
            b"tc" => {
                self.finish_paragraph();
                self.out.push_str("<td>");
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, local_name: &[u8]) {
        match local_name {
            b"p" => self.finish_paragraph(),
            b"r" => self.run = None,
            b"rPr" => self.in_run_props = false,
            b"t" => self.in_text = false,
            b"tc" => {
                self.finish_paragraph();
                self.close_list();
                self.out.push_str("</td>");
            }
            b"tr" => self.out.push_str("</tr>\n"),
            b"tbl" => self.out.push_str("</table>\n"),
            _ => {}
        }
    }

    fn finish(mut self) -> String {
        self.finish_paragraph();
        self.close_list();
        self.out
    }
}

/// `w:val` of an element, if present.
fn attr_val(e: &BytesStart<'_>) -> Result<Option<String>, ConvertError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ConvertError::decode("DOCX", err))?;
        if attr.key.local_name().as_ref() == b"val" {
            let raw = std::str::from_utf8(&attr.value)
                .map_err(|err| ConvertError::decode("DOCX", err))?;
            let value = unescape(raw).map_err(|err| ConvertError::decode("DOCX", err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// `<w:b/>` means on; `<w:b w:val="0"/>` (or `false`/`off`) means off.
fn toggle_on(e: &BytesStart<'_>) -> Result<bool, ConvertError> {
    Ok(match attr_val(e)? {
        None => true,
        Some(v) => !matches!(v.as_str(), "0" | "false" | "off" | "none"),
    })
}

fn heading_tag(style: &str) -> Option<&'static str> {
    let normalised: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match normalised.as_str() {
        "title" | "heading1" => Some("h1"),
        "heading2" => Some("h2"),
        "heading3" => Some("h3"),
        "heading4" => Some("h4"),
        "heading5" => Some("h5"),
        "heading6" => Some("h6"),
        _ => None,
    }
}

fn document_xml_to_html(xml: &[u8]) -> Result<String, ConvertError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);

    let mut builder = HtmlBuilder::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => builder.open(&e)?,
            Ok(Event::Empty(e)) => {
                builder.open(&e)?;
                let name = e.local_name();
                builder.close(name.as_ref());
            }
            Ok(Event::End(e)) => builder.close(e.local_name().as_ref()),
            Ok(Event::Text(t)) if builder.in_text => {
                let text = t.unescape().map_err(|e| ConvertError::decode("DOCX", e))?;
                builder.push_text(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ConvertError::decode(
                    "DOCX",
                    format!("malformed XML at byte {}: {e}", reader.buffer_position()),
                ))
            }
        }
        buf.clear();
    }

    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const LIMIT: usize = 1024 * 1024;

    fn wrap_body(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        )
    }

    fn docx_with(xml: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file(DOCUMENT_PART, SimpleFileOptions::default())
                .expect("start file");
            zip.write_all(xml.as_bytes()).expect("write");
            zip.finish().expect("finish");
        }
        buf
    }

    fn to_html(body: &str) -> String {
        document_xml_to_html(wrap_body(body).as_bytes()).expect("convert")
    }

    fn to_html_err(body: &str) -> ConvertError {
        document_xml_to_html(wrap_body(body).as_bytes()).unwrap_err()
    }

    #[test]
    fn plain_paragraph() {
        let html = to_html(r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#);
        assert_eq!(html, "<p>Hello</p>\n");
    }

    #[test]
    fn heading_and_title_styles() {
        let html = to_html(
            r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Report</w:t></w:r></w:p>
               <w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Scope</w:t></w:r></w:p>"#,
        );
        assert!(html.contains("<h1>Report</h1>"));
        assert!(html.contains("<h2>Scope</h2>"));
    }

    #[test]
    fn run_formatting() {
        let html = to_html(
            r#"<w:p>
                 <w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r>
                 <w:r><w:rPr><w:i/><w:b w:val="0"/></w:rPr><w:t xml:space="preserve"> italic</w:t></w:r>
               </w:p>"#,
        );
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em> italic</em>"));
        assert!(!html.contains("<strong> italic"));
    }

    #[test]
    fn numbered_paragraphs_become_a_list() {
        let html = to_html(
            r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>one</w:t></w:r></w:p>
               <w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>two</w:t></w:r></w:p>
               <w:p><w:r><w:t>after</w:t></w:r></w:p>"#,
        );
        assert_eq!(html, "<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n<p>after</p>\n");
    }

    #[test]
    fn tables_map_to_html_tables() {
        let html = to_html(
            r#"<w:tbl><w:tr>
                 <w:tc><w:p><w:r><w:t>a</w:t></w:r></w:p></w:tc>
                 <w:tc><w:p><w:r><w:t>b</w:t></w:r></w:p></w:tc>
               </w:tr></w:tbl>"#,
        );
        assert!(html.contains("<table>"));
        assert!(html.contains("<td><p>a</p>\n</td><td><p>b</p>\n</td>"));
        assert!(html.contains("</tr>\n</table>"));
    }

    #[test]
    fn text_is_escaped_and_empty_paragraphs_skipped() {
        let html = to_html(r#"<w:p/><w:p><w:r><w:t>a &lt; b &amp; c</w:t></w:r></w:p>"#);
        assert_eq!(html, "<p>a &lt; b &amp; c</p>\n");
    }

    #[test]
    fn breaks_and_tabs() {
        let html = to_html(r#"<w:p><w:r><w:t>x</w:t><w:br/><w:t>y</w:t><w:tab/><w:t>z</w:t></w:r></w:p>"#);
        assert_eq!(html, "<p>x<br/>y z</p>\n");
    }

    #[test]
    fn reads_document_part_from_zip() {
        let bytes = docx_with(&wrap_body(r#"<w:p><w:r><w:t>zipped</w:t></w:r></w:p>"#));
        assert_eq!(decode_docx(&bytes, LIMIT).expect("decode"), "<p>zipped</p>\n");
    }

    #[test]
    fn not_a_zip_is_decode_error() {
        let err = decode_docx(b"PK but not really", LIMIT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }

    #[test]
    fn zip_without_document_part_is_decode_error() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("other.xml", SimpleFileOptions::default())
                .expect("start");
            zip.write_all(b"<x/>").expect("write");
            zip.finish().expect("finish");
        }
        let err = decode_docx(&buf, LIMIT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn escaped_attribute_values_are_unescaped() {
        let style = attr_val(&BytesStart::from_content(r#"w:pStyle w:val="Heading&#50;""#, 8))
            .expect("attr");
        assert_eq!(style.as_deref(), Some("Heading2"));

        let html = to_html(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading&#50;"/></w:pPr><w:r><w:t>Q&amp;A</w:t></w:r></w:p>"#,
        );
        assert_eq!(html, "<h2>Q&amp;A</h2>\n");
    }

    #[test]
    fn broken_entity_in_attribute_is_decode_error() {
        let err = to_html_err(r#"<w:p><w:pPr><w:pStyle w:val="a&bogus;"/></w:pPr></w:p>"#);
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }

    #[test]
    fn document_part_over_the_limit_is_decode_error() {
        let body = format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", "a".repeat(4096));
        let bytes = docx_with(&wrap_body(&body));

        let err = decode_docx(&bytes, 1024).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
        assert!(err.to_string().contains("inflates beyond 1024 bytes"));

        assert!(decode_docx(&bytes, LIMIT).is_ok());
    }
}
