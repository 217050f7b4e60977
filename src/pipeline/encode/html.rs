//! HTML output: document shells and sheet tables.

use crate::intermediate::Sheet;
use crate::pipeline::escape_html;

const TABLE_STYLE: &str =
    "table{border-collapse:collapse}td{border:1px solid #999;padding:2px 6px;vertical-align:top}";

/// `true` when `markup` already carries its own document element.
fn is_full_document(markup: &str) -> bool {
    let head: String = markup
        .trim_start()
        .chars()
        .take(9)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

/// Wrap an HTML fragment in a minimal UTF-8 document. Full documents pass
/// through unchanged.
pub fn wrap_document(fragment: &str, title: Option<&str>) -> String {
    if is_full_document(fragment) {
        return fragment.to_string();
    }
    document(fragment, title, None)
}

/// Render rows as an HTML table document. Short rows are padded.
pub fn sheet_to_html(sheet: &Sheet, title: Option<&str>) -> String {
    let width = sheet.column_count();
    let mut table = String::from("<table>\n");
    for row in &sheet.rows {
        table.push_str("<tr>");
        for i in 0..width {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            table.push_str("<td>");
            table.push_str(&escape_html(cell));
            table.push_str("</td>");
        }
        table.push_str("</tr>\n");
    }
    table.push_str("</table>\n");
    document(&table, title, Some(TABLE_STYLE))
}

fn document(body: &str, title: Option<&str>, style: Option<&str>) -> String {
    let mut out = String::with_capacity(body.len() + 200);
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    if let Some(title) = title {
        out.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    }
    if let Some(style) = style {
        out.push_str(&format!("<style>{style}</style>\n"));
    }
    out.push_str("</head>\n<body>\n");
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_gets_a_shell() {
        let doc = wrap_document("<p>x</p>", Some("a & b"));
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<meta charset=\"utf-8\">"));
        assert!(doc.contains("<title>a &amp; b</title>"));
        assert!(doc.contains("<body>\n<p>x</p>\n</body>"));
    }

    #[test]
    fn full_document_passes_through() {
        let html = "<!doctype html><html><body>x</body></html>";
        assert_eq!(wrap_document(html, None), html);
    }

    #[test]
    fn sheet_becomes_escaped_padded_table() {
        let sheet = Sheet::new(vec![
            vec!["a".into(), "<b>".into()],
            vec!["1".into()],
        ]);
        let html = sheet_to_html(&sheet, None);
        assert!(html.contains("<tr><td>a</td><td>&lt;b&gt;</td></tr>"));
        assert!(html.contains("<tr><td>1</td><td></td></tr>"));
    }
}
