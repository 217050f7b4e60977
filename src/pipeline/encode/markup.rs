//! HTML → laid-out A4 pages.
//!
//! The markup is parsed with `scraper` (html5ever), flattened into a list of
//! [`Block`]s, then drawn onto a [`LayoutSurface`]. Sizes follow browser
//! defaults in CSS pixels on a fixed virtual page width, scaled so that width
//! fills the PDF content box.
//!
//! ## Supported structure
//!
//! - headings `h1`–`h6` (bold, default UA sizes)
//! - paragraphs and generic block containers
//! - `ul` / `ol` items with bullets or numbers, nested lists indented
//! - `pre` with whitespace preserved
//! - `table` rows with equal-width bordered cells; `th` in bold
//! - `strong` / `b` inline bold, `br` line breaks, `hr` rules
//!
//! Everything else contributes its text. `head`, `script` and `style`
//! contribute nothing. Layout is best-effort: the goal is readable pages,
//! not pixel fidelity with a browser.

use super::layout::{wrap_runs, LaidOutPages, LayoutSurface, Run};
use crate::policy::{LINE_HEIGHT_FACTOR, MARKUP_BASE_FONT_PX};
use scraper::{ElementRef, Html, Node};
use tracing::debug;

/// A block-level unit of laid-out markup.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, runs: Vec<Run> },
    Paragraph(Vec<Run>),
    ListItem {
        marker: String,
        depth: usize,
        runs: Vec<Run>,
    },
    Preformatted(String),
    Table(Vec<Vec<Cell>>),
    Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub header: bool,
}

// ── Parsing ──────────────────────────────────────────────────────────────

/// Flatten an HTML document or fragment into blocks.
pub fn parse_blocks(html: &str) -> Vec<Block> {
    let document = Html::parse_document(html);
    let mut collector = BlockCollector::default();
    collector.walk_children(document.root_element(), false);
    collector.flush();
    debug!("Markup parsed into {} blocks", collector.blocks.len());
    collector.blocks
}

struct ListState {
    ordered: bool,
    next: usize,
}

#[derive(Default)]
struct BlockCollector {
    blocks: Vec<Block>,
    inline: Vec<Run>,
    lists: Vec<ListState>,
    pending_item: Option<String>,
}

const SKIPPED: &[&str] = &[
    "head", "script", "style", "title", "meta", "link", "noscript", "template", "img", "svg",
];

const BLOCK_CONTAINERS: &[&str] = &[
    "html",
    "body",
    "p",
    "div",
    "section",
    "article",
    "main",
    "header",
    "footer",
    "nav",
    "aside",
    "blockquote",
    "figure",
    "figcaption",
    "address",
    "dl",
    "dt",
    "dd",
    "form",
    "fieldset",
    "center",
    "caption",
];

impl BlockCollector {
    fn push_inline(&mut self, text: &str, bold: bool) {
        match self.inline.last_mut() {
            Some(last) if last.bold == bold => last.text.push_str(text),
            _ => self.inline.push(Run {
                text: text.to_string(),
                bold,
            }),
        }
    }

    /// Turn buffered inline text into a paragraph or the pending list item.
    fn flush(&mut self) {
        let runs = tidy_runs(std::mem::take(&mut self.inline));
        let marker = self.pending_item.take();
        if runs.is_empty() {
            // Keep the marker for the item's first real text.
            self.pending_item = marker;
            return;
        }
        match marker {
            Some(marker) => self.blocks.push(Block::ListItem {
                marker,
                depth: self.lists.len().max(1),
                runs,
            }),
            None => self.blocks.push(Block::Paragraph(runs)),
        }
    }

    /// Walk the element's subtree in document order on an explicit stack;
    /// nesting depth never grows the call stack.
    fn walk_children(&mut self, el: ElementRef<'_>, bold: bool) {
        let mut stack = Vec::new();
        push_children(&mut stack, el, bold);
        while let Some(step) = stack.pop() {
            match step {
                Step::Text(text, bold) => {
                    let collapsed = collapse_whitespace(text);
                    if !collapsed.is_empty() {
                        self.push_inline(&collapsed, bold);
                    }
                }
                Step::Open(el, bold) => self.open(el, bold, &mut stack),
                Step::Close(close) => self.close(close),
            }
        }
    }

    fn open<'a>(&mut self, el: ElementRef<'a>, bold: bool, stack: &mut Vec<Step<'a>>) {
        let name = el.value().name();
        match name {
            _ if SKIPPED.contains(&name) => {}
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                self.pending_item = None;
                let level = name[1..].parse().unwrap_or(1);
                stack.push(Step::Close(Close::Heading(level)));
                push_children(stack, el, true);
            }
            "ul" | "ol" => {
                self.flush();
                self.lists.push(ListState {
                    ordered: name == "ol",
                    next: 1,
                });
                stack.push(Step::Close(Close::List));
                push_children(stack, el, bold);
            }
            "li" => {
                self.flush();
                let marker = match self.lists.last_mut() {
                    Some(list) if list.ordered => {
                        let n = list.next;
                        list.next += 1;
                        format!("{n}. ")
                    }
                    _ => "\u{2022} ".to_string(),
                };
                self.pending_item = Some(marker);
                stack.push(Step::Close(Close::Item));
                push_children(stack, el, bold);
            }
            "pre" => {
                self.flush();
                let text: String = el.text().collect();
                let text = text.strip_prefix('\n').unwrap_or(&text).trim_end().to_string();
                if !text.is_empty() {
                    self.blocks.push(Block::Preformatted(text));
                }
            }
            "table" => {
                self.flush();
                let mut rows = Vec::new();
                collect_rows(el, false, &mut rows);
                if !rows.is_empty() {
                    self.blocks.push(Block::Table(rows));
                }
            }
            "hr" => {
                self.flush();
                self.blocks.push(Block::Rule);
            }
            "br" => self.push_inline("\n", bold),
            "strong" | "b" => push_children(stack, el, true),
            _ if BLOCK_CONTAINERS.contains(&name) => {
                self.flush();
                stack.push(Step::Close(Close::Block));
                push_children(stack, el, bold);
            }
            _ => push_children(stack, el, bold),
        }
    }

    fn close(&mut self, close: Close) {
        match close {
            Close::Heading(level) => {
                let runs = tidy_runs(std::mem::take(&mut self.inline));
                if !runs.is_empty() {
                    self.blocks.push(Block::Heading { level, runs });
                }
            }
            Close::List => {
                self.flush();
                self.lists.pop();
            }
            Close::Item => {
                self.flush();
                self.pending_item = None;
            }
            Close::Block => self.flush(),
        }
    }
}

/// Pending work of the tree walk.
enum Step<'a> {
    Text(&'a str, bool),
    Open(ElementRef<'a>, bool),
    Close(Close),
}

/// What to do once an element's children are done.
#[derive(Clone, Copy)]
enum Close {
    Heading(u8),
    List,
    Item,
    Block,
}

/// Queue the children of `el` so they pop off `stack` in document order.
fn push_children<'a>(stack: &mut Vec<Step<'a>>, el: ElementRef<'a>, bold: bool) {
    let children: Vec<Step<'a>> = el
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(Step::Text(&**text, bold)),
            Node::Element(_) => ElementRef::wrap(child).map(|el| Step::Open(el, bold)),
            _ => None,
        })
        .collect();
    stack.extend(children.into_iter().rev());
}

fn collect_rows(el: ElementRef<'_>, in_head: bool, rows: &mut Vec<Vec<Cell>>) {
    for child in el.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "thead" => collect_rows(child, true, rows),
            "tbody" | "tfoot" => collect_rows(child, in_head, rows),
            "tr" => {
                let cells: Vec<Cell> = child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| matches!(c.value().name(), "td" | "th"))
                    .map(|c| Cell {
                        text: collapse_whitespace(&c.text().collect::<String>())
                            .trim()
                            .to_string(),
                        header: in_head || c.value().name() == "th",
                    })
                    .collect();
                if !cells.is_empty() {
                    rows.push(cells);
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Trim the edges of a paragraph and the spaces around hard breaks.
fn tidy_runs(runs: Vec<Run>) -> Vec<Run> {
    let mut runs: Vec<Run> = runs
        .into_iter()
        .map(|mut r| {
            while r.text.contains("\n ") || r.text.contains(" \n") {
                r.text = r.text.replace("\n ", "\n").replace(" \n", "\n");
            }
            r
        })
        .collect();

    if let Some(first) = runs.first_mut() {
        first.text = first.text.trim_start_matches(' ').to_string();
    }
    if let Some(last) = runs.last_mut() {
        last.text = last.text.trim_end().to_string();
    }
    runs.retain(|r| !r.text.is_empty());
    if runs.iter().all(|r| r.text.trim().is_empty()) {
        return Vec::new();
    }
    runs
}

// ── Layout ───────────────────────────────────────────────────────────────

/// Default UA heading sizes in CSS pixels, `h1` first.
const HEADING_PX: [f32; 6] = [32.0, 24.0, 18.72, 16.0, 13.28, 10.72];

/// List indentation per nesting level, CSS pixels.
const LIST_INDENT_PX: f32 = 40.0;

/// Table cell padding, CSS pixels.
const CELL_PADDING_PX: f32 = 4.0;

/// Lay `html` out on A4 pages with `virtual_width` CSS pixels across the
/// content box.
pub fn layout_markup(html: &str, virtual_width: f32) -> LaidOutPages {
    let blocks = parse_blocks(html);
    let mut surface = LayoutSurface::a4();
    let scale = surface.content_width() / virtual_width.max(1.0);
    let base = MARKUP_BASE_FONT_PX * scale;

    let mut previous_gap = 0.0f32;
    for (i, block) in blocks.iter().enumerate() {
        let (gap_before, gap_after) = block_margins(block, scale);
        if i > 0 {
            surface.advance(previous_gap.max(gap_before));
        }
        previous_gap = gap_after;

        match block {
            Block::Heading { level, runs } => {
                let px = HEADING_PX[(*level as usize).clamp(1, 6) - 1];
                surface.paragraph(runs, px * scale, 0.0);
            }
            Block::Paragraph(runs) => surface.paragraph(runs, base, 0.0),
            Block::ListItem {
                marker,
                depth,
                runs,
            } => {
                let mut line = vec![Run::plain(marker.clone())];
                line.extend(runs.iter().cloned());
                let indent = LIST_INDENT_PX * scale * (*depth as f32 - 0.5).max(0.0);
                surface.paragraph(&line, base, indent);
            }
            Block::Preformatted(text) => {
                surface.paragraph(&[Run::plain(text.clone())], base * 0.875, 0.0);
            }
            Block::Table(rows) => draw_table(&mut surface, rows, base, scale),
            Block::Rule => {
                surface.ensure_space(1.0);
                let (x, top, width) = (surface.margin(), surface.cursor(), surface.content_width());
                surface.rect(x, top, width, 0.0);
            }
        }
    }

    surface.finish()
}

/// Vertical margins (before, after) of a block, in points.
fn block_margins(block: &Block, scale: f32) -> (f32, f32) {
    let em = MARKUP_BASE_FONT_PX * scale;
    match block {
        Block::Heading { level, .. } => {
            let px = HEADING_PX[(*level as usize).clamp(1, 6) - 1];
            let m = px * scale * 0.67;
            (m, m)
        }
        Block::ListItem { .. } => (em * 0.25, em * 0.25),
        Block::Rule => (em * 0.5, em * 0.5),
        _ => (em, em),
    }
}

fn draw_table(surface: &mut LayoutSurface, rows: &[Vec<Cell>], size: f32, scale: f32) {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return;
    }
    let col_width = surface.content_width() / columns as f32;
    let pad = CELL_PADDING_PX * scale;
    let line_height = size * LINE_HEIGHT_FACTOR;
    let left = surface.margin();

    for row in rows {
        let wrapped: Vec<(Vec<String>, bool)> = row
            .iter()
            .map(|cell| {
                let run = Run {
                    text: cell.text.clone(),
                    bold: cell.header,
                };
                let lines = wrap_runs(&[run], (col_width - 2.0 * pad).max(size), size)
                    .into_iter()
                    .map(|segs| segs.into_iter().map(|s| s.text).collect())
                    .collect();
                (lines, cell.header)
            })
            .collect();

        let max_lines = wrapped.iter().map(|(l, _)| l.len()).max().unwrap_or(1).max(1);
        let row_height = max_lines as f32 * line_height + 2.0 * pad;

        // Rows taller than a page are split into per-page slices.
        surface.ensure_space(row_height);
        let mut first = 0;
        while first < max_lines {
            surface.ensure_space(line_height + 2.0 * pad);
            let fits = ((surface.remaining() - 2.0 * pad) / line_height).floor().max(1.0) as usize;
            let take = fits.min(max_lines - first);
            let slice_height = take as f32 * line_height + 2.0 * pad;
            let top = surface.cursor();
            for col in 0..columns {
                let x = left + col as f32 * col_width;
                surface.rect(x, top, col_width, slice_height);
                if let Some((lines, bold)) = wrapped.get(col) {
                    for (i, line) in lines.iter().skip(first).take(take).enumerate() {
                        let line_top = top + pad + i as f32 * line_height;
                        surface.text_at(x + pad, line_top, size, *bold, line);
                    }
                }
            }
            first += take;
            if first < max_lines {
                surface.new_page();
            } else {
                surface.advance(slice_height);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::layout::{live_surfaces, DrawItem};

    fn texts(laid: &LaidOutPages) -> Vec<String> {
        laid.pages
            .iter()
            .flatten()
            .filter_map(|item| match item {
                DrawItem::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn headings_paragraphs_and_bold() {
        let blocks = parse_blocks("<h2>Title</h2><p>Hello <strong>bold</strong> world</p>");
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 2,
                    runs: vec![Run::bold("Title")]
                },
                Block::Paragraph(vec![
                    Run::plain("Hello "),
                    Run::bold("bold"),
                    Run::plain(" world")
                ]),
            ]
        );
    }

    #[test]
    fn head_and_scripts_are_dropped() {
        let blocks = parse_blocks(
            "<html><head><title>T</title><style>p{}</style></head><body><script>x()</script><p>body</p></body></html>",
        );
        assert_eq!(blocks, vec![Block::Paragraph(vec![Run::plain("body")])]);
    }

    #[test]
    fn lists_get_markers_and_depth() {
        let blocks = parse_blocks("<ol><li>one</li><li>two<ul><li>inner</li></ul></li></ol>");
        assert_eq!(
            blocks,
            vec![
                Block::ListItem {
                    marker: "1. ".into(),
                    depth: 1,
                    runs: vec![Run::plain("one")]
                },
                Block::ListItem {
                    marker: "2. ".into(),
                    depth: 1,
                    runs: vec![Run::plain("two")]
                },
                Block::ListItem {
                    marker: "\u{2022} ".into(),
                    depth: 2,
                    runs: vec![Run::plain("inner")]
                },
            ]
        );
    }

    #[test]
    fn tables_collect_cells() {
        let blocks = parse_blocks(
            "<table><thead><tr><th>a</th><th>b</th></tr></thead><tbody><tr><td>1</td><td> 2 </td></tr></tbody></table>",
        );
        let Block::Table(rows) = &blocks[0] else {
            panic!("expected table, got {blocks:?}");
        };
        assert_eq!(rows.len(), 2);
        assert!(rows[0][0].header);
        assert_eq!(rows[1][1].text, "2");
        assert!(!rows[1][1].header);
    }

    #[test]
    fn line_breaks_become_hard_breaks() {
        let blocks = parse_blocks("<p>a<br>b</p>");
        assert_eq!(blocks, vec![Block::Paragraph(vec![Run::plain("a\nb")])]);
    }

    #[test]
    fn layout_draws_all_text() {
        let laid = layout_markup(
            "<h1>Report</h1><p>Body text</p><table><tr><td>x</td><td>y</td></tr></table>",
            800.0,
        );
        let all = texts(&laid);
        assert!(all.contains(&"Report".to_string()));
        assert!(all.iter().any(|t| t.contains("Body")));
        assert!(all.contains(&"x".to_string()));
        assert!(all.contains(&"y".to_string()));
        assert_eq!(live_surfaces(), 0);
    }

    #[test]
    fn narrower_virtual_width_means_larger_text() {
        let size_at = |width: f32| {
            layout_markup("<p>same</p>", width).pages[0]
                .iter()
                .find_map(|item| match item {
                    DrawItem::Text { size, .. } => Some(*size),
                    _ => None,
                })
                .unwrap_or(0.0)
        };
        assert!(size_at(650.0) > size_at(800.0));
    }

    #[test]
    fn long_tables_span_pages() {
        let rows: String = (0..200).map(|i| format!("<tr><td>{i}</td></tr>")).collect();
        let laid = layout_markup(&format!("<table>{rows}</table>"), 800.0);
        assert!(laid.pages.len() > 1);
    }

    #[test]
    fn deeply_nested_markup_lays_out_on_a_small_stack() {
        let depth = 20_000;
        let html = format!("{}x{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let laid = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || layout_markup(&html, 800.0))
            .expect("spawn")
            .join()
            .expect("layout thread");
        assert_eq!(texts(&laid), vec!["x".to_string()]);
    }

    #[test]
    fn nesting_keeps_document_order() {
        let blocks = parse_blocks("<div>a<section><p>b</p>c</section>d</div>");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph(vec![Run::plain("a")]),
                Block::Paragraph(vec![Run::plain("b")]),
                Block::Paragraph(vec![Run::plain("c")]),
                Block::Paragraph(vec![Run::plain("d")]),
            ]
        );
    }

    #[test]
    fn row_taller_than_a_page_is_split_across_pages() {
        let words: Vec<String> = (0..3000).map(|i| format!("w{i}")).collect();
        let html = format!("<table><tr><td>{}</td></tr></table>", words.join(" "));
        let laid = layout_markup(&html, 800.0);
        assert!(laid.pages.len() > 2);

        for item in laid.pages.iter().flatten() {
            match item {
                DrawItem::Text { baseline, .. } => {
                    assert!(*baseline > 0.0 && *baseline < laid.height, "baseline {baseline}");
                }
                DrawItem::Rect { top, height, .. } => {
                    assert!(*top >= 0.0 && top + height <= laid.height, "rect {top}+{height}");
                }
            }
        }

        let drawn: Vec<String> = texts(&laid)
            .iter()
            .flat_map(|line| line.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .collect();
        assert_eq!(drawn, words);
    }
}
