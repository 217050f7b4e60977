//! Page layout surface for text and markup PDFs.
//!
//! A [`LayoutSurface`] is an A4 page stack with a vertical cursor. Callers
//! push wrapped text and rectangles; the surface breaks pages when the
//! cursor would cross the bottom margin. [`LayoutSurface::finish`] hands the
//! laid-out pages to the PDF writer.
//!
//! Coordinates are PDF points measured from the top-left of the page; the
//! writer flips them.
//!
//! Each live surface is counted per thread. The count drops when the surface
//! is dropped, whether the encode finished or bailed out with `?`.

use crate::policy::{
    mm_to_pt, CONTENT_WIDTH_MM, LINE_HEIGHT_FACTOR, PAGE_HEIGHT_MM, PAGE_MARGIN_MM, PAGE_WIDTH_MM,
};
use crate::pipeline::winansi;
use std::cell::Cell;

thread_local! {
    static LIVE_SURFACES: Cell<usize> = const { Cell::new(0) };
}

/// Number of layout surfaces currently alive on this thread.
pub fn live_surfaces() -> usize {
    LIVE_SURFACES.with(Cell::get)
}

/// One thing to paint on a page.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawItem {
    /// A single line of text; `baseline` is measured from the page top.
    Text {
        x: f32,
        baseline: f32,
        size: f32,
        bold: bool,
        text: String,
    },
    /// A stroked rectangle; `top` is measured from the page top.
    Rect { x: f32, top: f32, width: f32, height: f32 },
}

/// A piece of inline text with uniform weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

/// Laid-out pages, ready for the PDF writer.
#[derive(Debug, Clone)]
pub struct LaidOutPages {
    pub width: f32,
    pub height: f32,
    pub pages: Vec<Vec<DrawItem>>,
}

pub struct LayoutSurface {
    page_width: f32,
    page_height: f32,
    margin: f32,
    content_width: f32,
    pages: Vec<Vec<DrawItem>>,
    cursor: f32,
}

impl LayoutSurface {
    /// A4 portrait with the fixed margin and content width.
    pub fn a4() -> Self {
        LIVE_SURFACES.with(|c| c.set(c.get() + 1));
        let margin = mm_to_pt(PAGE_MARGIN_MM);
        Self {
            page_width: mm_to_pt(PAGE_WIDTH_MM),
            page_height: mm_to_pt(PAGE_HEIGHT_MM),
            margin,
            content_width: mm_to_pt(CONTENT_WIDTH_MM),
            pages: vec![Vec::new()],
            cursor: margin,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.content_width
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn bottom(&self) -> f32 {
        self.page_height - self.margin
    }

    fn current_page(&mut self) -> &mut Vec<DrawItem> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor = self.margin;
    }

    /// Break the page unless `height` more points fit above the bottom margin.
    ///
    /// Nothing happens at the top of a page, so oversize blocks still make
    /// progress.
    pub fn ensure_space(&mut self, height: f32) {
        let at_top = (self.cursor - self.margin).abs() < f32::EPSILON;
        if !at_top && self.cursor + height > self.bottom() {
            self.new_page();
        }
    }

    /// Points left between the cursor and the bottom margin.
    pub fn remaining(&self) -> f32 {
        (self.bottom() - self.cursor).max(0.0)
    }

    /// Move the cursor down without drawing.
    pub fn advance(&mut self, dy: f32) {
        self.cursor += dy;
        if self.cursor > self.bottom() {
            self.new_page();
        }
    }

    /// Wrap `runs` into the content box at `indent` and draw them.
    pub fn paragraph(&mut self, runs: &[Run], size: f32, indent: f32) {
        let width = (self.content_width - indent).max(size);
        let line_height = size * LINE_HEIGHT_FACTOR;
        for line in wrap_runs(runs, width, size) {
            self.ensure_space(line_height);
            let baseline = self.cursor + size * ASCENT;
            let mut x = self.margin + indent;
            for seg in line {
                let w = text_width(&seg.text, size, seg.bold);
                if !seg.text.trim().is_empty() {
                    self.current_page().push(DrawItem::Text {
                        x,
                        baseline,
                        size,
                        bold: seg.bold,
                        text: seg.text,
                    });
                }
                x += w;
            }
            self.cursor += line_height;
        }
    }

    /// Draw one line at an absolute position in the current page without
    /// moving the cursor.
    pub fn text_at(&mut self, x: f32, top: f32, size: f32, bold: bool, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.current_page().push(DrawItem::Text {
            x,
            baseline: top + size * ASCENT,
            size,
            bold,
            text: text.to_string(),
        });
    }

    pub fn rect(&mut self, x: f32, top: f32, width: f32, height: f32) {
        self.current_page().push(DrawItem::Rect {
            x,
            top,
            width,
            height,
        });
    }

    /// Current cursor position, measured from the page top.
    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    pub fn finish(mut self) -> LaidOutPages {
        let mut pages = std::mem::take(&mut self.pages);
        if pages.is_empty() {
            pages.push(Vec::new());
        }
        LaidOutPages {
            width: self.page_width,
            height: self.page_height,
            pages,
        }
    }
}

impl Drop for LayoutSurface {
    fn drop(&mut self) {
        LIVE_SURFACES.with(|c| c.set(c.get().saturating_sub(1)));
    }
}

// ── Font metrics ──────────────────────────────────────────────────────────

/// Distance from the top of a line box to the baseline, as a fraction of the font size.
const ASCENT: f32 = 0.8;

/// Helvetica advance widths for 0x20..=0x7E, in 1/1000 em.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

/// Helvetica-Bold advance widths for 0x20..=0x7E, in 1/1000 em.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, //
];

fn glyph_width(byte: u8, bold: bool) -> u16 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    match byte {
        0x20..=0x7E => table[(byte - 0x20) as usize],
        0xA0 => 278,
        0x95 => 350,
        _ => 556,
    }
}

/// Rendered width of `text` in points, as encoded for the PDF.
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = winansi::encode_lossy(text)
        .into_iter()
        .map(|b| glyph_width(b, bold) as u32)
        .sum();
    units as f32 * size / 1000.0
}

// ── Wrapping ──────────────────────────────────────────────────────────────

enum Token<'a> {
    Word(&'a str, bool),
    /// Whitespace at the start of a hard line; kept only at a line start.
    Indent(String, bool),
    Space(bool),
    Break,
}

fn tokenize(runs: &[Run]) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for (run_idx, run) in runs.iter().enumerate() {
        for (line_idx, hard_line) in run.text.split('\n').enumerate() {
            if line_idx > 0 {
                tokens.push(Token::Break);
            }
            let body = hard_line.trim_start();
            let lead = &hard_line[..hard_line.len() - body.len()];
            if !lead.is_empty() {
                if line_idx > 0 || run_idx == 0 {
                    tokens.push(Token::Indent(lead.replace('\t', "    "), run.bold));
                } else {
                    tokens.push(Token::Space(run.bold));
                }
            }
            let mut words = body.split_whitespace().peekable();
            while let Some(word) = words.next() {
                tokens.push(Token::Word(word, run.bold));
                if words.peek().is_some() {
                    tokens.push(Token::Space(run.bold));
                }
            }
            if body.len() > body.trim_end().len() && !body.trim().is_empty() {
                tokens.push(Token::Space(run.bold));
            }
        }
    }
    tokens
}

fn push_piece(line: &mut Vec<Run>, text: &str, bold: bool) {
    match line.last_mut() {
        Some(last) if last.bold == bold => last.text.push_str(text),
        _ => line.push(Run {
            text: text.to_string(),
            bold,
        }),
    }
}

/// Greedy word wrap of styled runs. Each output line is a list of segments.
///
/// `\n` forces a break, a word wider than the line is split between
/// characters, and leading indentation of a hard line is kept.
pub fn wrap_runs(runs: &[Run], max_width: f32, size: f32) -> Vec<Vec<Run>> {
    let mut lines: Vec<Vec<Run>> = Vec::new();
    let mut line: Vec<Run> = Vec::new();
    let mut line_width = 0.0f32;
    let mut pending_space: Option<bool> = None;

    for token in tokenize(runs) {
        match token {
            Token::Break => {
                lines.push(std::mem::take(&mut line));
                line_width = 0.0;
                pending_space = None;
            }
            Token::Space(bold) | Token::Indent(_, bold) if !line.is_empty() => {
                pending_space = Some(bold);
            }
            Token::Space(_) => {}
            Token::Indent(indent, bold) => {
                line_width = text_width(&indent, size, bold);
                push_piece(&mut line, &indent, bold);
            }
            Token::Word(word, bold) => {
                let space_w = pending_space.map_or(0.0, |b| text_width(" ", size, b));
                let word_w = text_width(word, size, bold);

                if !line.is_empty() && line_width + space_w + word_w <= max_width {
                    if let Some(b) = pending_space {
                        push_piece(&mut line, " ", b);
                    }
                    push_piece(&mut line, word, bold);
                    line_width += space_w + word_w;
                } else {
                    if !line.is_empty() {
                        lines.push(std::mem::take(&mut line));
                    }
                    line_width = place_word(&mut lines, &mut line, word, bold, max_width, size);
                }
                pending_space = None;
            }
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/// Put `word` on an empty line, splitting it between characters when it is
/// wider than `max_width`. Returns the width of the final line.
fn place_word(
    lines: &mut Vec<Vec<Run>>,
    line: &mut Vec<Run>,
    word: &str,
    bold: bool,
    max_width: f32,
    size: f32,
) -> f32 {
    let word_w = text_width(word, size, bold);
    if word_w <= max_width {
        push_piece(line, word, bold);
        return word_w;
    }

    let mut chunk = String::new();
    let mut chunk_w = 0.0;
    for ch in word.chars() {
        let cw = text_width(ch.encode_utf8(&mut [0; 4]), size, bold);
        if chunk_w + cw > max_width && !chunk.is_empty() {
            push_piece(line, &chunk, bold);
            lines.push(std::mem::take(line));
            chunk.clear();
            chunk_w = 0.0;
        }
        chunk.push(ch);
        chunk_w += cw;
    }
    push_piece(line, &chunk, bold);
    chunk_w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::TEXT_FONT_SIZE_PT;

    fn wrap_text(text: &str, max_width: f32, size: f32) -> Vec<String> {
        wrap_runs(&[Run::plain(text)], max_width, size)
            .into_iter()
            .map(|line| line.into_iter().map(|seg| seg.text).collect())
            .collect()
    }

    #[test]
    fn helvetica_widths() {
        // "Hello": H 722 + e 556 + l 222 + l 222 + o 556 = 2278
        assert!((text_width("Hello", 10.0, false) - 22.78).abs() < 1e-3);
        assert!(text_width("Hello", 10.0, true) > text_width("Hello", 10.0, false));
    }

    #[test]
    fn short_text_is_one_line() {
        assert_eq!(wrap_text("hello world", 500.0, 11.0), vec!["hello world"]);
    }

    #[test]
    fn wraps_at_width() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let width = 100.0;
        let lines = wrap_text(text, width, TEXT_FONT_SIZE_PT);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, TEXT_FONT_SIZE_PT, false) <= width + 1e-3, "{line}");
        }
        let rejoined: Vec<&str> = lines.iter().flat_map(|l| l.split_whitespace()).collect();
        assert_eq!(rejoined.join(" "), text);
    }

    #[test]
    fn hard_breaks_and_blank_lines_survive() {
        assert_eq!(wrap_text("a\n\nb", 500.0, 11.0), vec!["a", "", "b"]);
    }

    #[test]
    fn overlong_word_is_split() {
        let word = "x".repeat(200);
        let lines = wrap_text(&word, 50.0, 11.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn leading_indent_is_kept() {
        assert_eq!(wrap_text("    code()", 500.0, 11.0), vec!["    code()"]);
    }

    #[test]
    fn mixed_runs_keep_weights() {
        let lines = wrap_runs(&[Run::plain("Total: "), Run::bold("42")], 500.0, 11.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], vec![Run::plain("Total: "), Run::bold("42")]);
    }

    #[test]
    fn paragraphs_break_pages() {
        let mut surface = LayoutSurface::a4();
        let long = "line\n".repeat(200);
        surface.paragraph(&[Run::plain(long)], TEXT_FONT_SIZE_PT, 0.0);
        assert!(surface.page_count() > 1);
        let laid = surface.finish();
        assert!(laid.pages.len() > 1);
        for page in &laid.pages {
            for item in page {
                if let DrawItem::Text { baseline, .. } = item {
                    assert!(*baseline < laid.height);
                }
            }
        }
    }

    #[test]
    fn surface_is_released_on_every_path() {
        fn fails_midway() -> Result<(), String> {
            let mut surface = LayoutSurface::a4();
            assert_eq!(live_surfaces(), 1);
            surface.paragraph(&[Run::plain("partial")], 11.0, 0.0);
            Err("encoder failed".into())
        }

        assert_eq!(live_surfaces(), 0);
        assert!(fails_midway().is_err());
        assert_eq!(live_surfaces(), 0);

        let surface = LayoutSurface::a4();
        assert_eq!(live_surfaces(), 1);
        let _ = surface.finish();
        assert_eq!(live_surfaces(), 0);
    }

    #[test]
    fn surface_is_released_when_layout_panics() {
        let result = std::panic::catch_unwind(|| {
            let mut surface = LayoutSurface::a4();
            surface.paragraph(&[Run::plain("half a page")], TEXT_FONT_SIZE_PT, 0.0);
            assert_eq!(live_surfaces(), 1);
            panic!("encoder blew up mid-layout");
        });
        assert!(result.is_err());
        assert_eq!(live_surfaces(), 0);
    }

    #[test]
    fn remaining_space_shrinks_and_resets() {
        let mut surface = LayoutSurface::a4();
        let full = surface.remaining();
        surface.advance(100.0);
        assert!((full - surface.remaining() - 100.0).abs() < 1e-3);
        surface.new_page();
        assert_eq!(surface.remaining(), full);
    }

    #[test]
    fn empty_surface_still_has_a_page() {
        let laid = LayoutSurface::a4().finish();
        assert_eq!(laid.pages.len(), 1);
        assert!(laid.pages[0].is_empty());
    }
}
