//! Text-family decoding: plain text, HTML and RTF.
//!
//! Bytes are read as UTF-8 with invalid sequences replaced, so a stray
//! Latin-1 byte never fails a conversion. RTF is reduced to its visible text
//! by a small control-word scanner; styling is not preserved.

use crate::pipeline::winansi;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

const UTF8_BOM: &str = "\u{FEFF}";

/// Decode a plain-text source.
pub fn decode_plain_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(&text);
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Decode an HTML source. The markup is kept as-is for the layout engine.
pub fn decode_html(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix(UTF8_BOM).unwrap_or(&text).to_string()
}

/// Runs of blank lines collapse to a single blank line.
static RE_BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

/// Destinations whose content is never visible text.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "headerl",
    "headerr",
    "footerl",
    "footerr",
    "object",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "themedata",
    "latentstyles",
    "datastore",
    "xmlnstbl",
];

/// Group state that RTF scopes with braces.
#[derive(Debug, Clone, Copy)]
struct RtfGroup {
    /// Content of the group is not visible text.
    skip: bool,
    /// Fallback characters that follow each `\uN`, set by `\ucN`.
    uc: usize,
}

impl Default for RtfGroup {
    fn default() -> Self {
        Self { skip: false, uc: 1 }
    }
}

/// Strip RTF control words and groups down to plain text.
///
/// Handles `\par`/`\line` (newline), `\tab`, `\'hh` (Windows-1252 byte),
/// `\uN` with the `\ucN` fallback characters skipped, escaped `\\ \{ \}`,
/// and ignores `{\* ...}` groups plus the destinations in
/// [`SKIPPED_DESTINATIONS`].
pub fn decode_rtf(bytes: &[u8]) -> String {
    let src = String::from_utf8_lossy(bytes);
    let chars: Vec<char> = src.chars().collect();

    let mut out = String::with_capacity(chars.len() / 2);
    let mut groups: Vec<RtfGroup> = vec![RtfGroup::default()];
    let mut skip_fallback = 0usize;
    let mut i = 0;

    let current = |groups: &Vec<RtfGroup>| groups.last().copied().unwrap_or_default();
    let skipping = |groups: &Vec<RtfGroup>| current(groups).skip;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '{' => {
                let parent = current(&groups);
                groups.push(parent);
                i += 1;
            }
            '}' => {
                if groups.len() > 1 {
                    groups.pop();
                }
                i += 1;
            }
            '\\' => {
                i += 1;
                let Some(&next) = chars.get(i) else { break };
                if next.is_ascii_alphabetic() {
                    let start = i;
                    while i < chars.len() && chars[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    let word: String = chars[start..i].iter().collect();

                    let num_start = i;
                    if i < chars.len() && (chars[i] == '-' || chars[i].is_ascii_digit()) {
                        i += 1;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                    let param: Option<i32> = chars[num_start..i]
                        .iter()
                        .collect::<String>()
                        .parse()
                        .ok();
                    // A single space delimits the control word and is consumed.
                    if i < chars.len() && chars[i] == ' ' {
                        i += 1;
                    }

                    if SKIPPED_DESTINATIONS.contains(&word.as_str()) {
                        if let Some(top) = groups.last_mut() {
                            top.skip = true;
                        }
                        continue;
                    }
                    if skipping(&groups) {
                        continue;
                    }
                    match word.as_str() {
                        "par" | "line" | "sect" | "page" => out.push('\n'),
                        "tab" | "cell" => out.push('\t'),
                        "row" => out.push('\n'),
                        "emdash" => out.push('\u{2014}'),
                        "endash" => out.push('\u{2013}'),
                        "bullet" => out.push('\u{2022}'),
                        "lquote" => out.push('\u{2018}'),
                        "rquote" => out.push('\u{2019}'),
                        "ldblquote" => out.push('\u{201C}'),
                        "rdblquote" => out.push('\u{201D}'),
                        "uc" => {
                            if let Some(top) = groups.last_mut() {
                                top.uc = param.unwrap_or(1).max(0) as usize;
                            }
                        }
                        "u" => {
                            if let Some(n) = param {
                                let code = if n < 0 { n + 65536 } else { n };
                                if let Some(ch) = char::from_u32(code as u32) {
                                    out.push(ch);
                                }
                                skip_fallback = current(&groups).uc;
                            }
                        }
                        _ => {}
                    }
                } else {
                    match next {
                        '*' => {
                            if let Some(top) = groups.last_mut() {
                                top.skip = true;
                            }
                            i += 1;
                        }
                        '\'' => {
                            let hex: String = chars.iter().skip(i + 1).take(2).collect();
                            i += 1 + hex.len();
                            if skipping(&groups) {
                                continue;
                            }
                            if skip_fallback > 0 {
                                skip_fallback -= 1;
                                continue;
                            }
                            if let Ok(b) = u8::from_str_radix(&hex, 16) {
                                out.push(winansi::decode_byte(b));
                            }
                        }
                        '\\' | '{' | '}' => {
                            if !skipping(&groups) {
                                out.push(next);
                            }
                            i += 1;
                        }
                        '~' => {
                            if !skipping(&groups) {
                                out.push('\u{00A0}');
                            }
                            i += 1;
                        }
                        '\n' | '\r' => {
                            if !skipping(&groups) {
                                out.push('\n');
                            }
                            i += 1;
                        }
                        _ => i += 1,
                    }
                }
            }
            '\r' | '\n' => i += 1,
            _ => {
                if !skipping(&groups) {
                    if skip_fallback > 0 {
                        skip_fallback -= 1;
                    } else {
                        out.push(c);
                    }
                }
                i += 1;
            }
        }
    }

    let collapsed = RE_BLANK_RUNS.replace_all(&out, "\n\n");
    let text = collapsed.trim().to_string();
    debug!("RTF stripped to {} chars of text", text.chars().count());
    text
}
