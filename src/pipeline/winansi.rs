//! Windows-1252 ("WinAnsiEncoding") code page.
//!
//! Used in both directions: RTF `\'hh` escapes decode through it, and the
//! PDF writer encodes text for the standard Helvetica fonts with it.

/// Characters for bytes 0x80..=0x9F. Unassigned slots are U+FFFD.
const HIGH: [char; 32] = [
    '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}',
    '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
];

pub fn decode_byte(b: u8) -> char {
    match b {
        0x80..=0x9F => HIGH[(b - 0x80) as usize],
        _ => b as char,
    }
}

/// Encode a character, or `None` when the code page has no slot for it.
pub fn encode_char(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => HIGH
            .iter()
            .position(|&h| h == c && h != '\u{FFFD}')
            .map(|i| 0x80 + i as u8),
    }
}

/// Encode a string, replacing unmappable characters with `?` and tabs
/// with a space.
pub fn encode_lossy(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            _ => encode_char(c).unwrap_or(b'?'),
        })
        .collect()
}
