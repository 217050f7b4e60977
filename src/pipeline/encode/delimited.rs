//! Sheet → CSV.
//!
//! Comma separator, `\n` record terminator, and quoting only for fields that
//! need it. Short rows are padded with empty fields so every record has the
//! same width.

use crate::error::ConvertError;
use crate::intermediate::Sheet;

pub fn encode_csv(sheet: &Sheet) -> Result<Vec<u8>, ConvertError> {
    let width = sheet.column_count();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b',')
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    for row in &sheet.rows {
        let padded = row
            .iter()
            .map(String::as_str)
            .chain(std::iter::repeat("").take(width - row.len()));
        writer
            .write_record(padded)
            .map_err(|e| ConvertError::external("csv", "writing record", e))?;
    }

    writer
        .into_inner()
        .map_err(|e| ConvertError::external("csv", "flushing output", e.error().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &[&[&str]]) -> Sheet {
        Sheet::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn simple_grid() {
        let out = encode_csv(&sheet(&[&["a", "b"], &["1", "2"]])).expect("encode");
        assert_eq!(out, b"a,b\n1,2\n");
    }

    #[test]
    fn quotes_only_when_needed() {
        let out = encode_csv(&sheet(&[&["Smith, J", "say \"hi\"", "plain"]])).expect("encode");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "\"Smith, J\",\"say \"\"hi\"\"\",plain\n"
        );
    }

    #[test]
    fn ragged_rows_are_padded() {
        let out = encode_csv(&sheet(&[&["a", "b", "c"], &["d"]])).expect("encode");
        assert_eq!(out, b"a,b,c\nd,,\n");
    }

    #[test]
    fn empty_sheet_is_empty_output() {
        assert!(encode_csv(&Sheet::default()).expect("encode").is_empty());
    }
}
