//! Spreadsheet decoding: workbooks through calamine, CSV through the csv crate.
//!
//! Only the first worksheet is read. Cell values are rendered as display
//! text; formulas contribute their cached result, not the formula source.
//! Date-formatted cells are written as ISO dates (`2024-01-15`), with the
//! time appended when there is one.

use crate::error::ConvertError;
use crate::intermediate::Sheet;
use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Reader};
use chrono::Timelike;
use std::io::Cursor;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode the first worksheet of an xlsx/xlsm/xlsb/xls/ods workbook.
pub fn decode_workbook(bytes: &[u8]) -> Result<Sheet, ConvertError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ConvertError::decode("workbook", e))?;

    let names = workbook.sheet_names();
    if names.len() > 1 {
        warn!(
            "Workbook has {} sheets; converting only '{}'",
            names.len(),
            names[0]
        );
    }

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ConvertError::decode("workbook", "workbook has no worksheets"))?
        .map_err(|e| ConvertError::decode("workbook", e))?;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    debug!(
        "Decoded worksheet: {} rows × {} columns",
        rows.len(),
        range.width()
    );
    Ok(Sheet::new(rows))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::DateTime(dt) => excel_datetime_text(dt),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        other => other.to_string(),
    }
}

fn excel_datetime_text(dt: &ExcelDateTime) -> String {
    if dt.is_duration() {
        let secs = (dt.as_f64() * 86_400.0).round() as i64;
        return format!("{}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60);
    }
    match dt.as_datetime() {
        // Serials below one day carry no date part.
        Some(t) if dt.as_f64() < 1.0 => t.format("%H:%M:%S").to_string(),
        Some(t) if t.num_seconds_from_midnight() == 0 => t.format("%Y-%m-%d").to_string(),
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => dt.as_f64().to_string(),
    }
}

/// Decode comma-separated text. Rows may have differing lengths.
pub fn decode_csv(bytes: &[u8]) -> Result<Sheet, ConvertError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|e| ConvertError::decode("CSV", e))?;
        rows.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        );
    }

    debug!("Decoded CSV: {} rows", rows.len());
    Ok(Sheet::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn csv_rows_and_quoting() {
        let sheet = decode_csv(b"name,qty\n\"Smith, J\",3\n").expect("decode");
        assert_eq!(
            sheet.rows,
            vec![
                vec!["name".to_string(), "qty".to_string()],
                vec!["Smith, J".to_string(), "3".to_string()],
            ]
        );
    }

    #[test]
    fn csv_ragged_rows_and_bom() {
        let sheet = decode_csv(b"\xEF\xBB\xBFa,b,c\nd\n").expect("decode");
        assert_eq!(sheet.rows[0][0], "a");
        assert_eq!(sheet.rows[1], vec!["d".to_string()]);
        assert_eq!(sheet.column_count(), 3);
    }

    #[test]
    fn empty_csv_is_empty_sheet() {
        assert!(decode_csv(b"").expect("decode").is_empty());
    }

    #[test]
    fn garbage_workbook_is_decode_error() {
        let err = decode_workbook(b"this is not a workbook").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }

    #[test]
    fn cells_render_as_display_text() {
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::String("x".into())), "x");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(
            cell_text(&Data::DateTimeIso("2024-01-15T08:30:00".into())),
            "2024-01-15T08:30:00"
        );
    }
}
