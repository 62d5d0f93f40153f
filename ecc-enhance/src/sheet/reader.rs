//! Read the first worksheet of an xlsx file as a text table

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use chrono::{NaiveDate, NaiveTime, TimeDelta};

use crate::error::{EngineError, EngineResult};

/// Header row plus data rows, all cells rendered as text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Cell text, "" past the end of a short row
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Parse xlsx bytes. Numbers and dates are rendered as text, never coerced.
pub fn read_table(bytes: &[u8]) -> EngineResult<Table> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| EngineError::Format(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| EngineError::Format("workbook has no worksheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| EngineError::Format(format!("sheet '{}': {}", sheet_name, e)))?;

    let mut rows = range.rows();
    let header = match rows.next() {
        Some(cells) => cells.iter().map(cell_text).collect(),
        None => return Ok(Table::default()),
    };
    let rows = rows
        .map(|cells| cells.iter().map(cell_text).collect())
        .collect();

    Ok(Table { header, rows })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(dt) if dt.is_duration() => format_number(dt.as_f64()),
        Data::DateTime(dt) => format_serial_date(dt.as_f64()),
    }
}

/// Integral values print without a fraction so phone numbers and codes
/// survive intact
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Excel serial day number (1900 date system) to `YYYY-MM-DD[ HH:MM:SS]`
fn format_serial_date(serial: f64) -> String {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).map(|d| d.and_time(NaiveTime::MIN));
    let millis = (serial * 86_400_000.0).round() as i64;

    match epoch.and_then(|e| e.checked_add_signed(TimeDelta::milliseconds(millis))) {
        Some(dt) if dt.time() == NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format_number(serial),
    }
}
