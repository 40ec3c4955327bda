//! CSV and Excel parsing with size caps and encoding fallback

use std::io::Cursor;

use calamine::Reader;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::LimitsConfig;
use crate::error::{Error, Result};
use crate::tabular::RowSet;
use crate::types::FileKind;

/// Name given to the single row set produced from a CSV file
const CSV_SHEET_NAME: &str = "Sheet1";

/// Parses raw tabular bytes into ordered [`RowSet`]s.
///
/// Enforces the format allow-list and per-format size caps before touching
/// the bytes. Workbook sheets that fail to parse are skipped; empty sheets
/// are elided. A file yielding no row sets at all is an error.
pub struct TabularParser {
    limits: LimitsConfig,
}

impl TabularParser {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    pub fn parse(&self, data: &[u8], kind: FileKind) -> Result<Vec<RowSet>> {
        let limit = self
            .limits
            .max_bytes(kind)
            .ok_or_else(|| Error::UnsupportedFileType(kind.as_str().to_string()))?;

        if data.len() > limit {
            return Err(Error::FileTooLarge {
                file_type: kind.as_str().to_string(),
                size: data.len(),
                limit,
            });
        }

        match kind {
            FileKind::Csv => self.parse_csv(data),
            FileKind::Xls | FileKind::Xlsx => self.parse_workbook(data, kind),
            FileKind::Unknown => unreachable!("rejected by the allow-list above"),
        }
    }

    fn parse_csv(&self, data: &[u8]) -> Result<Vec<RowSet>> {
        let text = decode_text(data);
        if text.trim().is_empty() {
            return Err(Error::file_parse("csv", "file is empty"));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| Error::file_parse("csv", format!("malformed header: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();
        if columns.iter().all(|c| c.is_empty()) {
            return Err(Error::file_parse("csv", "file has no columns"));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| Error::file_parse("csv", format!("malformed row: {}", e)))?;
            rows.push(record.iter().map(parse_cell).collect());
        }

        Ok(vec![RowSet::new(CSV_SHEET_NAME, columns, rows)])
    }

    fn parse_workbook(&self, data: &[u8], kind: FileKind) -> Result<Vec<RowSet>> {
        let cursor = Cursor::new(data.to_vec());
        let mut workbook = calamine::open_workbook_auto_from_rs(cursor).map_err(|e| {
            Error::file_parse(kind.as_str(), format!("failed to open workbook: {}", e))
        })?;

        let mut rowsets = Vec::new();
        for sheet_name in workbook.sheet_names().to_vec() {
            let range = match workbook.worksheet_range(&sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    warn!("skipping unreadable sheet '{}': {}", sheet_name, e);
                    continue;
                }
            };

            match sheet_to_rowset(&sheet_name, range.rows()) {
                Some(rowset) => rowsets.push(rowset),
                None => info!("eliding empty sheet '{}'", sheet_name),
            }
        }

        if rowsets.is_empty() {
            return Err(Error::file_parse(
                kind.as_str(),
                "workbook contains no non-empty sheets",
            ));
        }
        Ok(rowsets)
    }
}

/// CSV cell to a JSON value: empty becomes null, numerics (with or without
/// thousands separators) become numbers, everything else stays a string.
fn parse_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Some(number) = parse_number(trimmed) {
        return number;
    }
    Value::String(trimmed.to_string())
}

fn parse_number(s: &str) -> Option<Value> {
    let parsed = s.parse::<f64>().ok().or_else(|| {
        // Retry with thousands separators removed: "1,234.5"
        if s.contains(',') {
            s.replace(',', "").parse::<f64>().ok()
        } else {
            None
        }
    })?;
    serde_json::Number::from_f64(parsed).map(Value::Number)
}

/// Convert one sheet's rows to a [`RowSet`], first row as headers. Sheets
/// with no header row or no non-empty data rows yield `None`.
fn sheet_to_rowset<'a>(
    name: &str,
    mut rows: impl Iterator<Item = &'a [calamine::Data]>,
) -> Option<RowSet> {
    let header_row = rows.next()?;
    if header_row.is_empty() {
        return None;
    }

    let columns: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let header = cell_to_string(cell);
            if header.trim().is_empty() {
                format!("column_{}", i)
            } else {
                header.trim().to_string()
            }
        })
        .collect();

    let body: Vec<Vec<Value>> = rows
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect();

    let rowset = RowSet::new(name, columns, body);
    if rowset.non_empty_rows() == 0 {
        return None;
    }
    Some(rowset)
}

fn cell_to_value(cell: &calamine::Data) -> Value {
    match cell {
        calamine::Data::Empty => Value::Null,
        calamine::Data::String(s) => {
            if s.trim().is_empty() {
                Value::Null
            } else {
                Value::String(s.clone())
            }
        }
        calamine::Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        calamine::Data::Int(i) => Value::Number((*i).into()),
        calamine::Data::Bool(b) => Value::Bool(*b),
        calamine::Data::DateTime(dt) => Value::String(dt.to_string()),
        _ => Value::Null,
    }
}

fn cell_to_string(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.clone(),
        calamine::Data::Float(f) => f.to_string(),
        calamine::Data::Int(i) => i.to_string(),
        calamine::Data::Bool(b) => b.to_string(),
        calamine::Data::DateTime(dt) => dt.to_string(),
        _ => String::new(),
    }
}

/// Decode bytes as UTF-8, then Windows-1252, then Latin-1. The last is
/// total, so decoding always succeeds; mis-declared encodings degrade to
/// replaced punctuation rather than a hard failure.
fn decode_text(data: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(data) {
        return s.to_string();
    }
    if let Some(s) = decode_windows_1252(data) {
        return s;
    }
    data.iter().map(|&b| b as char).collect()
}

/// Windows-1252 with the five undefined code points rejected
fn decode_windows_1252(data: &[u8]) -> Option<String> {
    data.iter().map(|&b| windows_1252_char(b)).collect()
}

fn windows_1252_char(byte: u8) -> Option<char> {
    match byte {
        0x00..=0x7F | 0xA0..=0xFF => Some(byte as char),
        0x80 => Some('\u{20AC}'),
        0x82 => Some('\u{201A}'),
        0x83 => Some('\u{0192}'),
        0x84 => Some('\u{201E}'),
        0x85 => Some('\u{2026}'),
        0x86 => Some('\u{2020}'),
        0x87 => Some('\u{2021}'),
        0x88 => Some('\u{02C6}'),
        0x89 => Some('\u{2030}'),
        0x8A => Some('\u{0160}'),
        0x8B => Some('\u{2039}'),
        0x8C => Some('\u{0152}'),
        0x8E => Some('\u{017D}'),
        0x91 => Some('\u{2018}'),
        0x92 => Some('\u{2019}'),
        0x93 => Some('\u{201C}'),
        0x94 => Some('\u{201D}'),
        0x95 => Some('\u{2022}'),
        0x96 => Some('\u{2013}'),
        0x97 => Some('\u{2014}'),
        0x98 => Some('\u{02DC}'),
        0x99 => Some('\u{2122}'),
        0x9A => Some('\u{0161}'),
        0x9B => Some('\u{203A}'),
        0x9C => Some('\u{0153}'),
        0x9E => Some('\u{017E}'),
        0x9F => Some('\u{0178}'),
        // 0x81, 0x8D, 0x8F, 0x90, 0x9D are undefined in Windows-1252
        _ => None,
    }
}
