use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use crate::error::{FleetError, Result};
use crate::record::{CellValue, FleetRecord, ID_COLUMN, RecordSet};

/// Format used for workbook datetimes once coerced to text
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Spreadsheet formats accepted by the import surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Workbook,
}

impl UploadFormat {
    /// Detect the format from the uploaded file name
    ///
    /// # Examples
    /// ```
    /// use fleet_dashboard::loader::UploadFormat;
    ///
    /// assert_eq!(UploadFormat::from_filename("fleet.CSV").unwrap(), UploadFormat::Csv);
    /// assert_eq!(UploadFormat::from_filename("fleet.xlsx").unwrap(), UploadFormat::Workbook);
    /// assert!(UploadFormat::from_filename("fleet.txt").is_err());
    /// ```
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(UploadFormat::Csv),
            Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => Ok(UploadFormat::Workbook),
            Some(ext) => Err(FleetError::ImportParseFailure(format!(
                "unsupported file extension: {}",
                ext
            ))),
            None => Err(FleetError::ImportParseFailure(
                "file has no extension".to_string(),
            )),
        }
    }
}

/// Parse an uploaded file into a record set, picking the parser by file name
pub fn load_upload(filename: &str, bytes: &[u8]) -> Result<RecordSet> {
    let set = match UploadFormat::from_filename(filename)? {
        UploadFormat::Csv => from_csv(bytes)?,
        UploadFormat::Workbook => from_workbook(bytes)?,
    };
    log::info!(
        "parsed {} rows and {} columns from {}",
        set.len(),
        set.columns.len(),
        filename
    );
    Ok(set)
}

/// Parse delimited text with a header row
///
/// Empty fields become `Null` and numeric fields become numbers. Rows shorter
/// than the header are padded; longer rows are rejected.
pub fn from_csv(bytes: &[u8]) -> Result<RecordSet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(FleetError::ImportParseFailure(
            "no columns to parse from file".to_string(),
        ));
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(FleetError::ImportParseFailure(format!(
                "row {} has {} fields, expected {}",
                line + 2,
                record.len(),
                headers.len()
            )));
        }
        rows.push(record.iter().map(CellValue::infer).collect());
    }

    build_record_set(headers, rows)
}

/// Parse the first sheet of a workbook, whose first row holds the headers
pub fn from_workbook(bytes: &[u8]) -> Result<RecordSet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| FleetError::ImportParseFailure(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FleetError::ImportParseFailure("no sheets found in workbook".to_string()))?
        .map_err(|e| FleetError::ImportParseFailure(e.to_string()))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header_row) => header_row.iter().map(header_text).collect(),
        None => {
            return Err(FleetError::ImportParseFailure(
                "workbook sheet is empty".to_string(),
            ));
        }
    };

    let rows = sheet_rows
        .map(|row| row.iter().map(cell_from_workbook).collect())
        .collect();

    build_record_set(headers, rows)
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => cell_from_workbook(other).to_string(),
    }
}

/// Convert a workbook cell, coercing datetimes to text
fn cell_from_workbook(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            CellValue::Integer(*f as i64)
        }
        Data::Float(f) => CellValue::Real(*f),
        Data::Bool(b) => CellValue::Integer(i64::from(*b)),
        Data::String(s) if s.is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|dt| CellValue::Text(dt.format(DATETIME_FORMAT).to_string()))
            .unwrap_or(CellValue::Null),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Make headers unique and non-empty the way spreadsheet tools do:
/// blanks become `Unnamed: <index>`, repeats get `.1`, `.2` suffixes.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(i, header)| {
            let base = if header.trim().is_empty() {
                format!("Unnamed: {}", i)
            } else {
                header
            };
            let mut name = base.clone();
            let mut suffix = 1;
            while seen.contains(&name) {
                name = format!("{}.{}", base, suffix);
                suffix += 1;
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}

/// Assemble records from parsed headers and rows
///
/// An `id` column supplies identifiers and must hold unique integers; without
/// one, rows are numbered from 1.
fn build_record_set(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<RecordSet> {
    let headers = dedupe_headers(headers);
    let id_index = headers.iter().position(|h| h == ID_COLUMN);
    let columns: Vec<String> = headers
        .iter()
        .filter(|h| h.as_str() != ID_COLUMN)
        .cloned()
        .collect();

    let mut set = RecordSet::new(columns);
    let mut ids = HashSet::new();
    for (n, row) in rows.into_iter().enumerate() {
        let id = match id_index {
            Some(i) => row
                .get(i)
                .and_then(CellValue::as_id)
                .ok_or_else(|| {
                    FleetError::ImportParseFailure(format!("row {} has no integer id", n + 1))
                })?,
            None => n as i64 + 1,
        };
        if !ids.insert(id) {
            return Err(FleetError::ImportParseFailure(format!(
                "duplicate id {} in row {}",
                id,
                n + 1
            )));
        }

        let mut record = FleetRecord::new(id);
        for (i, header) in headers.iter().enumerate() {
            if Some(i) == id_index {
                continue;
            }
            let value = row.get(i).cloned().unwrap_or(CellValue::Null);
            record.set(header.clone(), value);
        }
        set.records.push(record);
    }

    Ok(set)
}
