use rust_xlsxwriter::{Workbook, Worksheet};

use crate::error::{FleetError, Result};
use crate::record::{CellValue, ID_COLUMN, RecordSet};

/// Sheet name used for workbook exports
pub const SHEET_NAME: &str = "fleet";

pub const CSV_FILENAME: &str = "fleet_export.csv";
pub const XLSX_FILENAME: &str = "fleet_export.xlsx";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn header_row(set: &RecordSet) -> impl Iterator<Item = &str> {
    std::iter::once(ID_COLUMN).chain(set.columns.iter().map(String::as_str))
}

/// Convert the record set to CSV
///
/// The `id` column comes first, followed by the store's columns in order.
/// Absent values are written as empty fields.
///
/// # Examples
/// ```
/// use fleet_dashboard::record::{CellValue, FleetRecord, RecordSet};
/// use fleet_dashboard::downloader::to_csv;
///
/// let mut set = RecordSet::new(vec!["Repair status".to_string()]);
/// let mut record = FleetRecord::new(1);
/// record.set("Repair status", CellValue::Text("New".into()));
/// set.records.push(record);
///
/// let csv = String::from_utf8(to_csv(&set).unwrap()).unwrap();
/// assert_eq!(csv, "id,Repair status\n1,New\n");
/// ```
pub fn to_csv(set: &RecordSet) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header_row(set))?;

    for (id, cells) in set.rows() {
        let fields = std::iter::once(id.to_string()).chain(cells.iter().map(|c| c.to_string()));
        writer.write_record(fields)?;
    }

    writer
        .into_inner()
        .map_err(|e| FleetError::Export(e.to_string()))
}

/// Convert the record set to an XLSX workbook with a single `fleet` sheet
///
/// Numbers are written as numbers, text as strings and absent values are
/// left blank.
pub fn to_xlsx(set: &RecordSet) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(SHEET_NAME)?;

    for (c, header) in header_row(set).enumerate() {
        worksheet.write_string(0, c as u16, header)?;
    }

    for (r, (id, cells)) in set.rows().enumerate() {
        let row = (r + 1) as u32;
        worksheet.write_number(row, 0, id as f64)?;
        for (c, cell) in cells.iter().enumerate() {
            let col = (c + 1) as u16;
            match cell {
                CellValue::Null => {}
                CellValue::Integer(n) => {
                    worksheet.write_number(row, col, *n as f64)?;
                }
                CellValue::Real(f) => {
                    worksheet.write_number(row, col, *f)?;
                }
                CellValue::Text(s) => {
                    worksheet.write_string(row, col, s.as_str())?;
                }
            }
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}
