//! The editable data grid: turning a submitted grid form back into records.
//!
//! The grid posts its fields in document order:
//! - `column` once per data column, in table order
//! - `row` once per row, carrying the record id
//! - `cell:<id>:<column index>` for every editable cell

use std::collections::{HashMap, HashSet};

use crate::columns::{Role, resolve};
use crate::error::{FleetError, Result};
use crate::record::{CellValue, FleetRecord, ID_COLUMN, RecordSet};
use crate::summary::priority_level;

/// Field name of one grid cell
pub fn cell_field(id: i64, column_index: usize) -> String {
    format!("cell:{}:{}", id, column_index)
}

fn parse_cell_field(key: &str) -> Option<(i64, usize)> {
    let rest = key.strip_prefix("cell:")?;
    let (id, index) = rest.split_once(':')?;
    Some((id.parse().ok()?, index.parse().ok()?))
}

/// Rebuild a record set from submitted grid fields
///
/// Cells are typed the same way imported text is. The priority column is
/// coerced to an integer level, with anything malformed stored as 0.
pub fn records_from_form(fields: &[(String, String)]) -> Result<RecordSet> {
    let mut columns = Vec::new();
    let mut row_ids = Vec::new();
    let mut cells: HashMap<(i64, usize), &str> = HashMap::new();

    for (key, value) in fields {
        match key.as_str() {
            "column" => columns.push(value.clone()),
            "row" => {
                let id = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| FleetError::InvalidGridEdit(format!("bad row id '{}'", value)))?;
                row_ids.push(id);
            }
            other => {
                if let Some(position) = parse_cell_field(other) {
                    cells.insert(position, value.as_str());
                }
            }
        }
    }

    let mut seen = HashSet::new();
    for column in &columns {
        if column == ID_COLUMN || !seen.insert(column.as_str()) {
            return Err(FleetError::InvalidGridEdit(format!(
                "unexpected column '{}'",
                column
            )));
        }
    }

    let priority_column = resolve(&columns, Role::Priority);
    let mut set = RecordSet::new(columns);
    let mut ids = HashSet::new();
    for id in row_ids {
        if !ids.insert(id) {
            return Err(FleetError::InvalidGridEdit(format!("duplicate row id {}", id)));
        }
        let mut record = FleetRecord::new(id);
        for (index, column) in set.columns.iter().enumerate() {
            let raw = cells.get(&(id, index)).copied().unwrap_or("");
            let value = if Some(column.as_str()) == priority_column {
                CellValue::Integer(priority_level(&CellValue::infer(raw)))
            } else {
                CellValue::infer(raw)
            };
            record.set(column.clone(), value);
        }
        set.records.push(record);
    }

    Ok(set)
}

/// Append an empty row with the next free id
///
/// The priority column starts at 0 and a `Date created` column, when the
/// table has one, is stamped with `today`.
pub fn append_blank_row(set: &mut RecordSet, today: &str) -> i64 {
    let id = set.next_id();
    let priority_column = resolve(&set.columns, Role::Priority);
    let mut record = FleetRecord::new(id);
    for column in &set.columns {
        let value = if column == "Date created" {
            CellValue::Text(today.to_string())
        } else if Some(column.as_str()) == priority_column {
            CellValue::Integer(0)
        } else {
            CellValue::Null
        };
        record.set(column.clone(), value);
    }
    set.records.push(record);
    id
}
