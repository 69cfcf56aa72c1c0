use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Name of the identifier column in the backing table
pub const ID_COLUMN: &str = "id";

static NULL: CellValue = CellValue::Null;

/// A single table cell, mirroring the SQLite storage classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl CellValue {
    /// Interpret raw text the way a spreadsheet import would
    ///
    /// Empty text is absent. Numeric text becomes a number only when the
    /// number prints back as the same text, so `"007"` or `"1.50"` stay text.
    /// Everything else is kept verbatim.
    ///
    /// # Examples
    /// ```
    /// use fleet_dashboard::record::CellValue;
    ///
    /// assert_eq!(CellValue::infer(""), CellValue::Null);
    /// assert_eq!(CellValue::infer("42"), CellValue::Integer(42));
    /// assert_eq!(CellValue::infer("1.5"), CellValue::Real(1.5));
    /// assert_eq!(CellValue::infer("007"), CellValue::Text("007".to_string()));
    /// assert_eq!(CellValue::infer("1.50"), CellValue::Text("1.50".to_string()));
    /// assert_eq!(CellValue::infer("FL-12"), CellValue::Text("FL-12".to_string()));
    /// ```
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Null;
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            if n.to_string() == trimmed {
                return CellValue::Integer(n);
            }
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && f.to_string() == trimmed => CellValue::Real(f),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// The value as an integer identifier, if it is one
    pub fn as_id(&self) -> Option<i64> {
        match self {
            CellValue::Integer(n) => Some(*n),
            CellValue::Real(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(n) => write!(f, "{}", n),
            CellValue::Real(r) => write!(f, "{}", r),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// One row of the fleet table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetRecord {
    pub id: i64,
    pub values: HashMap<String, CellValue>,
}

impl FleetRecord {
    pub fn new(id: i64) -> Self {
        FleetRecord {
            id,
            values: HashMap::new(),
        }
    }

    /// Value of `column`, `Null` when the record does not carry it
    pub fn get(&self, column: &str) -> &CellValue {
        self.values.get(column).unwrap_or(&NULL)
    }

    pub fn set(&mut self, column: impl Into<String>, value: CellValue) {
        self.values.insert(column.into(), value);
    }
}

/// The full contents of the fleet table: ordered columns plus rows
///
/// `columns` never contains the identifier column; every record carries its
/// identifier in [`FleetRecord::id`] instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub records: Vec<FleetRecord>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        RecordSet {
            columns,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Identifier one past the largest in use
    pub fn next_id(&self) -> i64 {
        self.records.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    /// Cells of each record in column order
    pub fn rows(&self) -> impl Iterator<Item = (i64, Vec<&CellValue>)> + '_ {
        self.records.iter().map(move |record| {
            let cells = self.columns.iter().map(|c| record.get(c)).collect();
            (record.id, cells)
        })
    }

    /// Sorted distinct non-null values of `column`, as text
    pub fn distinct_values(&self, column: &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .records
            .iter()
            .map(|r| r.get(column))
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
            .collect();
        values.sort();
        values.dedup();
        values
    }
}
