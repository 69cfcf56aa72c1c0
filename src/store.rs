use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OpenFlags, params_from_iter};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{FleetError, Result};
use crate::record::{CellValue, FleetRecord, ID_COLUMN, RecordSet};

/// Name of the single table holding fleet rows
pub const TABLE_NAME: &str = "fleet";

/// Columns created by the schema utility, after the identifier
pub const DEFAULT_COLUMNS: [(&str, &str); 8] = [
    ("Server", "TEXT"),
    ("Parent fleet", "TEXT"),
    ("Fleet number", "TEXT"),
    ("Registration", "TEXT"),
    ("Repair status", "TEXT"),
    ("Comments", "TEXT"),
    ("Date created", "TEXT"),
    ("Priority", "INTEGER"),
];

/// Operations the dashboard needs from whatever holds the fleet table
///
/// Writes replace the whole table; there is no incremental update.
pub trait RecordStore {
    /// Read every row. A missing table reads as an empty set.
    fn fetch_all(&self) -> Result<RecordSet>;

    /// Drop the current contents and write `records` in their place
    fn replace_all(&self, records: &RecordSet) -> Result<()>;

    /// Remove the row carrying `id`
    fn delete_one(&self, id: i64) -> Result<()>;

    /// Create the table with the default columns unless it already exists
    fn ensure_schema(&self) -> Result<()>;
}

/// SQLite-backed [`RecordStore`], opening a fresh connection per call
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        SqliteStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Connection::open_with_flags(&self.path, flags).map_err(|e| {
            log::error!("failed to open {}: {}", self.path.display(), e);
            FleetError::StoreUnavailable(format!("{}: {}", self.path.display(), e))
        })
    }
}

/// Quote an identifier for use in SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn table_columns(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(TABLE_NAME)))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Column addressing rows: `id` when every row holds a distinct integer
/// there, otherwise `rowid` for the whole table
fn key_column(conn: &Connection, columns: &[String]) -> Result<String> {
    if !columns.iter().any(|c| c == ID_COLUMN) {
        return Ok("rowid".to_string());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {}",
        quote_ident(ID_COLUMN),
        quote_ident(TABLE_NAME)
    ))?;
    let mut rows = stmt.query([])?;
    let mut seen = HashSet::new();
    while let Some(row) = rows.next()? {
        match cell_from_sql(row.get_ref(0)?).as_id() {
            Some(id) if seen.insert(id) => {}
            _ => {
                log::warn!("{} column of {} is not a usable key, using rowid", ID_COLUMN, TABLE_NAME);
                return Ok("rowid".to_string());
            }
        }
    }
    Ok(quote_ident(ID_COLUMN))
}

fn cell_from_sql(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(n) => CellValue::Integer(n),
        ValueRef::Real(f) => CellValue::Real(f),
        ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => CellValue::Text(String::from_utf8_lossy(b).into_owned()),
    }
}

fn cell_to_sql(value: &CellValue) -> Value {
    match value {
        CellValue::Null => Value::Null,
        CellValue::Integer(n) => Value::Integer(*n),
        CellValue::Real(f) => Value::Real(*f),
        CellValue::Text(s) => Value::Text(s.clone()),
    }
}

/// Declared type for a column, from the values it holds
fn column_affinity(records: &[FleetRecord], column: &str) -> &'static str {
    let mut saw_real = false;
    let mut saw_value = false;
    for record in records {
        match record.get(column) {
            CellValue::Null => {}
            CellValue::Integer(_) => saw_value = true,
            CellValue::Real(_) => {
                saw_value = true;
                saw_real = true;
            }
            CellValue::Text(_) => return "TEXT",
        }
    }
    match (saw_value, saw_real) {
        (false, _) => "TEXT",
        (true, true) => "REAL",
        (true, false) => "INTEGER",
    }
}

impl RecordStore for SqliteStore {
    fn fetch_all(&self) -> Result<RecordSet> {
        let conn = self.open()?;
        let columns = table_columns(&conn)?;
        if columns.is_empty() {
            log::debug!("table {} missing, reading as empty", TABLE_NAME);
            return Ok(RecordSet::default());
        }

        // Tables written elsewhere may lack a usable id column.
        let key = key_column(&conn, &columns)?;
        let data_columns: Vec<String> = columns.into_iter().filter(|c| c != ID_COLUMN).collect();
        let select_list = std::iter::once(key)
            .chain(data_columns.iter().map(|c| quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!("SELECT {} FROM {} ORDER BY rowid", select_list, quote_ident(TABLE_NAME));
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut set = RecordSet::new(data_columns);
        while let Some(row) = rows.next()? {
            let id = cell_from_sql(row.get_ref(0)?).as_id().ok_or_else(|| {
                FleetError::StoreUnavailable(format!("row without a key in {}", TABLE_NAME))
            })?;
            let mut record = FleetRecord::new(id);
            for (i, column) in set.columns.iter().enumerate() {
                record.set(column.clone(), cell_from_sql(row.get_ref(i + 1)?));
            }
            set.records.push(record);
        }

        log::debug!("read {} records from {}", set.len(), self.path.display());
        Ok(set)
    }

    fn replace_all(&self, records: &RecordSet) -> Result<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;

        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(TABLE_NAME)))?;

        let column_defs = std::iter::once(format!("{} INTEGER PRIMARY KEY", quote_ident(ID_COLUMN)))
            .chain(records.columns.iter().map(|c| {
                format!("{} {}", quote_ident(c), column_affinity(&records.records, c))
            }))
            .collect::<Vec<_>>()
            .join(", ");
        tx.execute_batch(&format!("CREATE TABLE {} ({})", quote_ident(TABLE_NAME), column_defs))?;

        {
            let names = std::iter::once(quote_ident(ID_COLUMN))
                .chain(records.columns.iter().map(|c| quote_ident(c)))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = vec!["?"; records.columns.len() + 1].join(", ");
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(TABLE_NAME),
                names,
                placeholders
            ))?;
            for record in &records.records {
                let values = std::iter::once(Value::Integer(record.id))
                    .chain(records.columns.iter().map(|c| cell_to_sql(record.get(c))));
                insert.execute(params_from_iter(values))?;
            }
        }

        tx.commit()?;
        log::info!(
            "replaced {} with {} records ({} columns)",
            TABLE_NAME,
            records.len(),
            records.columns.len()
        );
        Ok(())
    }

    fn delete_one(&self, id: i64) -> Result<()> {
        let conn = self.open()?;
        let columns = table_columns(&conn)?;
        let removed = if columns.is_empty() {
            0
        } else {
            let key = key_column(&conn, &columns)?;
            conn.execute(
                &format!("DELETE FROM {} WHERE {} = ?1", quote_ident(TABLE_NAME), key),
                [id],
            )?
        };
        if removed == 0 {
            return Err(FleetError::RecordNotFound(id));
        }
        log::info!("deleted record {}", id);
        Ok(())
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.open()?;
        let column_defs = std::iter::once(format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT",
            quote_ident(ID_COLUMN)
        ))
        .chain(
            DEFAULT_COLUMNS
                .iter()
                .map(|(name, ty)| format!("{} {}", quote_ident(name), ty)),
        )
        .collect::<Vec<_>>()
        .join(",\n    ");
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            quote_ident(TABLE_NAME),
            column_defs
        ))?;
        log::info!("ensured table {} in {}", TABLE_NAME, self.path.display());
        Ok(())
    }
}
