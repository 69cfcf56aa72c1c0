use fleet_dashboard::error::FleetError;
use fleet_dashboard::record::{CellValue, FleetRecord, RecordSet};
use fleet_dashboard::store::{DEFAULT_COLUMNS, RecordStore, SqliteStore};
use tempfile::TempDir;

fn store_in(dir: &TempDir) -> SqliteStore {
    SqliteStore::new(dir.path().join("fleet.db"))
}

fn sample() -> RecordSet {
    let mut set = RecordSet::new(vec![
        "Fleet number".to_string(),
        "Repair status".to_string(),
        "Priority".to_string(),
    ]);
    for (id, fleet, status, priority) in [
        (1, "FL-001", None, 2),
        (3, "FL-003", Some("New"), 1),
        (7, "FL-007", Some("Awaiting material"), 3),
    ] {
        let mut record = FleetRecord::new(id);
        record.set("Fleet number", CellValue::Text(fleet.to_string()));
        record.set(
            "Repair status",
            status.map_or(CellValue::Null, |s| CellValue::Text(s.to_string())),
        );
        record.set("Priority", CellValue::Integer(priority));
        set.records.push(record);
    }
    set
}

#[test]
fn missing_table_reads_empty() {
    let dir = TempDir::new().unwrap();
    let set = store_in(&dir).fetch_all().unwrap();
    assert!(set.is_empty());
    assert!(set.columns.is_empty());
}

#[test]
fn replace_then_fetch_round_trips() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let set = sample();

    store.replace_all(&set).unwrap();
    let fetched = store.fetch_all().unwrap();

    assert_eq!(fetched, set);
}

#[test]
fn replace_discards_previous_contents() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.replace_all(&sample()).unwrap();

    let mut smaller = RecordSet::new(vec!["Status".to_string()]);
    let mut record = FleetRecord::new(1);
    record.set("Status", CellValue::Text("Sold".to_string()));
    smaller.records.push(record);
    store.replace_all(&smaller).unwrap();

    let fetched = store.fetch_all().unwrap();
    assert_eq!(fetched.columns, vec!["Status".to_string()]);
    assert_eq!(fetched.len(), 1);
}

#[test]
fn replace_with_empty_set_clears_table() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.replace_all(&sample()).unwrap();
    store.replace_all(&RecordSet::default()).unwrap();

    assert!(store.fetch_all().unwrap().is_empty());
}

#[test]
fn delete_one_removes_only_that_row() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.replace_all(&sample()).unwrap();

    store.delete_one(1).unwrap();
    let ids: Vec<i64> = store.fetch_all().unwrap().records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![3, 7]);

    match store.delete_one(1) {
        Err(FleetError::RecordNotFound(1)) => {}
        other => panic!("expected RecordNotFound, got {:?}", other),
    }
}

#[test]
fn delete_on_missing_table_is_not_found() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        store_in(&dir).delete_one(5),
        Err(FleetError::RecordNotFound(5))
    ));
}

#[test]
fn ensure_schema_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store.ensure_schema().unwrap();
    store.ensure_schema().unwrap();

    let set = store.fetch_all().unwrap();
    let expected: Vec<String> = DEFAULT_COLUMNS.iter().map(|(c, _)| c.to_string()).collect();
    assert_eq!(set.columns, expected);
    assert!(set.is_empty());
}

#[test]
fn ensure_schema_keeps_existing_rows() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.replace_all(&sample()).unwrap();

    store.ensure_schema().unwrap();
    assert_eq!(store.fetch_all().unwrap().len(), 3);
}

#[test]
fn unreadable_database_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fleet.db");
    std::fs::write(&path, "this is not a database\n".repeat(64)).unwrap();

    let result = SqliteStore::new(&path).fetch_all();
    assert!(matches!(result, Err(FleetError::StoreUnavailable(_))));
}

#[test]
fn missing_directory_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(dir.path().join("absent").join("fleet.db"));
    assert!(matches!(store.fetch_all(), Err(FleetError::StoreUnavailable(_))));
}

/// A table written by another tool, with an `id` column that is not a key
fn write_legacy_table(path: &std::path::Path) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        r#"CREATE TABLE fleet (id TEXT, "Repair status" TEXT);
           INSERT INTO fleet VALUES (NULL, 'New');
           INSERT INTO fleet VALUES ('abc', 'Sold');
           INSERT INTO fleet VALUES ('2', 'Scrapped');"#,
    )
    .unwrap();
}

#[test]
fn unusable_id_column_falls_back_to_rowid() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    write_legacy_table(store.path());

    let set = store.fetch_all().unwrap();
    assert_eq!(set.columns, vec!["Repair status".to_string()]);
    assert_eq!(set.records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);

    store.replace_all(&set).unwrap();
    let reread = store.fetch_all().unwrap();
    assert_eq!(reread, set);
}

#[test]
fn delete_addresses_rowid_when_id_is_unusable() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    write_legacy_table(store.path());

    store.delete_one(2).unwrap();
    let statuses: Vec<String> = store
        .fetch_all()
        .unwrap()
        .records
        .iter()
        .map(|r| r.get("Repair status").to_string())
        .collect();
    assert_eq!(statuses, vec!["New", "Scrapped"]);
}
