use fleet_dashboard::columns::{Role, resolve};
use fleet_dashboard::record::{CellValue, FleetRecord, RecordSet};
use fleet_dashboard::summary::{
    DISPLAY_SLOTS, OTHER, StatusCount, aggregate_priority, aggregate_status,
    build_display_categories, normalize, priority_level, summarize,
};
use proptest::prelude::*;

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

fn records(column: &str, values: Vec<CellValue>) -> Vec<FleetRecord> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let mut record = FleetRecord::new(i as i64 + 1);
            record.set(column, value);
            record
        })
        .collect()
}

fn ranked(entries: &[(&str, usize)]) -> Vec<StatusCount> {
    entries
        .iter()
        .map(|(status, count)| StatusCount {
            status: status.to_string(),
            count: *count,
        })
        .collect()
}

#[test]
fn resolver_prefers_first_declared_alias() {
    let columns = vec!["Status".to_string(), "repairStatus".to_string(), "Priority".to_string()];
    assert_eq!(resolve(&columns, Role::Status), Some("repairStatus"));
    assert_eq!(resolve(&columns, Role::Priority), Some("Priority"));
}

#[test]
fn resolver_is_case_sensitive_and_reports_absence() {
    let columns = ["repair status", "PRIORITY"];
    assert_eq!(resolve(&columns, Role::Status), None);
    assert_eq!(resolve(&columns, Role::Priority), None);
    assert_eq!(resolve(&["priority"], Role::Priority), Some("priority"));
}

#[test]
fn status_counts_merge_trimmed_values() {
    let rows = records(
        "Repair status",
        vec![text("New"), text(" New "), CellValue::Null],
    );
    let counts = aggregate_status(&rows, Some("Repair status"));

    assert_eq!(counts.len(), 2);
    assert_eq!(counts.get("New"), 2);
    assert_eq!(counts.get(OTHER), 1);
    assert_eq!(counts.total(), rows.len());
}

#[test]
fn status_counts_empty_without_column() {
    let rows = records("Repair status", vec![text("New")]);
    assert!(aggregate_status(&rows, None).is_empty());
}

#[test]
fn ranking_breaks_ties_alphabetically() {
    let rows = records(
        "Status",
        vec![text("b"), text("a"), text("c"), text("c")],
    );
    let ranked = aggregate_status(&rows, Some("Status")).ranked();
    let order: Vec<&str> = ranked.iter().map(|c| c.status.as_str()).collect();
    assert_eq!(order, ["c", "a", "b"]);
}

#[test]
fn no_records_fill_every_slot_with_other() {
    assert_eq!(build_display_categories(&[]), [OTHER; DISPLAY_SLOTS].map(String::from));
}

#[test]
fn preferred_categories_come_first_in_fixed_order() {
    let display = build_display_categories(&ranked(&[
        ("Scrapped", 10),
        ("Awaiting material", 4),
        ("New", 1),
        ("Sold", 1),
    ]));
    assert_eq!(
        display,
        ["New", "Awaiting material", "Scrapped", "Sold", "Other"].map(String::from)
    );
}

#[test]
fn extra_categories_are_truncated() {
    let entries: Vec<(String, usize)> = (0..50).map(|i| (format!("S{:02}", i), 50 - i)).collect();
    let ranked: Vec<StatusCount> = entries
        .iter()
        .map(|(s, c)| StatusCount {
            status: s.clone(),
            count: *c,
        })
        .collect();
    let display = build_display_categories(&ranked);
    assert_eq!(display, ["S00", "S01", "S02", "S03", "S04"].map(String::from));
}

#[test]
fn priority_buckets_ignore_unknown_levels() {
    let rows = records(
        "Priority",
        vec![
            CellValue::Integer(1),
            CellValue::Integer(1),
            text("2"),
            CellValue::Real(3.0),
            CellValue::Integer(7),
            CellValue::Null,
            text("urgent"),
        ],
    );
    let buckets = aggregate_priority(&rows, Some("Priority"));

    assert_eq!(buckets.count(1), 2);
    assert_eq!(buckets.count(2), 1);
    assert_eq!(buckets.count(3), 1);
    assert_eq!(buckets.count(7), 0);
    assert_eq!(buckets.count(0), 0);
    assert_eq!(buckets.total(), 4);
    assert!(buckets.as_map().keys().all(|k| (1..=3).contains(k)));
}

#[test]
fn priority_level_coerces_loosely() {
    assert_eq!(priority_level(&CellValue::Integer(2)), 2);
    assert_eq!(priority_level(&CellValue::Real(2.9)), 2);
    assert_eq!(priority_level(&text(" 3 ")), 3);
    assert_eq!(priority_level(&text("1.0")), 1);
    assert_eq!(priority_level(&text("n/a")), 0);
    assert_eq!(priority_level(&CellValue::Null), 0);
}

#[test]
fn summary_reports_missing_columns() {
    let mut set = RecordSet::new(vec!["Comments".to_string()]);
    let mut record = FleetRecord::new(1);
    record.set("Comments", text("leaking"));
    set.records.push(record);

    let summary = summarize(&set);
    assert_eq!(summary.total_records, 1);
    assert_eq!(summary.missing_roles(), vec![Role::Status, Role::Priority]);
    assert!(summary.tiles.is_empty());
    assert_eq!(summary.priority.total(), 0);
}

#[test]
fn summary_tiles_follow_display_categories() {
    let mut set = RecordSet::new(vec!["repairStatus".to_string(), "Priority".to_string()]);
    for (i, (status, priority)) in [("New", 1), ("Awaiting material", 2), ("New", 2)]
        .into_iter()
        .enumerate()
    {
        let mut record = FleetRecord::new(i as i64 + 1);
        record.set("repairStatus", text(status));
        record.set("Priority", CellValue::Integer(priority));
        set.records.push(record);
    }

    let summary = summarize(&set);
    assert_eq!(summary.status_column, Some("repairStatus"));
    assert_eq!(summary.tiles.len(), DISPLAY_SLOTS);
    assert_eq!(summary.tiles[0].label, "New");
    assert_eq!(summary.tiles[0].count, 2);
    assert_eq!(summary.tiles[1].label, "Awaiting material");
    assert_eq!(summary.tiles[4].label, OTHER);
    assert_eq!(summary.tiles[4].count, 0);
    assert_eq!(summary.slices.len(), 2);
    assert_eq!(summary.priority.count(2), 2);
}

fn cell_strategy() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        Just(CellValue::Null),
        any::<i64>().prop_map(CellValue::Integer),
        (-1.0e6f64..1.0e6).prop_map(CellValue::Real),
        "[ a-zA-Z0-9-]{0,16}".prop_map(CellValue::Text),
    ]
}

proptest! {
    #[test]
    fn normalize_is_idempotent(cell in cell_strategy()) {
        let once = normalize(&cell);
        prop_assert_eq!(normalize(&CellValue::Text(once.clone())), once);
    }

    #[test]
    fn display_always_has_five_slots(labels in prop::collection::btree_set("[A-Za-z]{1,8}", 0..60)) {
        let ranked: Vec<StatusCount> = labels
            .into_iter()
            .map(|status| StatusCount { status, count: 1 })
            .collect();
        let display = build_display_categories(&ranked);
        prop_assert_eq!(display.len(), DISPLAY_SLOTS);
    }

    #[test]
    fn status_counts_sum_to_record_count(cells in prop::collection::vec(cell_strategy(), 0..40)) {
        let rows = records("Repair status", cells);
        let counts = aggregate_status(&rows, Some("Repair status"));
        prop_assert_eq!(counts.total(), rows.len());
    }

    #[test]
    fn priority_buckets_only_hold_known_levels(cells in prop::collection::vec(cell_strategy(), 0..40)) {
        let rows = records("Priority", cells);
        let buckets = aggregate_priority(&rows, Some("Priority"));
        prop_assert!(buckets.total() <= rows.len());
        prop_assert!(buckets.iter().all(|b| (1..=3).contains(&b.level)));
    }
}
