use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::columns::{Role, resolve};
use crate::record::{CellValue, FleetRecord, RecordSet};

/// Number of status tiles on the overview
pub const DISPLAY_SLOTS: usize = 5;

/// Label used for absent statuses and for unfilled display slots
pub const OTHER: &str = "Other";

/// Status categories that take the first display slots when present, in order
pub const PREFERRED_CATEGORIES: [&str; 5] = [
    "New",
    "New - vetted",
    "Inspected - monitoring",
    "Awaiting material",
    "Offline- pending vetting",
];

/// Priority levels that get their own bucket
pub const PRIORITY_LEVELS: [i64; 3] = [1, 2, 3];

const FALLBACK_COLOR: &str = "#666666";

// Colours for statuses outside the preferred list, assigned by rank
const EXTRA_PALETTE: [&str; 6] = [
    "#A78BFA", "#F472B6", "#2DD4BF", "#FB923C", "#94A3B8", "#C084FC",
];

lazy_static! {
    static ref STATUS_COLORS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("New", "#FF6B6B");
        m.insert("New - vetted", "#FFA751");
        m.insert("Inspected - monitoring", "#FFD93D");
        m.insert("Awaiting material", "#4DA3FF");
        m.insert("Offline- pending vetting", "#43E97B");
        m.insert(OTHER, "#888888");
        m
    };
}

/// Tile colour for a preferred category, or the neutral fallback
pub fn status_color(label: &str) -> &'static str {
    STATUS_COLORS.get(label).copied().unwrap_or(FALLBACK_COLOR)
}

/// Colour for a status at `rank` in the ranked counts, used by the chart
/// and its legend
pub fn chart_color(label: &str, rank: usize) -> &'static str {
    STATUS_COLORS
        .get(label)
        .copied()
        .unwrap_or(EXTRA_PALETTE[rank % EXTRA_PALETTE.len()])
}

/// Normalize a raw status cell
///
/// Absent values become `"Other"`, everything else is rendered as text and
/// trimmed.
///
/// # Examples
/// ```
/// use fleet_dashboard::record::CellValue;
/// use fleet_dashboard::summary::normalize;
///
/// assert_eq!(normalize(&CellValue::Text(" New ".into())), "New");
/// assert_eq!(normalize(&CellValue::Null), "Other");
/// assert_eq!(normalize(&CellValue::Integer(3)), "3");
/// ```
pub fn normalize(raw: &CellValue) -> String {
    match raw {
        CellValue::Null => OTHER.to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Coerce a priority cell to an integer level
///
/// Integers pass through, reals are truncated toward zero and text is parsed
/// after trimming. Anything unparseable counts as 0.
pub fn priority_level(raw: &CellValue) -> i64 {
    match raw {
        CellValue::Integer(n) => *n,
        CellValue::Real(f) if f.is_finite() => f.trunc() as i64,
        CellValue::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Count of normalized status values across a record snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    counts: BTreeMap<String, usize>,
}

/// One ranked entry of [`StatusCounts`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

impl StatusCounts {
    pub fn get(&self, status: &str) -> usize {
        self.counts.get(status).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn as_map(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    /// Entries by descending count, ties broken by ascending label
    pub fn ranked(&self) -> Vec<StatusCount> {
        let mut ranked: Vec<StatusCount> = self
            .counts
            .iter()
            .map(|(status, count)| StatusCount {
                status: status.clone(),
                count: *count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));
        ranked
    }
}

impl FromIterator<(String, usize)> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        let mut counts = BTreeMap::new();
        for (status, count) in iter {
            *counts.entry(status).or_insert(0) += count;
        }
        StatusCounts { counts }
    }
}

/// Count normalized statuses in `status_column`
///
/// An unresolved column (`None`) yields empty counts.
pub fn aggregate_status(records: &[FleetRecord], status_column: Option<&str>) -> StatusCounts {
    let Some(column) = status_column else {
        return StatusCounts::default();
    };
    records
        .iter()
        .map(|r| (normalize(r.get(column)), 1))
        .collect()
}

/// Build the five overview tile labels from ranked counts
///
/// Preferred categories present in the data come first in their fixed order,
/// then the remaining categories in the order given, and any slot still empty
/// is filled with `"Other"`.
///
/// # Examples
/// ```
/// use fleet_dashboard::summary::{StatusCount, build_display_categories};
///
/// let ranked = vec![
///     StatusCount { status: "Scrapped".into(), count: 9 },
///     StatusCount { status: "New".into(), count: 2 },
/// ];
/// assert_eq!(
///     build_display_categories(&ranked),
///     ["New", "Scrapped", "Other", "Other", "Other"].map(String::from)
/// );
/// ```
pub fn build_display_categories(ranked: &[StatusCount]) -> [String; DISPLAY_SLOTS] {
    let mut display: Vec<&str> = Vec::with_capacity(DISPLAY_SLOTS);

    for preferred in PREFERRED_CATEGORIES {
        if ranked.iter().any(|c| c.status == preferred) {
            display.push(preferred);
        }
    }
    for entry in ranked {
        if display.len() >= DISPLAY_SLOTS {
            break;
        }
        if !display.contains(&entry.status.as_str()) {
            display.push(&entry.status);
        }
    }

    std::array::from_fn(|slot| display.get(slot).copied().unwrap_or(OTHER).to_string())
}

/// Row counts for priority levels 1, 2 and 3
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityBuckets {
    counts: [usize; PRIORITY_LEVELS.len()],
}

/// One bucket of [`PriorityBuckets`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriorityBucket {
    pub level: i64,
    pub count: usize,
}

impl PriorityBuckets {
    /// Count for `level`; 0 for any level outside 1..=3
    pub fn count(&self, level: i64) -> usize {
        PRIORITY_LEVELS
            .iter()
            .position(|l| *l == level)
            .map(|i| self.counts[i])
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = PriorityBucket> + '_ {
        PRIORITY_LEVELS
            .iter()
            .zip(self.counts.iter())
            .map(|(level, count)| PriorityBucket {
                level: *level,
                count: *count,
            })
    }

    /// Non-empty buckets keyed by level
    pub fn as_map(&self) -> BTreeMap<i64, usize> {
        self.iter()
            .filter(|b| b.count > 0)
            .map(|b| (b.level, b.count))
            .collect()
    }
}

impl Serialize for PriorityBuckets {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Bucket the priority column into levels 1, 2 and 3
///
/// Values outside those levels, including absent or malformed ones, are
/// dropped. An unresolved column yields empty buckets.
pub fn aggregate_priority(records: &[FleetRecord], priority_column: Option<&str>) -> PriorityBuckets {
    let mut buckets = PriorityBuckets::default();
    let Some(column) = priority_column else {
        return buckets;
    };
    for record in records {
        let level = priority_level(record.get(column));
        if let Some(i) = PRIORITY_LEVELS.iter().position(|l| *l == level) {
            buckets.counts[i] += 1;
        }
    }
    buckets
}

/// One overview tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTile {
    pub label: String,
    pub count: usize,
    pub color: &'static str,
}

/// One slice of the status distribution chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSlice {
    pub status: String,
    pub count: usize,
    pub color: &'static str,
}

/// Everything the overview shows, computed from one snapshot of the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewSummary {
    pub total_records: usize,
    pub status_column: Option<&'static str>,
    pub priority_column: Option<&'static str>,
    pub status_counts: Vec<StatusCount>,
    pub tiles: Vec<StatusTile>,
    pub slices: Vec<ChartSlice>,
    pub priority: PriorityBuckets,
}

impl OverviewSummary {
    pub fn missing_roles(&self) -> Vec<Role> {
        let mut missing = Vec::new();
        if self.status_column.is_none() {
            missing.push(Role::Status);
        }
        if self.priority_column.is_none() {
            missing.push(Role::Priority);
        }
        missing
    }
}

/// Resolve columns and aggregate a full record set for one render
pub fn summarize(set: &RecordSet) -> OverviewSummary {
    let status_column = resolve(&set.columns, Role::Status);
    let priority_column = resolve(&set.columns, Role::Priority);

    let counts = aggregate_status(&set.records, status_column);
    let ranked = counts.ranked();
    let tiles = if status_column.is_some() {
        build_display_categories(&ranked)
            .into_iter()
            .map(|label| StatusTile {
                count: counts.get(&label),
                color: status_color(&label),
                label,
            })
            .collect()
    } else {
        Vec::new()
    };
    let slices = ranked
        .iter()
        .enumerate()
        .map(|(rank, c)| ChartSlice {
            status: c.status.clone(),
            count: c.count,
            color: chart_color(&c.status, rank),
        })
        .collect();

    OverviewSummary {
        total_records: set.len(),
        status_column,
        priority_column,
        status_counts: ranked,
        tiles,
        slices,
        priority: aggregate_priority(&set.records, priority_column),
    }
}
