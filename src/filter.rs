use tracing::debug;

use crate::models::{Dimension, FilterSpec, Record};

const DIMENSIONS: [Dimension; 3] = [Dimension::Location, Dimension::Language, Dimension::Topic];

/// Returns the records that pass every dimension and the date window, in input order.
pub fn apply_filter(records: &[Record], spec: &FilterSpec) -> Vec<Record> {
    let filtered: Vec<Record> = records
        .iter()
        .filter(|record| matches(record, spec))
        .cloned()
        .collect();
    debug!(
        input = records.len(),
        kept = filtered.len(),
        "applied filter"
    );
    filtered
}

pub fn matches(record: &Record, spec: &FilterSpec) -> bool {
    DIMENSIONS
        .iter()
        .all(|&d| spec.selection(d).admits(d, d.value_of(record)))
        && within_dates(record, spec)
}

/// Rows without a parseable date fail whenever either bound is set.
fn within_dates(record: &Record, spec: &FilterSpec) -> bool {
    if !spec.has_date_bounds() {
        return true;
    }
    let Some(moment) = record.parsed_date.and_then(|d| d.and_hms_opt(0, 0, 0)) else {
        return false;
    };

    if let Some(start) = spec.start_date {
        let start_of_day = start.and_hms_opt(0, 0, 0);
        if start_of_day.is_some_and(|limit| moment < limit) {
            return false;
        }
    }
    if let Some(end) = spec.end_date {
        let end_of_day = end.and_hms_milli_opt(23, 59, 59, 999);
        if end_of_day.is_some_and(|limit| moment > limit) {
            return false;
        }
    }
    true
}
