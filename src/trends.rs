use chrono::Datelike;

use crate::aggregate::round_to;
use crate::models::{Record, TrendBucket, Trends};
use crate::table::{sort_desc_by, Tally};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, Copy, Default)]
struct BucketTotals {
    registrations: f64,
    attendees: f64,
    count: usize,
}

impl BucketTotals {
    fn observe(&mut self, record: &Record) {
        self.registrations += record.registrations;
        self.attendees += record.attendees;
        self.count += 1;
    }
}

/// Buckets rows by month, weekday, topic, country and language.
///
/// Each dimension is computed over the full row set. Month and weekday
/// buckets follow the calendar; the rest are ordered by attendance rate,
/// highest first.
pub fn analyze(records: &[Record]) -> Trends {
    let mut month = Tally::<BucketTotals>::new();
    let mut day_of_week = Tally::<BucketTotals>::new();
    let mut topic = Tally::<BucketTotals>::new();
    let mut country = Tally::<BucketTotals>::new();
    let mut language = Tally::<BucketTotals>::new();

    for record in records {
        if let Some(date) = record.parsed_date {
            month.entry(MONTHS[date.month0() as usize]).observe(record);
            day_of_week
                .entry(WEEKDAYS[date.weekday().num_days_from_sunday() as usize])
                .observe(record);
        }
        if let Some(name) = record.topic.as_deref() {
            topic.entry(name).observe(record);
        }
        if let Some(name) = record.country.as_deref() {
            country.entry(name).observe(record);
        }
        if let Some(name) = record.language.as_deref() {
            language.entry(name).observe(record);
        }
    }

    Trends {
        month: finish(month, Some(&MONTHS)),
        day_of_week: finish(day_of_week, Some(&WEEKDAYS)),
        topic: finish(topic, None),
        country: finish(country, None),
        language: finish(language, None),
    }
}

fn finish(tally: Tally<BucketTotals>, canonical: Option<&[&str]>) -> Vec<TrendBucket> {
    let mut buckets: Vec<TrendBucket> = tally
        .into_entries()
        .into_iter()
        .map(|(name, totals)| {
            let attendance_rate = if totals.count > 0 {
                totals.attendees / totals.count as f64
            } else {
                0.0
            };
            let registration_rate = if totals.registrations > 0.0 {
                totals.attendees / totals.registrations * 100.0
            } else {
                0.0
            };
            TrendBucket {
                name,
                attendance_rate: round_to(attendance_rate, 2),
                registration_rate: round_to(registration_rate, 2),
            }
        })
        .collect();

    match canonical {
        Some(order) => buckets.sort_by_key(|b| order.iter().position(|name| *name == b.name)),
        None => sort_desc_by(&mut buckets, |b| b.attendance_rate),
    }
    buckets
}
