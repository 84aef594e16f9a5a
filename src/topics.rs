use tracing::debug;

use crate::aggregate::round_to;
use crate::models::{Record, Tier, TopicPerformanceEntry, TopicTiers};
use crate::table::{sort_asc_by, sort_desc_by, Tally};

pub const STRONG_FACTOR: f64 = 1.15;
pub const POOR_FACTOR: f64 = 0.85;

/// Running per-topic sums shared by the aggregation views and the tiering.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TopicTotals {
    pub registrations: f64,
    pub attendees: f64,
    pub avg_time_sum: f64,
    pub avg_time_count: usize,
}

impl TopicTotals {
    pub fn observe(&mut self, record: &Record) {
        self.registrations += record.registrations;
        self.attendees += record.attendees;
        if let Some(time) = record.average_attendance_time {
            self.avg_time_sum += time;
            self.avg_time_count += 1;
        }
    }

    /// Attendees over registrations, percent.
    pub fn attendance_rate(&self) -> f64 {
        if self.registrations > 0.0 {
            self.attendees / self.registrations * 100.0
        } else {
            0.0
        }
    }

    /// Mean over rows that carry an average attendance time.
    pub fn mean_time(&self) -> f64 {
        if self.avg_time_count > 0 {
            self.avg_time_sum / self.avg_time_count as f64
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub strong_rate: f64,
    pub poor_rate: f64,
    pub strong_time: f64,
    pub poor_time: f64,
}

impl Thresholds {
    pub fn from_global(rate: f64, time: f64) -> Self {
        Self {
            strong_rate: rate * STRONG_FACTOR,
            poor_rate: rate * POOR_FACTOR,
            strong_time: time * STRONG_FACTOR,
            poor_time: time * POOR_FACTOR,
        }
    }

    /// Strong needs both metrics high; either metric low is enough for Poor.
    pub fn tier(&self, rate: f64, time: f64) -> Tier {
        if rate >= self.strong_rate && time >= self.strong_time {
            Tier::Strong
        } else if rate <= self.poor_rate || time <= self.poor_time {
            Tier::Poor
        } else {
            Tier::Average
        }
    }
}

pub fn classify_topics(records: &[Record]) -> TopicTiers {
    let mut global = TopicTotals::default();
    let mut topics = Tally::<TopicTotals>::new();

    for record in records {
        global.observe(record);
        if let Some(topic) = record.topic.as_deref() {
            topics.entry(topic).observe(record);
        }
    }

    let thresholds = Thresholds::from_global(global.attendance_rate(), global.mean_time());
    debug!(
        topics = topics.len(),
        strong_rate = thresholds.strong_rate,
        strong_time = thresholds.strong_time,
        "classifying topics"
    );

    let mut tiers = TopicTiers::default();
    for (name, totals) in topics.into_entries() {
        let rate = totals.attendance_rate();
        let time = totals.mean_time();
        let tier = thresholds.tier(rate, time);
        let entry = TopicPerformanceEntry {
            name,
            attendance_rate: round_to(rate, 1),
            avg_time: round_to(time, 0),
            tier,
        };
        match tier {
            Tier::Strong => tiers.strong.push(entry),
            Tier::Average => tiers.average.push(entry),
            Tier::Poor => tiers.poor.push(entry),
        }
    }

    sort_desc_by(&mut tiers.strong, |e| e.attendance_rate);
    sort_desc_by(&mut tiers.average, |e| e.attendance_rate);
    sort_asc_by(&mut tiers.poor, |e| e.attendance_rate);
    tiers
}
