use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{
    CountryTiming, DayPart, DayPartShare, OptimalTiming, Record, TimingMetric, TimingOverview,
};
use crate::table::{sort_desc_by, Tally, TimingTable};

static CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*(am|pm)?").expect("clock pattern compiles")
});

/// Entries shown for best days and best time slots.
const OVERVIEW_WIDTH: usize = 2;

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

impl ClockTime {
    /// Canonical 12-hour token, e.g. `02:30 PM`.
    pub fn token(&self) -> String {
        let hour = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        let meridiem = if self.hour >= 12 { "PM" } else { "AM" };
        format!("{hour:02}:{:02} {meridiem}", self.minute)
    }

    pub fn day_part(&self) -> DayPart {
        DayPart::from_hour(self.hour)
    }
}

/// Finds the first `H:MM` (optionally followed by am/pm) in free text.
pub fn parse_clock(value: &str) -> Option<ClockTime> {
    let caps = CLOCK.captures(value)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;

    let meridiem = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());
    match meridiem.as_deref() {
        Some("pm") if hour != 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }

    (hour <= 23 && minute <= 59).then_some(ClockTime { hour, minute })
}

/// Weekday and clock time of a record that carries a usable date and time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub weekday: String,
    pub clock: ClockTime,
}

impl Slot {
    pub fn of(record: &Record) -> Option<Slot> {
        record.date.as_ref()?;
        let clock = parse_clock(record.time.as_deref()?)?;
        let moment = record
            .parsed_date?
            .and_hms_opt(clock.hour, clock.minute, 0)?;
        Some(Slot {
            weekday: moment.format("%A").to_string(),
            clock,
        })
    }
}

/// Per-country frequency tables for the three timing metrics.
#[derive(Debug, Clone, Default)]
pub struct TimingTables {
    pub webinars: TimingTable,
    pub registrations: TimingTable,
    pub attendees: TimingTable,
}

impl TimingTables {
    pub fn record(&mut self, country: &str, slot: &Slot, record: &Record) {
        let token = slot.clock.token();
        self.webinars.add(country, &slot.weekday, &token, 1.0);
        self.registrations
            .add(country, &slot.weekday, &token, record.registrations);
        self.attendees
            .add(country, &slot.weekday, &token, record.attendees);
    }

    pub fn optimal(&self) -> OptimalTiming {
        OptimalTiming {
            webinars: find_optimal_timing(&self.webinars, TimingMetric::Webinars),
            registrations: find_optimal_timing(&self.registrations, TimingMetric::Registrations),
            attendees: find_optimal_timing(&self.attendees, TimingMetric::Attendees),
        }
    }
}

/// Picks, for every country, the weekday/time cell with the largest value.
///
/// Only a strictly larger value replaces the current best, so the first cell
/// in table order wins a tie. A country whose cells are all zero reports
/// `N/A` with a value of 0. Rows are ordered by country name.
pub fn find_optimal_timing(table: &TimingTable, metric: TimingMetric) -> Vec<CountryTiming> {
    let mut rows: Vec<CountryTiming> = table
        .countries()
        .map(|country| {
            let mut best = CountryTiming {
                country: country.to_string(),
                best_day: NOT_AVAILABLE.to_string(),
                best_time: NOT_AVAILABLE.to_string(),
                metric_value: 0.0,
                metric,
            };
            for cell in table.cells(country) {
                if cell.value > best.metric_value {
                    best.metric_value = cell.value;
                    best.best_day = cell.weekday.to_string();
                    best.best_time = cell.time.to_string();
                }
            }
            best
        })
        .collect();

    rows.sort_by(|a, b| compare_names(&a.country, &b.country));
    rows
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Collects everything the timing views need in one pass over the rows.
#[derive(Debug, Clone, Default)]
pub struct TimingAccumulator {
    pub tables: TimingTables,
    days: Tally<usize>,
    slots: Tally<usize>,
    day_parts: Tally<usize>,
    timed: usize,
    skipped: usize,
    duration_sum: f64,
    duration_count: usize,
}

impl TimingAccumulator {
    pub fn observe(&mut self, record: &Record) {
        if let Some(duration) = record.total_duration {
            self.duration_sum += duration;
            self.duration_count += 1;
        }

        let Some(slot) = Slot::of(record) else {
            self.skipped += 1;
            return;
        };

        self.timed += 1;
        self.days.bump(&slot.weekday);
        self.slots.bump(&slot.clock.token());
        self.day_parts.bump(slot.clock.day_part().as_str());

        if let Some(country) = record.country.as_deref() {
            self.tables.record(country, &slot, record);
        }
    }

    /// Rows that contributed to the timing tables.
    pub fn timed(&self) -> usize {
        self.timed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn overview(&self) -> TimingOverview {
        let time_distribution = DayPart::ALL
            .iter()
            .map(|&period| {
                let count = self.day_parts.get(period.as_str()).copied().unwrap_or(0);
                let percentage = if self.timed > 0 {
                    (count as f64 / self.timed as f64 * 100.0).round()
                } else {
                    0.0
                };
                DayPartShare { period, percentage }
            })
            .collect();

        let average_duration = if self.duration_count > 0 {
            (self.duration_sum / self.duration_count as f64).round()
        } else {
            0.0
        };

        TimingOverview {
            best_days: top_keys(&self.days, OVERVIEW_WIDTH),
            best_time_slots: top_keys(&self.slots, OVERVIEW_WIDTH),
            average_duration,
            time_distribution,
        }
    }
}

fn top_keys(tally: &Tally<usize>, width: usize) -> Vec<String> {
    let mut entries: Vec<(&str, usize)> = tally.iter().map(|(k, v)| (k, *v)).collect();
    sort_desc_by(&mut entries, |e| e.1 as f64);
    entries
        .into_iter()
        .take(width)
        .map(|(k, _)| k.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timed_record(country: &str, date: (i32, u32, u32), time: &str, reg: f64, att: f64) -> Record {
        let parsed = NaiveDate::from_ymd_opt(date.0, date.1, date.2);
        Record {
            date: parsed.map(|d| d.to_string()),
            parsed_date: parsed,
            time: Some(time.to_string()),
            country: Some(country.to_string()),
            registrations: reg,
            attendees: att,
            ..Record::default()
        }
    }

    #[test]
    fn parses_clock_variants() {
        let cases = [
            ("10:00am", Some((10, 0))),
            ("3:00 PM", Some((15, 0))),
            ("12:15am", Some((0, 15))),
            ("12:30pm", Some((12, 30))),
            ("14:05", Some((14, 5))),
            ("around 9:30 pm MYT", Some((21, 30))),
            ("13:00pm", None),
            ("25:00", None),
            ("9am", None),
            ("", None),
        ];
        for (input, expected) in cases {
            let parsed = parse_clock(input).map(|c| (c.hour, c.minute));
            assert_eq!(parsed, expected, "{input:?}");
        }
    }

    #[test]
    fn tokens_use_twelve_hour_clock() {
        assert_eq!(ClockTime { hour: 0, minute: 15 }.token(), "12:15 AM");
        assert_eq!(ClockTime { hour: 14, minute: 5 }.token(), "02:05 PM");
        assert_eq!(ClockTime { hour: 12, minute: 0 }.token(), "12:00 PM");
        assert_eq!(ClockTime { hour: 9, minute: 30 }.token(), "09:30 AM");
    }

    #[test]
    fn slot_needs_date_and_time() {
        let record = timed_record("India", (2024, 1, 1), "10:00am", 1.0, 1.0);
        let slot = Slot::of(&record).expect("slot");
        assert_eq!(slot.weekday, "Monday");
        assert_eq!(slot.clock.token(), "10:00 AM");

        let mut no_time = record.clone();
        no_time.time = None;
        assert_eq!(Slot::of(&no_time), None);

        let mut bad_date = record.clone();
        bad_date.date = Some("soon".to_string());
        bad_date.parsed_date = None;
        assert_eq!(Slot::of(&bad_date), None);
    }

    #[test]
    fn ties_go_to_the_first_cell() {
        let mut table = TimingTable::new();
        table.add("India", "Tuesday", "09:00 AM", 2.0);
        table.add("India", "Monday", "10:00 AM", 2.0);
        table.add("India", "Monday", "11:00 AM", 1.0);

        let rows = find_optimal_timing(&table, TimingMetric::Webinars);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].best_day, "Tuesday");
        assert_eq!(rows[0].best_time, "09:00 AM");
        assert_eq!(rows[0].metric_value, 2.0);
    }

    #[test]
    fn zero_valued_countries_report_not_available() {
        let mut table = TimingTable::new();
        table.add("Kenya", "Friday", "10:00 AM", 0.0);
        table.add("brazil", "Monday", "10:00 AM", 5.0);
        table.add("India", "Monday", "10:00 AM", 5.0);

        let rows = find_optimal_timing(&table, TimingMetric::Registrations);
        let countries: Vec<&str> = rows.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(countries, vec!["brazil", "India", "Kenya"]);
        assert_eq!(rows[2].best_day, NOT_AVAILABLE);
        assert_eq!(rows[2].best_time, NOT_AVAILABLE);
        assert_eq!(rows[2].metric_value, 0.0);
        assert_eq!(rows[2].metric, TimingMetric::Registrations);
    }

    #[test]
    fn metrics_pick_their_own_winners() {
        let mut acc = TimingAccumulator::default();
        acc.observe(&timed_record("India", (2024, 1, 1), "10:00am", 10.0, 2.0));
        acc.observe(&timed_record("India", (2024, 1, 1), "10:00am", 10.0, 2.0));
        acc.observe(&timed_record("India", (2024, 1, 2), "3:00pm", 50.0, 40.0));

        let optimal = acc.tables.optimal();
        assert_eq!(optimal.webinars[0].best_day, "Monday");
        assert_eq!(optimal.webinars[0].metric_value, 2.0);
        assert_eq!(optimal.registrations[0].best_time, "03:00 PM");
        assert_eq!(optimal.attendees[0].metric_value, 40.0);
    }

    #[test]
    fn overview_ranks_days_and_slots() {
        let mut acc = TimingAccumulator::default();
        acc.observe(&timed_record("India", (2024, 1, 2), "3:00pm", 1.0, 1.0));
        acc.observe(&timed_record("Kenya", (2024, 1, 1), "10:00am", 1.0, 1.0));
        acc.observe(&timed_record("Kenya", (2024, 1, 1), "10:00am", 1.0, 1.0));
        acc.observe(&timed_record("Kenya", (2024, 1, 3), "11:30pm", 1.0, 1.0));
        let mut untimed = timed_record("Kenya", (2024, 1, 3), "", 1.0, 1.0);
        untimed.total_duration = Some(61.0);
        acc.observe(&untimed);
        let mut timed_with_duration = timed_record("Kenya", (2024, 1, 4), "8:00", 1.0, 1.0);
        timed_with_duration.total_duration = Some(30.0);
        acc.observe(&timed_with_duration);

        assert_eq!(acc.timed(), 5);
        assert_eq!(acc.skipped(), 1);

        let overview = acc.overview();
        assert_eq!(overview.best_days, vec!["Monday", "Tuesday"]);
        assert_eq!(overview.best_time_slots, vec!["10:00 AM", "03:00 PM"]);
        assert_eq!(overview.average_duration, 46.0);

        let shares: Vec<(DayPart, f64)> = overview
            .time_distribution
            .iter()
            .map(|s| (s.period, s.percentage))
            .collect();
        assert_eq!(
            shares,
            vec![
                (DayPart::Morning, 60.0),
                (DayPart::Afternoon, 20.0),
                (DayPart::Evening, 0.0),
                (DayPart::Night, 20.0),
            ]
        );
    }

    #[test]
    fn empty_overview_is_zeroed() {
        let overview = TimingAccumulator::default().overview();
        assert!(overview.best_days.is_empty());
        assert!(overview.best_time_slots.is_empty());
        assert_eq!(overview.average_duration, 0.0);
        assert!(overview.time_distribution.iter().all(|s| s.percentage == 0.0));
    }
}
