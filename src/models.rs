use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// Header names recognized by the ingestion step.
pub mod columns {
    pub const DATE: &str = "Date";
    pub const TIME: &str = "Time (MYT)";
    pub const COUNTRIES: &str = "Countries";
    pub const LANGUAGES: &str = "Languages";
    pub const TOPICS: &str = "Webinar Topics";
    pub const REGISTRATIONS: &str = "No. of registrations";
    pub const ATTENDEES: &str = "No. of attendees";
    pub const AVERAGE_ATTENDANCE_TIME: &str = "Average attendance time";
    pub const MEDIAN_ATTENDANCE: &str = "Median attendance";
    pub const TOTAL_DURATION: &str = "Total Duration";
    pub const EMAILS: &str = "No. of emails";

    /// Metric columns whose empty cells read as zero.
    pub const ZERO_WHEN_EMPTY: [&str; 6] = [
        EMAILS,
        REGISTRATIONS,
        ATTENDEES,
        TOTAL_DURATION,
        AVERAGE_ATTENDANCE_TIME,
        MEDIAN_ATTENDANCE,
    ];
}

/// A typed cell for columns that have no dedicated field on [`Record`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

/// One normalized webinar row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// Cleaned date text when it parsed, otherwise the raw cell.
    pub date: Option<String>,
    pub parsed_date: Option<NaiveDate>,
    pub time: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub topic: Option<String>,
    pub registrations: f64,
    pub attendees: f64,
    /// `None` when the column is missing or the cell is not numeric.
    pub average_attendance_time: Option<f64>,
    pub median_attendance: f64,
    pub total_duration: Option<f64>,
    pub emails_sent: Option<f64>,
    pub extra: BTreeMap<String, Cell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Location,
    Language,
    Topic,
}

impl Dimension {
    /// Selection value meaning "no restriction" for this dimension.
    pub fn sentinel(&self) -> &'static str {
        match self {
            Dimension::Location => "All Locations",
            Dimension::Language => "All Languages",
            Dimension::Topic => "All Webinars",
        }
    }

    pub fn value_of<'a>(&self, record: &'a Record) -> Option<&'a str> {
        match self {
            Dimension::Location => record.country.as_deref(),
            Dimension::Language => record.language.as_deref(),
            Dimension::Topic => record.topic.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    values: Vec<String>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Empty selections behave exactly like the sentinel.
    pub fn is_all(&self, dimension: Dimension) -> bool {
        self.values.is_empty() || self.values.iter().any(|v| v == dimension.sentinel())
    }

    pub fn admits(&self, dimension: Dimension, value: Option<&str>) -> bool {
        if self.is_all(dimension) {
            return true;
        }
        match value {
            Some(value) => self.values.iter().any(|v| v == value),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub locations: Selection,
    pub languages: Selection,
    pub topics: Selection,
    pub start_date: Option<NaiveDate>,
    /// Inclusive through the end of this day.
    pub end_date: Option<NaiveDate>,
}

impl FilterSpec {
    pub fn selection(&self, dimension: Dimension) -> &Selection {
        match dimension {
            Dimension::Location => &self.locations,
            Dimension::Language => &self.languages,
            Dimension::Topic => &self.topics,
        }
    }

    pub fn has_date_bounds(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Region {
    Africa,
    Latam,
    Asia,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Africa, Region::Latam, Region::Asia];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Africa => "Africa",
            Region::Latam => "Latam",
            Region::Asia => "Asia",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_webinars: usize,
    pub total_registrations: f64,
    pub total_attendees: f64,
    /// Attendees over registrations, percent, two decimals.
    pub attendees_rate: f64,
    pub avg_attendance_time: f64,
    pub median_attendance_time: f64,
    /// Mean over the displayed Top-21 topics only.
    pub overall_avg_session_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicAttendance {
    pub name: String,
    pub attendees: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicAvgTime {
    pub name: String,
    pub avg_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionShare {
    pub name: Region,
    pub value: usize,
    pub attendees: f64,
    pub avg_retention: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTotals {
    pub name: String,
    pub webinars: usize,
    pub attendees: f64,
    pub avg_retention: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownEntry {
    pub name: String,
    pub webinars: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalAnalysis {
    pub region: Region,
    pub average_attendance: f64,
    pub top_performing_sub_region: String,
    pub popular_topics: Vec<String>,
    pub languages: Vec<String>,
    pub breakdown: Vec<BreakdownEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageShare {
    pub language: String,
    pub webinars: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionLanguages {
    pub region: Region,
    pub languages: Vec<LanguageShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPerforming {
    /// Topics by attendee rate, percent.
    pub highest_attendance: Vec<RankedEntry>,
    /// Topics by mean average-attendance time, minutes.
    pub best_engagement: Vec<RankedEntry>,
    /// Languages by webinar count.
    pub popular_languages: Vec<RankedEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DayPart {
    pub const ALL: [DayPart; 4] = [
        DayPart::Morning,
        DayPart::Afternoon,
        DayPart::Evening,
        DayPart::Night,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayPart::Morning => "Morning",
            DayPart::Afternoon => "Afternoon",
            DayPart::Evening => "Evening",
            DayPart::Night => "Night",
        }
    }

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => DayPart::Morning,
            12..=16 => DayPart::Afternoon,
            17..=20 => DayPart::Evening,
            _ => DayPart::Night,
        }
    }
}

impl fmt::Display for DayPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayPartShare {
    pub period: DayPart,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingOverview {
    pub best_days: Vec<String>,
    pub best_time_slots: Vec<String>,
    pub average_duration: f64,
    pub time_distribution: Vec<DayPartShare>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimingMetric {
    Webinars,
    Registrations,
    Attendees,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryTiming {
    pub country: String,
    pub best_day: String,
    pub best_time: String,
    pub metric_value: f64,
    pub metric: TimingMetric,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptimalTiming {
    pub webinars: Vec<CountryTiming>,
    pub registrations: Vec<CountryTiming>,
    pub attendees: Vec<CountryTiming>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendBucket {
    pub name: String,
    /// Mean attendees per webinar in the bucket.
    pub attendance_rate: f64,
    /// Attendees over registrations, percent.
    pub registration_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    pub month: Vec<TrendBucket>,
    pub day_of_week: Vec<TrendBucket>,
    pub topic: Vec<TrendBucket>,
    pub country: Vec<TrendBucket>,
    pub language: Vec<TrendBucket>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tier {
    Strong,
    Average,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPerformanceEntry {
    pub name: String,
    pub attendance_rate: f64,
    pub avg_time: f64,
    pub tier: Tier,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopicTiers {
    pub strong: Vec<TopicPerformanceEntry>,
    pub average: Vec<TopicPerformanceEntry>,
    pub poor: Vec<TopicPerformanceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisScale {
    pub domain: [f64; 2],
    pub ticks: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Axes {
    pub emails: AxisScale,
    pub topic_counts: AxisScale,
    pub topic_attendees: AxisScale,
}

/// Everything derived from one filtered record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub kpis: Kpis,
    pub webinars_by_language: Vec<NamedCount>,
    pub webinars_by_country: Vec<NamedCount>,
    pub webinars_by_topic: Vec<NamedCount>,
    pub attendance_by_topic: Vec<TopicAttendance>,
    pub avg_time_by_topic: Vec<TopicAvgTime>,
    pub webinars_by_region: Vec<RegionShare>,
    pub webinars_by_country_group: Vec<GroupTotals>,
    pub regional_analysis: Vec<RegionalAnalysis>,
    pub language_distribution: Vec<RegionLanguages>,
    pub top_performing: TopPerforming,
    pub timing_overview: TimingOverview,
    pub optimal_timing: OptimalTiming,
    pub trends: Trends,
    pub topic_performance: TopicTiers,
    pub axes: Axes,
}

impl Summary {
    pub fn regional(&self, region: Region) -> Option<&RegionalAnalysis> {
        self.regional_analysis.iter().find(|r| r.region == region)
    }
}
