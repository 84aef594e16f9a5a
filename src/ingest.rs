use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::models::{columns, Cell, Record};

static ORDINAL_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(st|nd|rd|th)").expect("ordinal pattern compiles"));

/// Date shapes accepted for the `Date` column, tried in order.
const DATE_FORMATS: [&str; 15] = [
    "%B %d, %Y",
    "%B %d %Y",
    "%A, %B %d, %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%a, %b %d, %Y",
    "%a %b %d %Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %b %Y",
    "%d %b, %Y",
    "%d-%b-%Y",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRow {
    pub line_number: usize,
    pub expected: usize,
    pub found: usize,
}

/// Distinct values offered by the filter controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub locations: Vec<String>,
    pub languages: Vec<String>,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    pub dropped: Vec<DroppedRow>,
    pub options: FilterOptions,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn read_csv(path: &Path) -> Result<Dataset, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = text.len(), "read upload");
    parse_text(&text)
}

/// Parses an uploaded export into normalized records.
///
/// The first non-blank line is the header. Rows whose field count differs
/// from the header are dropped and reported in [`Dataset::dropped`]; they never
/// abort the parse.
pub fn parse_text(text: &str) -> Result<Dataset, IngestError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines: Vec<(usize, &str)> = text
        .split('\n')
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    let Some((&(_, header_line), rows)) = lines.split_first() else {
        return Err(IngestError::EmptyInput);
    };

    let headers = split_line(header_line);
    let mut records = Vec::with_capacity(rows.len());
    let mut dropped = Vec::new();

    for &(index, line) in rows {
        let fields = split_line(line);
        if fields.len() != headers.len() {
            warn!(
                line = index + 1,
                expected = headers.len(),
                found = fields.len(),
                "skipping malformed row"
            );
            dropped.push(DroppedRow {
                line_number: index + 1,
                expected: headers.len(),
                found: fields.len(),
            });
            continue;
        }
        records.push(normalize_row(&headers, fields));
    }

    let options = collect_options(&records);
    info!(
        rows = records.len(),
        dropped = dropped.len(),
        columns = headers.len(),
        "parsed upload"
    );

    Ok(Dataset {
        headers,
        records,
        dropped,
        options,
    })
}

/// Splits one line on commas outside double quotes.
///
/// Every `"` toggles quoted mode and is consumed; there is no escaped-quote
/// form. Fields are trimmed.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut in_quote = false;
    let mut current = String::new();

    for ch in line.chars() {
        match ch {
            '"' => in_quote = !in_quote,
            ',' if !in_quote => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Drops one trailing comma and ordinal suffixes (`1st` -> `1`).
pub fn clean_date(value: &str) -> String {
    let value = value.strip_suffix(',').unwrap_or(value);
    ORDINAL_SUFFIX.replace_all(value, "${1}").into_owned()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

pub fn parse_number(value: &str) -> Option<f64> {
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn coerce(header: &str, value: &str) -> Cell {
    if let Some(number) = parse_number(value) {
        return Cell::Number(number);
    }
    if value.is_empty() && columns::ZERO_WHEN_EMPTY.contains(&header) {
        return Cell::Number(0.0);
    }
    Cell::Text(value.to_string())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn number_or_zero(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) => *n,
        Cell::Text(_) => 0.0,
    }
}

fn number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(_) => None,
    }
}

fn normalize_row(headers: &[String], fields: Vec<String>) -> Record {
    let mut record = Record::default();

    for (header, value) in headers.iter().zip(fields) {
        match header.as_str() {
            columns::DATE => {
                let cleaned = clean_date(&value);
                match parse_date(&cleaned) {
                    Some(date) => {
                        record.date = Some(cleaned);
                        record.parsed_date = Some(date);
                    }
                    None => record.date = non_empty(value),
                }
            }
            columns::TIME => record.time = non_empty(value),
            columns::COUNTRIES => record.country = non_empty(value),
            columns::LANGUAGES => record.language = non_empty(value),
            columns::TOPICS => record.topic = non_empty(value),
            other => {
                let cell = coerce(other, &value);
                match other {
                    columns::REGISTRATIONS => record.registrations = number_or_zero(&cell),
                    columns::ATTENDEES => record.attendees = number_or_zero(&cell),
                    columns::MEDIAN_ATTENDANCE => record.median_attendance = number_or_zero(&cell),
                    columns::AVERAGE_ATTENDANCE_TIME => {
                        record.average_attendance_time = number(&cell)
                    }
                    columns::TOTAL_DURATION => record.total_duration = number(&cell),
                    columns::EMAILS => record.emails_sent = number(&cell),
                    _ => {
                        record.extra.insert(other.to_string(), cell);
                    }
                }
            }
        }
    }

    record
}

fn collect_options(records: &[Record]) -> FilterOptions {
    let mut locations = BTreeSet::new();
    let mut languages = BTreeSet::new();
    let mut topics = BTreeSet::new();

    for record in records {
        if let Some(country) = &record.country {
            locations.insert(country.clone());
        }
        if let Some(language) = &record.language {
            languages.insert(language.clone());
        }
        if let Some(topic) = &record.topic {
            topics.insert(topic.clone());
        }
    }

    FilterOptions {
        locations: locations.into_iter().collect(),
        languages: languages.into_iter().collect(),
        topics: topics.into_iter().collect(),
    }
}
