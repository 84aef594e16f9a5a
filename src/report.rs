use std::fmt::Write;

use crate::models::{
    CountryTiming, Dimension, FilterSpec, RankedEntry, Summary, TopicPerformanceEntry,
};
use crate::timing::NOT_AVAILABLE;

/// Rows shown per optimal-timing table.
const TIMING_ROWS: usize = 10;

pub fn rate_card(entries: &[RankedEntry]) -> Vec<String> {
    card(entries, |e| format!("{} ({:.1}%)", e.name, e.value))
}

pub fn engagement_card(entries: &[RankedEntry]) -> Vec<String> {
    card(entries, |e| format!("{} ({} min)", e.name, e.value))
}

pub fn language_card(entries: &[RankedEntry]) -> Vec<String> {
    card(entries, |e| format!("{} ({} webinars)", e.name, e.value))
}

fn card<F>(entries: &[RankedEntry], render: F) -> Vec<String>
where
    F: Fn(&RankedEntry) -> String,
{
    if entries.is_empty() {
        return vec![NOT_AVAILABLE.to_string()];
    }
    entries.iter().map(render).collect()
}

fn joined_or_na(values: &[String]) -> String {
    if values.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        values.join(", ")
    }
}

pub fn describe_filter(filter: &FilterSpec) -> String {
    let mut parts = Vec::new();
    for dimension in [Dimension::Location, Dimension::Language, Dimension::Topic] {
        let selection = filter.selection(dimension);
        if selection.is_all(dimension) {
            parts.push(dimension.sentinel().to_string());
        } else {
            parts.push(selection.values().join(" / "));
        }
    }
    match (filter.start_date, filter.end_date) {
        (Some(start), Some(end)) => parts.push(format!("{start} to {end}")),
        (Some(start), None) => parts.push(format!("from {start}")),
        (None, Some(end)) => parts.push(format!("until {end}")),
        (None, None) => {}
    }
    parts.join(", ")
}

pub fn build_report(summary: &Summary, filter: &FilterSpec, dropped_rows: usize) -> String {
    let mut output = String::new();
    let kpis = &summary.kpis;

    let _ = writeln!(output, "# Webinar Performance Report");
    let _ = writeln!(output, "Filters: {}", describe_filter(filter));
    if dropped_rows > 0 {
        let _ = writeln!(output, "Skipped {dropped_rows} malformed rows during import.");
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## Key Metrics");
    let _ = writeln!(output, "- Total webinars: {}", kpis.total_webinars);
    let _ = writeln!(output, "- Total registrations: {}", kpis.total_registrations);
    let _ = writeln!(output, "- Total attendees: {}", kpis.total_attendees);
    let _ = writeln!(output, "- Attendee rate: {:.2}%", kpis.attendees_rate);
    let _ = writeln!(
        output,
        "- Average attendance time: {} min",
        kpis.avg_attendance_time
    );
    let _ = writeln!(
        output,
        "- Median attendance time: {} min",
        kpis.median_attendance_time
    );
    let _ = writeln!(
        output,
        "- Average session length: {} min",
        kpis.overall_avg_session_length
    );

    if kpis.total_webinars == 0 {
        let _ = writeln!(output);
        let _ = writeln!(output, "No webinars match the current filters.");
        return output;
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performing");
    let top = &summary.top_performing;
    let _ = writeln!(
        output,
        "- Highest attendance: {}",
        rate_card(&top.highest_attendance).join(", ")
    );
    let _ = writeln!(
        output,
        "- Best engagement: {}",
        engagement_card(&top.best_engagement).join(", ")
    );
    let _ = writeln!(
        output,
        "- Popular languages: {}",
        language_card(&top.popular_languages).join(", ")
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Topics");
    for topic in summary.webinars_by_topic.iter() {
        let _ = writeln!(output, "- {}: {} webinars", topic.name, topic.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Regions");
    for share in summary.webinars_by_region.iter() {
        let _ = writeln!(
            output,
            "- {}: {} webinars ({}%), {} attendees, {} min avg retention",
            share.name, share.value, share.percentage, share.attendees, share.avg_retention
        );
    }
    for regional in summary.regional_analysis.iter() {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {}", regional.region);
        let _ = writeln!(
            output,
            "- Average attendance: {}",
            regional.average_attendance
        );
        let _ = writeln!(
            output,
            "- Top performing sub-region: {}",
            regional.top_performing_sub_region
        );
        let _ = writeln!(
            output,
            "- Popular topics: {}",
            joined_or_na(&regional.popular_topics)
        );
        let _ = writeln!(output, "- Languages: {}", joined_or_na(&regional.languages));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Languages by Region");
    for region in summary.language_distribution.iter() {
        let languages: Vec<String> = region
            .languages
            .iter()
            .map(|l| format!("{} ({} webinars)", l.language, l.webinars))
            .collect();
        let _ = writeln!(output, "- {}: {}", region.region, joined_or_na(&languages));
    }

    let timing = &summary.timing_overview;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Timing");
    let _ = writeln!(output, "- Best days: {}", joined_or_na(&timing.best_days));
    let _ = writeln!(
        output,
        "- Best time slots: {}",
        joined_or_na(&timing.best_time_slots)
    );
    let _ = writeln!(output, "- Average duration: {} min", timing.average_duration);
    for share in timing.time_distribution.iter() {
        let _ = writeln!(output, "- {}: {}%", share.period, share.percentage);
    }

    write_timing_table(
        &mut output,
        "Best Slots by Webinar Count",
        &summary.optimal_timing.webinars,
    );
    write_timing_table(
        &mut output,
        "Best Slots by Registrations",
        &summary.optimal_timing.registrations,
    );
    write_timing_table(
        &mut output,
        "Best Slots by Attendees",
        &summary.optimal_timing.attendees,
    );

    let tiers = &summary.topic_performance;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Topic Performance");
    write_tier(&mut output, "Strong", &tiers.strong);
    write_tier(&mut output, "Average", &tiers.average);
    write_tier(&mut output, "Poor", &tiers.poor);

    output
}

fn write_timing_table(output: &mut String, title: &str, rows: &[CountryTiming]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "### {title}");
    if rows.is_empty() {
        let _ = writeln!(output, "No rows with a usable date and time.");
        return;
    }
    let _ = writeln!(output, "| Country | Day | Time | Value |");
    let _ = writeln!(output, "| --- | --- | --- | --- |");
    for row in rows.iter().take(TIMING_ROWS) {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            row.country, row.best_day, row.best_time, row.metric_value
        );
    }
}

fn write_tier(output: &mut String, label: &str, entries: &[TopicPerformanceEntry]) {
    if entries.is_empty() {
        let _ = writeln!(output, "- {label}: {NOT_AVAILABLE}");
        return;
    }
    let rendered: Vec<String> = entries
        .iter()
        .map(|e| format!("{} ({:.1}%, {} min)", e.name, e.attendance_rate, e.avg_time))
        .collect();
    let _ = writeln!(output, "- {label}: {}", rendered.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::summarize;
    use crate::models::{Record, Selection};
    use chrono::NaiveDate;

    fn ranked(name: &str, value: f64) -> RankedEntry {
        RankedEntry {
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn cards_render_units_and_fallback() {
        assert_eq!(rate_card(&[ranked("AI", 65.0)]), vec!["AI (65.0%)"]);
        assert_eq!(engagement_card(&[ranked("AI", 38.0)]), vec!["AI (38 min)"]);
        assert_eq!(
            language_card(&[ranked("English", 2.0), ranked("Spanish", 1.0)]),
            vec!["English (2 webinars)", "Spanish (1 webinars)"]
        );
        assert_eq!(rate_card(&[]), vec!["N/A"]);
    }

    #[test]
    fn filter_description_names_each_dimension() {
        let filter = FilterSpec {
            locations: Selection::of(["India", "Latam"]),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..FilterSpec::default()
        };
        assert_eq!(
            describe_filter(&filter),
            "India / Latam, All Languages, All Webinars, from 2024-01-01"
        );
    }

    #[test]
    fn report_includes_sections() {
        let records = vec![Record {
            topic: Some("AI".to_string()),
            country: Some("Latam".to_string()),
            language: Some("Spanish".to_string()),
            registrations: 100.0,
            attendees: 50.0,
            average_attendance_time: Some(30.0),
            ..Record::default()
        }];
        let report = build_report(&summarize(&records), &FilterSpec::default(), 2);

        assert!(report.starts_with("# Webinar Performance Report"));
        assert!(report.contains("Skipped 2 malformed rows during import."));
        assert!(report.contains("- Attendee rate: 50.00%"));
        assert!(report.contains("- Highest attendance: AI (50.0%)"));
        assert!(report.contains("### Latam"));
        assert!(report.contains("- Top performing sub-region: LATAM"));
        assert!(report.contains("- Best days: N/A"));
        assert!(report.contains("No rows with a usable date and time."));
    }

    #[test]
    fn day_part_shares_use_plain_names() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15);
        let records = vec![Record {
            date: date.map(|d| d.to_string()),
            parsed_date: date,
            time: Some("9:30am".to_string()),
            country: Some("India".to_string()),
            registrations: 10.0,
            attendees: 4.0,
            ..Record::default()
        }];
        let report = build_report(&summarize(&records), &FilterSpec::default(), 0);

        assert!(report.contains("- Morning: 100%"));
        assert!(report.contains("- Night: 0%"));
        assert!(report.contains("- Best days: Monday"));
    }

    #[test]
    fn empty_summary_stops_after_metrics() {
        let report = build_report(&summarize(&[]), &FilterSpec::default(), 0);
        assert!(report.contains("- Total webinars: 0"));
        assert!(report.contains("No webinars match the current filters."));
        assert!(!report.contains("## Regions"));
    }
}
