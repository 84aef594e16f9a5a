use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::axis;
use crate::filter::apply_filter;
use crate::geo;
use crate::models::{
    Axes, BreakdownEntry, FilterSpec, GroupTotals, Kpis, LanguageShare, NamedCount, RankedEntry,
    Record, Region, RegionLanguages, RegionShare, RegionalAnalysis, Summary, TopPerforming,
    TopicAttendance, TopicAvgTime,
};
use crate::table::{sort_desc_by, Tally};
use crate::timing::{TimingAccumulator, NOT_AVAILABLE};
use crate::topics::{self, TopicTotals};
use crate::trends;

/// Width of every topic chart.
pub const TOP_TOPICS: usize = 21;
/// Entries per summary card.
pub const CARD_WIDTH: usize = 3;

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Filters the dataset and derives the full summary from what remains.
pub fn recompute(records: &[Record], spec: &FilterSpec) -> Summary {
    let filtered = apply_filter(records, spec);
    let summary = summarize(&filtered);
    info!(
        total = records.len(),
        filtered = filtered.len(),
        topics = summary.webinars_by_topic.len(),
        "recomputed summary"
    );
    summary
}

/// Builds every view from an already filtered record set.
pub fn summarize(records: &[Record]) -> Summary {
    let mut aggregator = Aggregator::default();
    for record in records {
        aggregator.observe(record);
    }
    if aggregator.timing.skipped() > 0 {
        debug!(
            timed = aggregator.timing.timed(),
            skipped = aggregator.timing.skipped(),
            "rows without a usable date and time left out of timing"
        );
    }
    aggregator.finish(records)
}

#[derive(Debug, Clone, Copy, Default)]
struct GroupAccumulator {
    webinars: usize,
    attendees: f64,
    retention_sum: f64,
    retention_count: usize,
}

impl GroupAccumulator {
    fn observe(&mut self, record: &Record) {
        self.webinars += 1;
        self.attendees += record.attendees;
        if let Some(time) = record.average_attendance_time {
            self.retention_sum += time;
            self.retention_count += 1;
        }
    }

    fn avg_retention(&self) -> f64 {
        if self.retention_count > 0 {
            (self.retention_sum / self.retention_count as f64).round()
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default)]
struct RegionAccumulator {
    webinars: usize,
    attendees: f64,
    topics: Tally<usize>,
    languages: Tally<usize>,
    breakdown: Tally<usize>,
}

#[derive(Debug, Default)]
struct Aggregator {
    webinars: usize,
    registrations: f64,
    attendees: f64,
    avg_time_sum: f64,
    avg_time_count: usize,
    median_sum: f64,
    max_emails: f64,
    languages: Tally<usize>,
    countries: Tally<usize>,
    topics: Tally<usize>,
    topic_attendees: Tally<f64>,
    topic_totals: Tally<TopicTotals>,
    regions: Vec<(Region, GroupAccumulator)>,
    country_groups: Tally<GroupAccumulator>,
    regional: BTreeMap<Region, RegionAccumulator>,
    timing: TimingAccumulator,
}

impl Aggregator {
    fn observe(&mut self, record: &Record) {
        self.webinars += 1;
        self.registrations += record.registrations;
        self.attendees += record.attendees;
        if let Some(time) = record.average_attendance_time {
            self.avg_time_sum += time;
            self.avg_time_count += 1;
        }
        self.median_sum += record.median_attendance;
        self.max_emails = self.max_emails.max(record.emails_sent.unwrap_or(0.0));

        if let Some(language) = record.language.as_deref() {
            self.languages.bump(language);
        }
        if let Some(topic) = record.topic.as_deref() {
            self.topics.bump(topic);
            *self.topic_attendees.entry(topic) += record.attendees;
            self.topic_totals.entry(topic).observe(record);
        }

        // Rows without a country still land in the fallback region.
        let country = record.country.as_deref().unwrap_or_default();
        let class = geo::classify(country);
        self.region_totals(class.region).observe(record);

        let regional = self.regional.entry(class.region).or_default();
        regional.webinars += 1;
        regional.attendees += record.attendees;
        if let Some(topic) = record.topic.as_deref() {
            regional.topics.bump(topic);
        }
        if let Some(language) = record.language.as_deref() {
            regional.languages.bump(language);
        }
        if let Some(group) = class.breakdown_group.as_deref() {
            regional.breakdown.bump(group);
        }

        if record.country.is_some() {
            self.countries.bump(country);
            self.country_groups.entry(&class.display_group).observe(record);
        }

        self.timing.observe(record);
    }

    fn region_totals(&mut self, region: Region) -> &mut GroupAccumulator {
        let index = match self.regions.iter().position(|(r, _)| *r == region) {
            Some(index) => index,
            None => {
                self.regions.push((region, GroupAccumulator::default()));
                self.regions.len() - 1
            }
        };
        &mut self.regions[index].1
    }

    fn finish(self, records: &[Record]) -> Summary {
        let webinars_by_topic = ranked_counts(&self.topics, TOP_TOPICS);
        let attendance_by_topic = topic_attendance(&self.topic_attendees);
        let avg_time_by_topic = topic_avg_times(&self.topic_totals);

        let overall_avg_session_length = if avg_time_by_topic.is_empty() {
            0.0
        } else {
            let sum: f64 = avg_time_by_topic.iter().map(|t| t.avg_time).sum();
            (sum / avg_time_by_topic.len() as f64).round()
        };

        let kpis = Kpis {
            total_webinars: self.webinars,
            total_registrations: self.registrations,
            total_attendees: self.attendees,
            attendees_rate: if self.registrations > 0.0 {
                round_to(self.attendees / self.registrations * 100.0, 2)
            } else {
                0.0
            },
            avg_attendance_time: if self.avg_time_count > 0 {
                (self.avg_time_sum / self.avg_time_count as f64).round()
            } else {
                0.0
            },
            median_attendance_time: if self.webinars > 0 {
                (self.median_sum / self.webinars as f64).round()
            } else {
                0.0
            },
            overall_avg_session_length,
        };

        let webinars_by_language = ranked_counts(&self.languages, usize::MAX);
        let top_performing = TopPerforming {
            highest_attendance: highest_attendance_rates(&self.topic_totals),
            best_engagement: avg_time_by_topic
                .iter()
                .take(CARD_WIDTH)
                .map(|t| RankedEntry {
                    name: t.name.clone(),
                    value: t.avg_time,
                })
                .collect(),
            popular_languages: webinars_by_language
                .iter()
                .take(CARD_WIDTH)
                .map(|l| RankedEntry {
                    name: l.name.clone(),
                    value: l.count as f64,
                })
                .collect(),
        };

        let axes = Axes {
            emails: axis::scale(self.max_emails, 10.0, 5),
            topic_counts: axis::scale(
                webinars_by_topic
                    .iter()
                    .map(|t| t.count as f64)
                    .fold(0.0, f64::max),
                1.0,
                5,
            ),
            topic_attendees: axis::scale(
                attendance_by_topic
                    .iter()
                    .map(|t| t.attendees)
                    .fold(0.0, f64::max),
                10.0,
                5,
            ),
        };

        Summary {
            kpis,
            webinars_by_country: ranked_counts(&self.countries, usize::MAX),
            webinars_by_language,
            webinars_by_topic,
            attendance_by_topic,
            avg_time_by_topic,
            webinars_by_region: region_shares(&self.regions),
            webinars_by_country_group: country_groups(&self.country_groups),
            regional_analysis: regional_analysis(&self.regional),
            language_distribution: language_distribution(&self.regional),
            top_performing,
            timing_overview: self.timing.overview(),
            optimal_timing: self.timing.tables.optimal(),
            trends: trends::analyze(records),
            topic_performance: topics::classify_topics(records),
            axes,
        }
    }
}

fn ranked_counts(tally: &Tally<usize>, limit: usize) -> Vec<NamedCount> {
    let mut counts: Vec<NamedCount> = tally
        .iter()
        .map(|(name, count)| NamedCount {
            name: name.to_string(),
            count: *count,
        })
        .collect();
    sort_desc_by(&mut counts, |c| c.count as f64);
    counts.truncate(limit);
    counts
}

fn topic_attendance(tally: &Tally<f64>) -> Vec<TopicAttendance> {
    let mut rows: Vec<TopicAttendance> = tally
        .iter()
        .map(|(name, attendees)| TopicAttendance {
            name: name.to_string(),
            attendees: *attendees,
        })
        .collect();
    sort_desc_by(&mut rows, |r| r.attendees);
    rows.truncate(TOP_TOPICS);
    rows
}

fn topic_avg_times(tally: &Tally<TopicTotals>) -> Vec<TopicAvgTime> {
    let mut rows: Vec<TopicAvgTime> = tally
        .iter()
        .map(|(name, totals)| TopicAvgTime {
            name: name.to_string(),
            avg_time: totals.mean_time().round(),
        })
        .collect();
    sort_desc_by(&mut rows, |r| r.avg_time);
    rows.truncate(TOP_TOPICS);
    rows
}

fn highest_attendance_rates(tally: &Tally<TopicTotals>) -> Vec<RankedEntry> {
    let mut rows: Vec<RankedEntry> = tally
        .iter()
        .map(|(name, totals)| RankedEntry {
            name: name.to_string(),
            value: totals.attendance_rate(),
        })
        .filter(|r| r.value > 0.0)
        .collect();
    sort_desc_by(&mut rows, |r| r.value);
    rows.truncate(CARD_WIDTH);
    for row in &mut rows {
        row.value = round_to(row.value, 1);
    }
    rows
}

fn region_shares(regions: &[(Region, GroupAccumulator)]) -> Vec<RegionShare> {
    let total: usize = regions.iter().map(|(_, g)| g.webinars).sum();
    regions
        .iter()
        .map(|(region, group)| RegionShare {
            name: *region,
            value: group.webinars,
            attendees: group.attendees,
            avg_retention: group.avg_retention(),
            percentage: if total > 0 {
                (group.webinars as f64 / total as f64 * 100.0).round()
            } else {
                0.0
            },
        })
        .collect()
}

fn country_groups(tally: &Tally<GroupAccumulator>) -> Vec<GroupTotals> {
    let mut groups: Vec<GroupTotals> = tally
        .iter()
        .map(|(name, group)| GroupTotals {
            name: name.to_string(),
            webinars: group.webinars,
            attendees: group.attendees,
            avg_retention: group.avg_retention(),
        })
        .collect();
    sort_desc_by(&mut groups, |g| g.webinars as f64);
    groups
}

/// Picks the breakdown group with the most webinars; the first one seen wins a tie.
pub fn top_sub_region(breakdown: &[BreakdownEntry]) -> String {
    let mut best: Option<&BreakdownEntry> = None;
    for entry in breakdown {
        if best.map_or(true, |b| entry.webinars > b.webinars) {
            best = Some(entry);
        }
    }
    best.map(|b| b.name.clone())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn regional_analysis(regional: &BTreeMap<Region, RegionAccumulator>) -> Vec<RegionalAnalysis> {
    let empty = RegionAccumulator::default();
    Region::ALL
        .iter()
        .map(|&region| {
            let acc = regional.get(&region).unwrap_or(&empty);
            let breakdown: Vec<BreakdownEntry> = acc
                .breakdown
                .iter()
                .map(|(name, webinars)| BreakdownEntry {
                    name: name.to_string(),
                    webinars: *webinars,
                })
                .collect();
            RegionalAnalysis {
                region,
                average_attendance: if acc.webinars > 0 {
                    (acc.attendees / acc.webinars as f64).round()
                } else {
                    0.0
                },
                top_performing_sub_region: top_sub_region(&breakdown),
                popular_topics: ranked_counts(&acc.topics, CARD_WIDTH)
                    .into_iter()
                    .map(|t| t.name)
                    .collect(),
                languages: acc.languages.keys().map(str::to_string).collect(),
                breakdown,
            }
        })
        .collect()
}

fn language_distribution(regional: &BTreeMap<Region, RegionAccumulator>) -> Vec<RegionLanguages> {
    Region::ALL
        .iter()
        .map(|&region| RegionLanguages {
            region,
            languages: regional
                .get(&region)
                .map(|acc| {
                    ranked_counts(&acc.languages, CARD_WIDTH)
                        .into_iter()
                        .map(|l| LanguageShare {
                            language: l.name,
                            webinars: l.count,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_text;
    use crate::models::{Selection, Tier};

    const UPLOAD: &str = "\
Date,Time (MYT),Countries,Languages,Webinar Topics,No. of registrations,No. of attendees,Average attendance time,Median attendance,Total Duration,No. of emails
\"Jan 1, 2024\",10:00am,Latam,Spanish,AI,100,50,30,30,60,0
\"Jan 2, 2024\",3:00pm,Africa: Nigeria,English,AI,100,80,45,45,60,0
bad,row
\"Jan 3, 2024\",,Asia,English,ML,50,10,0,0,0,0
";

    fn upload() -> Vec<Record> {
        let dataset = parse_text(UPLOAD).expect("upload parses");
        assert_eq!(dataset.dropped.len(), 1);
        dataset.records
    }

    fn share(summary: &Summary, region: Region) -> &RegionShare {
        summary
            .webinars_by_region
            .iter()
            .find(|s| s.name == region)
            .expect("region present")
    }

    #[test]
    fn three_row_upload_end_to_end() {
        let summary = recompute(&upload(), &FilterSpec::default());

        let kpis = &summary.kpis;
        assert_eq!(kpis.total_webinars, 3);
        assert_eq!(kpis.total_registrations, 250.0);
        assert_eq!(kpis.total_attendees, 140.0);
        assert_eq!(format!("{:.2}", kpis.attendees_rate), "56.00");
        assert_eq!(kpis.avg_attendance_time, 25.0);
        assert_eq!(kpis.median_attendance_time, 25.0);

        let regions: Vec<(Region, usize, f64)> = summary
            .webinars_by_region
            .iter()
            .map(|s| (s.name, s.value, s.attendees))
            .collect();
        assert_eq!(
            regions,
            vec![
                (Region::Latam, 1, 50.0),
                (Region::Africa, 1, 80.0),
                (Region::Asia, 1, 10.0),
            ]
        );

        let topics: Vec<(&str, usize)> = summary
            .webinars_by_topic
            .iter()
            .map(|t| (t.name.as_str(), t.count))
            .collect();
        assert_eq!(topics, vec![("AI", 2), ("ML", 1)]);
        assert_eq!(summary.attendance_by_topic[0].attendees, 130.0);
        assert_eq!(summary.attendance_by_topic[1].attendees, 10.0);

        // The Jan 3 row is dated but has no time, so only two rows feed the timing tables.
        assert_eq!(summary.trends.day_of_week.len(), 3);
        assert_eq!(summary.timing_overview.best_days, vec!["Monday", "Tuesday"]);
        let optimal = &summary.optimal_timing.webinars;
        let countries: Vec<&str> = optimal.iter().map(|c| c.country.as_str()).collect();
        assert_eq!(countries, vec!["Africa: Nigeria", "Latam"]);
        assert_eq!(optimal[0].best_day, "Tuesday");
        assert_eq!(optimal[0].best_time, "03:00 PM");
        assert_eq!(optimal[1].best_day, "Monday");
        assert_eq!(optimal[1].best_time, "10:00 AM");
    }

    #[test]
    fn derived_cards_and_axes() {
        let summary = summarize(&upload());

        assert_eq!(summary.avg_time_by_topic[0].name, "AI");
        assert_eq!(summary.avg_time_by_topic[0].avg_time, 38.0);
        assert_eq!(summary.avg_time_by_topic[1].avg_time, 0.0);
        assert_eq!(summary.kpis.overall_avg_session_length, 19.0);

        let top = &summary.top_performing;
        assert_eq!(top.highest_attendance[0].name, "AI");
        assert_eq!(top.highest_attendance[0].value, 65.0);
        assert_eq!(top.highest_attendance[1].value, 20.0);
        assert_eq!(top.popular_languages[0].name, "English");
        assert_eq!(top.popular_languages[0].value, 2.0);

        let africa = summary.regional(Region::Africa).expect("africa");
        assert_eq!(africa.average_attendance, 80.0);
        assert_eq!(africa.top_performing_sub_region, "Anglophone");
        assert_eq!(africa.popular_topics, vec!["AI"]);
        assert_eq!(africa.languages, vec!["English"]);

        let asia = summary.regional(Region::Asia).expect("asia");
        assert_eq!(asia.top_performing_sub_region, "N/A");
        assert!(asia.breakdown.is_empty());

        assert_eq!(summary.axes.emails, axis::fallback());
        assert_eq!(summary.axes.topic_counts.ticks, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            summary.axes.topic_attendees.ticks,
            vec![0.0, 50.0, 100.0, 150.0, 200.0]
        );

        let tiers = &summary.topic_performance;
        assert_eq!(tiers.strong[0].name, "AI");
        assert_eq!(tiers.strong[0].tier, Tier::Strong);
        assert_eq!(tiers.poor[0].name, "ML");

        let groups: Vec<&str> = summary
            .webinars_by_country_group
            .iter()
            .map(|g| g.name.as_str())
            .collect();
        assert_eq!(groups, vec!["Latam", "Africa", "Asia"]);
    }

    #[test]
    fn location_filter_narrows_every_view() {
        let spec = FilterSpec {
            locations: Selection::of(["Latam"]),
            ..FilterSpec::default()
        };
        let summary = recompute(&upload(), &spec);
        assert_eq!(summary.kpis.total_webinars, 1);
        assert_eq!(summary.webinars_by_region.len(), 1);
        assert_eq!(share(&summary, Region::Latam).percentage, 100.0);
        assert_eq!(summary.optimal_timing.webinars.len(), 1);
    }

    #[test]
    fn region_values_cover_every_row() {
        let mut records = upload();
        records.push(Record {
            topic: Some("AI".to_string()),
            ..Record::default()
        });
        let summary = summarize(&records);

        let total: usize = summary.webinars_by_region.iter().map(|s| s.value).sum();
        assert_eq!(total, summary.kpis.total_webinars);
        assert_eq!(share(&summary, Region::Asia).value, 2);

        let percentages: f64 = summary.webinars_by_region.iter().map(|s| s.percentage).sum();
        assert!((percentages - 100.0).abs() <= 1.0);
        // Country lists only count rows that name a country.
        assert_eq!(summary.webinars_by_country.len(), 3);
    }

    #[test]
    fn empty_input_yields_zeroed_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary.kpis.total_webinars, 0);
        assert_eq!(summary.kpis.attendees_rate, 0.0);
        assert!(summary.webinars_by_region.is_empty());
        assert_eq!(summary.regional_analysis.len(), 3);
        assert!(summary
            .language_distribution
            .iter()
            .all(|r| r.languages.is_empty()));
        assert_eq!(summary.axes.topic_counts, axis::fallback());
    }

    #[test]
    fn topics_cut_at_chart_width_with_stable_ties() {
        let records: Vec<Record> = (0..30)
            .map(|i| Record {
                topic: Some(format!("Topic {i}")),
                attendees: 1.0,
                ..Record::default()
            })
            .collect();
        let summary = summarize(&records);
        assert_eq!(summary.webinars_by_topic.len(), TOP_TOPICS);
        assert_eq!(summary.webinars_by_topic[0].name, "Topic 0");
        assert_eq!(summary.webinars_by_topic[20].name, "Topic 20");
    }

    #[test]
    fn sub_region_prefers_most_webinars_then_first_seen() {
        let entry = |name: &str, webinars| BreakdownEntry {
            name: name.to_string(),
            webinars,
        };
        assert_eq!(
            top_sub_region(&[entry("Anglophone", 1), entry("PALOP", 3), entry("Francophone", 3)]),
            "PALOP"
        );
        assert_eq!(top_sub_region(&[entry("LATAM", 2)]), "LATAM");
        assert_eq!(top_sub_region(&[]), "N/A");
    }

    #[test]
    fn rounding_matches_display_precision() {
        assert_eq!(round_to(46.666_7, 2), 46.67);
        assert_eq!(round_to(37.5, 0), 38.0);
        assert_eq!(round_to(64.99, 1), 65.0);
    }
}
