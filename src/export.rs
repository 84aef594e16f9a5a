use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use crate::models::{Summary, TopicPerformanceEntry};

pub fn write_summary_json(summary: &Summary, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(summary).context("failed to serialize summary")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote summary json");
    Ok(())
}

/// Writes each trend dimension, the topic tiers and the optimal-timing lists
/// as CSV files under `dir`, returning the paths written.
pub fn write_tables(summary: &Summary, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let trends = &summary.trends;
    let tiers = &summary.topic_performance;
    let tier_rows: Vec<&TopicPerformanceEntry> = tiers
        .strong
        .iter()
        .chain(&tiers.average)
        .chain(&tiers.poor)
        .collect();
    let timing = &summary.optimal_timing;

    let written = vec![
        write_rows(&dir.join("trends_month.csv"), &trends.month)?,
        write_rows(&dir.join("trends_day_of_week.csv"), &trends.day_of_week)?,
        write_rows(&dir.join("trends_topic.csv"), &trends.topic)?,
        write_rows(&dir.join("trends_country.csv"), &trends.country)?,
        write_rows(&dir.join("trends_language.csv"), &trends.language)?,
        write_rows(&dir.join("topic_tiers.csv"), &tier_rows)?,
        write_rows(&dir.join("optimal_timing_webinars.csv"), &timing.webinars)?,
        write_rows(&dir.join("optimal_timing_registrations.csv"), &timing.registrations)?,
        write_rows(&dir.join("optimal_timing_attendees.csv"), &timing.attendees)?,
    ];
    info!(dir = %dir.display(), files = written.len(), "wrote tables");
    Ok(written)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> anyhow::Result<PathBuf> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(path.to_path_buf())
}
