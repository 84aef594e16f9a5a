use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use webinar_insights::config::SummarizerConfig;
use webinar_insights::ingest::{self, Dataset};
use webinar_insights::models::{FilterSpec, Selection};
use webinar_insights::summarize::{
    build_prompt, InsightSnapshot, SummarizerClient, EMPTY_DATASET_STATUS,
};
use webinar_insights::{export, recompute, report, IngestError};

#[derive(Parser)]
#[command(name = "webinar-insights")]
#[command(about = "Webinar performance analytics from CSV exports", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// Webinar export to analyze
    #[arg(long)]
    csv: PathBuf,
    /// Keep only these locations (repeatable)
    #[arg(long = "location")]
    locations: Vec<String>,
    /// Keep only these languages (repeatable)
    #[arg(long = "language")]
    languages: Vec<String>,
    /// Keep only these topics (repeatable)
    #[arg(long = "topic")]
    topics: Vec<String>,
    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
}

impl Source {
    fn filter(&self) -> FilterSpec {
        FilterSpec {
            locations: Selection::of(self.locations.iter().cloned()),
            languages: Selection::of(self.languages.iter().cloned()),
            topics: Selection::of(self.topics.iter().cloned()),
            start_date: self.start,
            end_date: self.end,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the locations, languages and topics available for filtering
    Options {
        #[command(flatten)]
        source: Source,
    },
    /// Print key metrics and the top performing cards
    Summary {
        #[command(flatten)]
        source: Source,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value = "webinar-report.md")]
        out: PathBuf,
    },
    /// Write the full summary as JSON
    Export {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value = "webinar-summary.json")]
        out: PathBuf,
    },
    /// Write trend, topic tier and timing tables as CSV files
    Tables {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value = "webinar-tables")]
        dir: PathBuf,
    },
    /// Ask the text-generation service for narrative insights
    Insights {
        #[command(flatten)]
        source: Source,
        /// Print the prompt instead of sending it
        #[arg(long)]
        prompt_only: bool,
    },
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// An empty upload is reported and analyzed as an empty dataset.
fn load(source: &Source) -> anyhow::Result<Dataset> {
    match ingest::read_csv(&source.csv) {
        Ok(dataset) => {
            if dataset.is_empty() {
                warn!(path = %source.csv.display(), "upload has a header but no data rows");
            }
            Ok(dataset)
        }
        Err(err @ IngestError::EmptyInput) => {
            println!("{err}");
            Ok(Dataset::default())
        }
        Err(err) => Err(err).with_context(|| format!("failed to load {}", source.csv.display())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Commands::Options { source } => {
            let dataset = load(&source)?;
            let options = &dataset.options;
            println!("Locations: {}", options.locations.join(", "));
            println!("Languages: {}", options.languages.join(", "));
            println!("Topics: {}", options.topics.join(", "));
        }
        Commands::Summary { source } => {
            let dataset = load(&source)?;
            let summary = recompute(&dataset.records, &source.filter());
            let kpis = &summary.kpis;

            println!(
                "{} webinars, {} registrations, {} attendees ({:.2}% attendee rate)",
                kpis.total_webinars,
                kpis.total_registrations,
                kpis.total_attendees,
                kpis.attendees_rate
            );
            println!(
                "Average attendance {} min, median {} min, session length {} min",
                kpis.avg_attendance_time,
                kpis.median_attendance_time,
                kpis.overall_avg_session_length
            );
            let top = &summary.top_performing;
            println!(
                "Highest attendance: {}",
                report::rate_card(&top.highest_attendance).join(", ")
            );
            println!(
                "Best engagement: {}",
                report::engagement_card(&top.best_engagement).join(", ")
            );
            println!(
                "Popular languages: {}",
                report::language_card(&top.popular_languages).join(", ")
            );
            if !dataset.dropped.is_empty() {
                println!("Skipped {} malformed rows.", dataset.dropped.len());
            }
        }
        Commands::Report { source, out } => {
            let dataset = load(&source)?;
            let filter = source.filter();
            let summary = recompute(&dataset.records, &filter);
            let report = report::build_report(&summary, &filter, dataset.dropped.len());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { source, out } => {
            let dataset = load(&source)?;
            let summary = recompute(&dataset.records, &source.filter());
            export::write_summary_json(&summary, &out)?;
            println!("Summary written to {}.", out.display());
        }
        Commands::Tables { source, dir } => {
            let dataset = load(&source)?;
            let summary = recompute(&dataset.records, &source.filter());
            let written = export::write_tables(&summary, &dir)?;
            println!("Wrote {} tables to {}.", written.len(), dir.display());
        }
        Commands::Insights {
            source,
            prompt_only,
        } => {
            let dataset = load(&source)?;
            let summary = recompute(&dataset.records, &source.filter());

            if summary.kpis.total_webinars == 0 {
                warn!("no rows to summarize");
                println!("{EMPTY_DATASET_STATUS}");
                return Ok(());
            }
            if prompt_only {
                let prompt = build_prompt(&InsightSnapshot::from_summary(&summary))?;
                println!("{prompt}");
                return Ok(());
            }

            let config = SummarizerConfig::from_env()
                .context("WEBINAR_INSIGHTS_API_KEY must be set to request insights")?;
            info!(model = %config.model, "insights service configured");
            let client = SummarizerClient::new(config)?;
            let outcome = client.generate_insights(&summary).await;
            println!("{}", outcome.text());
        }
    }

    Ok(())
}
