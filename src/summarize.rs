use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::aggregate::CARD_WIDTH;
use crate::config::SummarizerConfig;
use crate::error::SummarizerError;
use crate::models::{
    Kpis, NamedCount, OptimalTiming, RegionalAnalysis, Summary, TimingOverview, TopicAttendance,
    TopicAvgTime, TopicTiers,
};

pub const EMPTY_DATASET_STATUS: &str =
    "Please upload a CSV and generate the report first to get webinar insights.";
pub const UNEXPECTED_SHAPE_STATUS: &str =
    "Failed to generate insights. Unexpected API response structure.";
pub const FAILURE_STATUS: &str = "Error generating insights. Please try again.";
pub const BUSY_STATUS: &str = "Insights are already being generated. Please wait.";

const INSTRUCTIONS: &str = "Given the following webinar performance metrics and aggregated data, \
provide a brief analysis of overall performance, identify key strengths and weaknesses, and \
suggest actionable recommendations for improvement, including future webinar topics. Focus on \
key takeaways and a concise, actionable report.";
const SUGGESTIONS: &str = "Please also provide 3 suggestions for future webinar topics and \
strategies based on this data.";
const FORMATTING: &str = "Format your response as a concise paragraph for analysis, followed by \
a bulleted list of suggestions and a final section for actionable recommendations.";

/// The slice of a summary that is sent out for narrative insights.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightSnapshot<'a> {
    pub overall_metrics: &'a Kpis,
    pub top_languages: &'a [NamedCount],
    pub top_countries: &'a [NamedCount],
    pub top_topics_by_count: &'a [NamedCount],
    pub top_topics_by_attendance: &'a [TopicAttendance],
    pub top_topics_by_avg_time: &'a [TopicAvgTime],
    pub regional_analysis: &'a [RegionalAnalysis],
    pub timing_overview: &'a TimingOverview,
    pub optimal_timing: &'a OptimalTiming,
    pub topic_performance: &'a TopicTiers,
}

impl<'a> InsightSnapshot<'a> {
    pub fn from_summary(summary: &'a Summary) -> Self {
        Self {
            overall_metrics: &summary.kpis,
            top_languages: head(&summary.webinars_by_language),
            top_countries: head(&summary.webinars_by_country),
            top_topics_by_count: head(&summary.webinars_by_topic),
            top_topics_by_attendance: head(&summary.attendance_by_topic),
            top_topics_by_avg_time: head(&summary.avg_time_by_topic),
            regional_analysis: &summary.regional_analysis,
            timing_overview: &summary.timing_overview,
            optimal_timing: &summary.optimal_timing,
            topic_performance: &summary.topic_performance,
        }
    }
}

fn head<T>(items: &[T]) -> &[T] {
    &items[..items.len().min(CARD_WIDTH)]
}

pub fn build_prompt(snapshot: &InsightSnapshot<'_>) -> Result<String, SummarizerError> {
    let data = serde_json::to_string_pretty(snapshot)?;
    Ok(format!(
        "{INSTRUCTIONS}\n\nHere's the summarized webinar data:\n{data}\n\n{SUGGESTIONS}\n\n{FORMATTING}"
    ))
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

impl GenerateRequest {
    fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}

/// Pulls `candidates[0].content.parts[0].text` out of a response body.
pub fn extract_text(body: &serde_json::Value) -> Result<String, SummarizerError> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(|text| text.as_str())
        .map(str::to_string)
        .ok_or(SummarizerError::UnexpectedShape)
}

/// What the caller shows after an insights request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsightOutcome {
    Insights(String),
    Status(&'static str),
}

impl InsightOutcome {
    pub fn text(&self) -> &str {
        match self {
            InsightOutcome::Insights(text) => text,
            InsightOutcome::Status(status) => status,
        }
    }
}

/// At most one insights request at a time.
#[derive(Debug, Default)]
pub struct InFlight {
    busy: AtomicBool,
}

impl InFlight {
    pub fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { busy: &self.busy })
    }
}

/// Clears the in-flight flag when dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

pub struct SummarizerClient {
    http: Client,
    config: SummarizerConfig,
    in_flight: InFlight,
}

impl SummarizerClient {
    pub fn new(config: SummarizerConfig) -> Result<Self, SummarizerError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            in_flight: InFlight::default(),
        })
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Produces insights for a summary, or the status line to show instead.
    ///
    /// Failures never escape: they are logged and mapped to a fixed status.
    pub async fn generate_insights(&self, summary: &Summary) -> InsightOutcome {
        if summary.kpis.total_webinars == 0 {
            return InsightOutcome::Status(EMPTY_DATASET_STATUS);
        }
        let Some(_guard) = self.in_flight.try_begin() else {
            warn!("insights request refused while another is running");
            return InsightOutcome::Status(BUSY_STATUS);
        };

        let request_id = Uuid::new_v4();
        let start = Instant::now();
        info!(%request_id, model = %self.config.model, "requesting insights");

        let result = match build_prompt(&InsightSnapshot::from_summary(summary)) {
            Ok(prompt) => self.request(request_id, &prompt).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(text) => {
                info!(
                    %request_id,
                    duration_secs = start.elapsed().as_secs_f32(),
                    response_chars = text.len(),
                    "insights generated"
                );
                InsightOutcome::Insights(text)
            }
            Err(SummarizerError::UnexpectedShape) => {
                warn!(%request_id, "insights response had an unexpected shape");
                InsightOutcome::Status(UNEXPECTED_SHAPE_STATUS)
            }
            Err(err) => {
                error!(%request_id, error = %err, "insights request failed");
                InsightOutcome::Status(FAILURE_STATUS)
            }
        }
    }

    async fn request(&self, request_id: Uuid, prompt: &str) -> Result<String, SummarizerError> {
        debug!(%request_id, prompt_chars = prompt.len(), "posting prompt");
        let response = self
            .http
            .post(self.config.generate_url())
            .json(&GenerateRequest::from_prompt(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;
        extract_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::summarize;
    use crate::models::Record;
    use serde_json::json;
    use std::time::Duration;

    fn config() -> SummarizerConfig {
        SummarizerConfig {
            api_key: "test".to_string(),
            endpoint: "http://127.0.0.1:9".to_string(),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(1),
        }
    }

    fn loaded_summary() -> Summary {
        let records: Vec<Record> = ["AI", "ML", "Cloud", "Data", "AI"]
            .iter()
            .map(|topic| Record {
                topic: Some(topic.to_string()),
                country: Some("India".to_string()),
                language: Some("English".to_string()),
                registrations: 10.0,
                attendees: 5.0,
                ..Record::default()
            })
            .collect();
        summarize(&records)
    }

    #[test]
    fn snapshot_keeps_top_three_slices() {
        let summary = loaded_summary();
        let snapshot = InsightSnapshot::from_summary(&summary);
        assert_eq!(snapshot.top_topics_by_count.len(), 3);
        assert_eq!(snapshot.top_topics_by_count[0].name, "AI");
        assert_eq!(snapshot.top_languages.len(), 1);
        assert_eq!(snapshot.regional_analysis.len(), 3);
    }

    #[test]
    fn prompt_wraps_snapshot_json() {
        let summary = loaded_summary();
        let prompt = build_prompt(&InsightSnapshot::from_summary(&summary)).unwrap();
        assert!(prompt.starts_with("Given the following webinar performance metrics"));
        assert!(prompt.contains("Here's the summarized webinar data:\n{"));
        assert!(prompt.contains("\"overallMetrics\""));
        assert!(prompt.contains("\"topTopicsByCount\""));
        assert!(prompt.contains("3 suggestions for future webinar topics"));
        assert!(prompt.ends_with("a final section for actionable recommendations."));
    }

    #[test]
    fn request_body_has_generate_content_shape() {
        let body = serde_json::to_value(GenerateRequest::from_prompt("hello")).unwrap();
        assert_eq!(body, json!({ "contents": [{ "parts": [{ "text": "hello" }] }] }));
    }

    #[test]
    fn extracts_first_candidate_text() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "Strong quarter." }, { "text": "ignored" }] } },
                { "content": { "parts": [{ "text": "second" }] } }
            ]
        });
        assert_eq!(extract_text(&body).unwrap(), "Strong quarter.");
    }

    #[test]
    fn unexpected_shapes_are_reported() {
        for body in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{ "content": { "parts": [] } }] }),
            json!({ "candidates": [{ "content": { "parts": [{ "text": 3 }] } }] }),
        ] {
            assert!(matches!(
                extract_text(&body),
                Err(SummarizerError::UnexpectedShape)
            ));
        }
    }

    #[test]
    fn guard_releases_on_drop() {
        let in_flight = InFlight::default();
        let guard = in_flight.try_begin().expect("first request starts");
        assert!(in_flight.try_begin().is_none());
        drop(guard);
        assert!(in_flight.try_begin().is_some());
    }

    #[tokio::test]
    async fn empty_dataset_short_circuits() {
        let client = SummarizerClient::new(config()).unwrap();
        let outcome = client.generate_insights(&summarize(&[])).await;
        assert_eq!(outcome, InsightOutcome::Status(EMPTY_DATASET_STATUS));
    }

    #[tokio::test]
    async fn concurrent_request_is_refused() {
        let client = SummarizerClient::new(config()).unwrap();
        let _running = client.in_flight().try_begin().expect("slot free");
        let outcome = client.generate_insights(&loaded_summary()).await;
        assert_eq!(outcome.text(), BUSY_STATUS);
    }
}
