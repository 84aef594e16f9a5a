use std::time::Duration;

use tracing::warn;

use crate::error::SummarizerError;

pub const API_KEY_VAR: &str = "WEBINAR_INSIGHTS_API_KEY";
pub const ENDPOINT_VAR: &str = "WEBINAR_INSIGHTS_ENDPOINT";
pub const MODEL_VAR: &str = "WEBINAR_INSIGHTS_MODEL";
pub const TIMEOUT_VAR: &str = "WEBINAR_INSIGHTS_TIMEOUT_SECS";

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizerConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl SummarizerConfig {
    pub fn from_env() -> Result<Self, SummarizerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Only the API key is required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SummarizerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = set(API_KEY_VAR).ok_or(SummarizerError::MissingApiKey)?;
        let endpoint = set(ENDPOINT_VAR).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let model = set(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let timeout_secs = match set(TIMEOUT_VAR) {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                warn!(var = TIMEOUT_VAR, value = %raw, "ignoring invalid timeout");
                DEFAULT_TIMEOUT_SECS
            }),
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key: api_key.trim().to_string(),
            endpoint,
            model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn generate_url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            self.model,
            self.api_key
        )
    }
}
