use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV file is empty.")]
    EmptyInput,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("no API key configured for the insights service")]
    MissingApiKey,

    #[error("insights request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("insights service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("insights service returned an unexpected response shape")]
    UnexpectedShape,

    #[error("failed to serialize insights snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}
