//! Webinar CSV ingestion and analytics.
//!
//! An uploaded export is parsed once by [`ingest`]; every filter change then
//! goes through [`aggregate::recompute`], which filters the records and derives
//! a complete [`Summary`] from scratch.

pub mod aggregate;
pub mod axis;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod geo;
pub mod ingest;
pub mod models;
pub mod report;
pub mod summarize;
pub mod table;
pub mod timing;
pub mod topics;
pub mod trends;

pub use aggregate::{recompute, summarize};
pub use error::{IngestError, SummarizerError};
pub use ingest::{parse_text, read_csv, Dataset};
pub use models::{FilterSpec, Record, Region, Selection, Summary};
