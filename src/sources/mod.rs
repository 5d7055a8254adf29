// src/sources/mod.rs - Contribution data sources and fetch envelope
pub mod bulk;
pub mod directory;
pub mod live;
pub mod provenance;
pub mod registry;
pub mod router;

use serde::Serialize;
use thiserror::Error;

use crate::models::core::ContributionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataSource {
    Bulk,
    Live,
}

impl DataSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bulk => "bulk",
            Self::Live => "live",
        }
    }
}

/// Fetch-layer failures. These are surfaced to the caller inside the
/// response envelope rather than thrown past the orchestration
/// boundary, so a report can render a "data limited" notice instead of
/// an error page.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("invalid collector identifier or search term: {0:?}")]
    InvalidIdentifier(String),
    #[error("no bulk snapshot available for high-volume collector {collector_id}")]
    SourceUnavailable {
        collector_id: String,
        /// Where the caller can browse the data we could not serve.
        suggested_link: String,
    },
}

/// Non-fatal coverage degradations, typed so callers can render them
/// precisely. A timeout means "retry later", never "no data exists".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CoverageNote {
    /// A live chunk hit its call timeout; the fetch returned what it
    /// had accumulated up to that point.
    TimedOut { cycle: i32 },
    /// A period hit the per-period page cap before the cursor ran dry.
    PageCapReached { cycle: i32 },
}

impl CoverageNote {
    pub fn describe(&self) -> String {
        match self {
            Self::TimedOut { cycle } => {
                format!("live query for the {cycle} cycle timed out; results are partial")
            }
            Self::PageCapReached { cycle } => {
                format!("page cap reached for the {cycle} cycle; results are partial")
            }
        }
    }
}

/// What a fetch actually obtained and from where. Coverage is reported
/// explicitly so downstream consumers can render a transparent "as of"
/// disclosure.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub records: Vec<ContributionRecord>,
    /// Election-cycle years actually covered.
    pub coverage_years: Vec<i32>,
    pub source: DataSource,
    pub is_partial: bool,
    pub notes: Vec<CoverageNote>,
}
