// src/lib.rs
pub mod matching;
pub mod models;
pub mod sources;
pub mod utils;

pub use matching::index::{LookupOutcome, LookupStrategy, MatchBudget, MissReason, OwnerIndex};
pub use matching::manager::{
    aggregate_by_owner, attribute_contributions, resolve_owner_matches, search, SearchOutcome,
};
pub use models::core::{ContributionRecord, OwnerRecord, OwnerType};
pub use models::matching::{
    AttributionResult, AttributionType, ConduitRollup, ConfidenceBand, MatchResult, OwnerAggregate,
};
pub use sources::router::{SearchTerm, SourceRouter};
pub use sources::{DataSource, FetchResponse, SourceError};
