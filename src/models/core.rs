// src/models/core.rs - Source-boundary record types
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether a registry entry describes a person or a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerType {
    Individual,
    Organization,
}

impl OwnerType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Organization => "organization",
        }
    }
}

/// One entry in the owner registry. Loaded once per process and
/// read-only thereafter; matching never mutates these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub name_normalized: String,
    pub name_original: String,
    pub owner_type: OwnerType,
    #[serde(default)]
    pub facilities: Vec<String>,
    /// Stable cross-reference key, distinct from the name. Takes
    /// priority over every name-derived key when present.
    #[serde(default)]
    pub internal_id: Option<String>,
    /// Principal city/state for geographic corroboration. Registry
    /// data frequently omits one or both fields.
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl Location {
    pub fn new(city: Option<&str>, state: Option<&str>) -> Self {
        Self {
            city: city.map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty()),
            state: state.map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty()),
        }
    }
}

/// The declared ultimate recipient on an earmarked contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientCandidate {
    pub id: String,
    pub name: String,
}

/// Earmark markers as filed: an explicit forwarding flag and/or a
/// free-text memo line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EarmarkMarkers {
    #[serde(default)]
    pub flag: bool,
    #[serde(default)]
    pub text: Option<String>,
}

/// Link back to the filed source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    /// Unique per transaction across both data sources; the dedup key.
    pub record_id: String,
    #[serde(default)]
    pub source_document_ref: Option<String>,
}

/// A single contribution transaction as obtained from a bulk snapshot
/// or a live query. Never mutated after creation; downstream results
/// (matches, attributions) are attached as separate derived values so
/// the source record stays auditable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub contributor_name: String,
    pub amount: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub collector_id: String,
    #[serde(default)]
    pub collector_name: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub recipient_candidate: Option<RecipientCandidate>,
    #[serde(default)]
    pub earmark_markers: Option<EarmarkMarkers>,
    pub provenance: Provenance,
}

impl ContributionRecord {
    /// Source-boundary validation: records missing the fields every
    /// downstream step relies on are dropped at parse time, not deep
    /// inside matching.
    pub fn is_wellformed(&self) -> bool {
        !self.contributor_name.trim().is_empty()
            && !self.collector_id.trim().is_empty()
            && !self.provenance.record_id.trim().is_empty()
    }
}
