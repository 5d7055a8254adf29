// src/models/matching.rs - Derived match/attribution result types
use serde::{Deserialize, Serialize};

/// Qualitative confidence band, a pure function of the composite score
/// plus the similarity guardrail applied by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceBand {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl ConfidenceBand {
    pub fn from_composite(composite: u32) -> Self {
        match composite {
            90..=u32::MAX => Self::VeryHigh,
            75..=89 => Self::High,
            60..=74 => Self::Moderate,
            40..=59 => Self::Low,
            _ => Self::VeryLow,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VeryHigh => "very high",
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
            Self::VeryLow => "very low",
        }
    }
}

/// Scored association between one contribution and one owner record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    /// Normalized name of the matched owner; the aggregation key.
    pub owner_key: String,
    pub composite_score: u32,
    pub band: ConfidenceBand,
    pub name_score: u32,
    pub geo_score: u32,
    pub exact_bonus: u32,
    /// Short human-readable description of why the match sits in its
    /// band, for transparent display next to the figure it qualifies.
    pub transparency_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributionType {
    Direct,
    ConduitResolved,
    ConduitUnresolved,
}

impl AttributionType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::ConduitResolved => "conduit_resolved",
            Self::ConduitUnresolved => "conduit_unresolved",
        }
    }
}

/// Ultimate-recipient chain for one contribution. Recipient fields are
/// empty strings when the conduit could not be resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionResult {
    pub attribution_type: AttributionType,
    pub ultimate_recipient_id: String,
    pub ultimate_recipient_name: String,
}

/// Amount routed to one ultimate recipient within a rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientTotal {
    pub recipient_id: String,
    pub recipient_name: String,
    pub amount: f64,
    pub count: usize,
}

/// Diagnostics over one attributed set of contributions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConduitRollup {
    pub total_count: usize,
    pub total_amount: f64,
    pub conduit_count: usize,
    pub conduit_amount: f64,
    pub conduit_pct: f64,
    pub resolved_count: usize,
    pub resolved_amount: f64,
    pub resolved_pct: f64,
    pub unresolved_count: usize,
    pub unresolved_amount: f64,
    pub unresolved_pct: f64,
    pub top_recipients: Vec<RecipientTotal>,
}

/// Per-owner rollup over one resolution pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerAggregate {
    pub owner_key: String,
    pub owner_name: String,
    pub facilities: Vec<String>,
    pub contribution_count: usize,
    pub total_amount: f64,
    pub best_band: ConfidenceBand,
}

/// Counters for one resolution pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassStats {
    pub records_total: usize,
    pub records_matched: usize,
    pub records_unmatched: usize,
    /// Lookups that hit the substring-fallback budget cap and were
    /// reported as no-match.
    pub budget_exhausted_lookups: usize,
    pub avg_composite: f64,
}
