// src/matching/manager.rs - Orchestration of one resolution pass
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

use crate::matching::conduit;
use crate::matching::confidence;
use crate::matching::index::{LookupOutcome, MatchBudget, MissReason, OwnerIndex};
use crate::matching::resolver;
use crate::models::core::ContributionRecord;
use crate::models::matching::{
    AttributionResult, ConduitRollup, MatchResult, OwnerAggregate, PassStats,
};
use crate::sources::router::{SearchTerm, SourceRouter};
use crate::sources::{CoverageNote, DataSource, SourceError};

const TOP_RECIPIENTS_IN_ROLLUP: usize = 10;

/// Resolve and score a batch of contributions against the owner
/// index. One fresh budget per call: the substring cap is scoped to
/// this pass and not shared with concurrent passes. Results are
/// positionally parallel to the input; `None` folds together the
/// expected not-found case and budget-capped lookups.
pub fn resolve_owner_matches(
    index: &OwnerIndex,
    contributions: &[ContributionRecord],
    budget_cap: usize,
) -> (Vec<Option<MatchResult>>, PassStats) {
    let mut budget = MatchBudget::new(budget_cap);
    let mut stats = PassStats {
        records_total: contributions.len(),
        ..Default::default()
    };
    let mut composite_sum: u64 = 0;

    let matches: Vec<Option<MatchResult>> = contributions
        .iter()
        .map(|contribution| match resolver::resolve(contribution, index, &mut budget) {
            LookupOutcome::Hit { owner, strategy } => {
                let result = confidence::score(contribution, owner);
                debug!(
                    "Match: '{}' -> '{}' via {} ({}, score {})",
                    contribution.contributor_name,
                    owner.name_normalized,
                    strategy.as_str(),
                    result.band.as_str(),
                    result.composite_score
                );
                stats.records_matched += 1;
                composite_sum += result.composite_score as u64;
                Some(result)
            }
            LookupOutcome::Miss(reason) => {
                if reason == MissReason::BudgetExhausted {
                    stats.budget_exhausted_lookups += 1;
                }
                stats.records_unmatched += 1;
                None
            }
        })
        .collect();

    stats.avg_composite = if stats.records_matched > 0 {
        composite_sum as f64 / stats.records_matched as f64
    } else {
        0.0
    };
    (matches, stats)
}

/// Attribute every contribution's ultimate-recipient chain and build
/// the diagnostics rollup over the set.
pub fn attribute_contributions(
    contributions: &[ContributionRecord],
) -> (Vec<AttributionResult>, ConduitRollup) {
    let attributions: Vec<AttributionResult> =
        contributions.iter().map(conduit::attribute).collect();
    let rollup = conduit::rollup(contributions, &attributions, TOP_RECIPIENTS_IN_ROLLUP);
    (attributions, rollup)
}

/// Roll matched contributions up per owner, largest total first.
pub fn aggregate_by_owner(
    index: &OwnerIndex,
    contributions: &[ContributionRecord],
    matches: &[Option<MatchResult>],
) -> Vec<OwnerAggregate> {
    let mut by_owner: HashMap<String, OwnerAggregate> = HashMap::new();
    for (contribution, matched) in contributions.iter().zip(matches) {
        let Some(matched) = matched else { continue };
        let entry = by_owner
            .entry(matched.owner_key.clone())
            .or_insert_with(|| {
                let (owner_name, facilities) = index
                    .find_exact(&matched.owner_key)
                    .map(|owner| (owner.name_original.clone(), owner.facilities.clone()))
                    .unwrap_or_else(|| (matched.owner_key.clone(), Vec::new()));
                OwnerAggregate {
                    owner_key: matched.owner_key.clone(),
                    owner_name,
                    facilities,
                    contribution_count: 0,
                    total_amount: 0.0,
                    best_band: matched.band,
                }
            });
        entry.contribution_count += 1;
        entry.total_amount += contribution.amount;
        entry.best_band = entry.best_band.max(matched.band);
    }

    let mut aggregates: Vec<OwnerAggregate> = by_owner.into_values().collect();
    aggregates.sort_by(|a, b| {
        b.total_amount
            .partial_cmp(&a.total_amount)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.owner_key.cmp(&b.owner_key))
    });
    aggregates
}

/// Everything one search produces, fetch-layer degradations included.
/// Fetch errors ride in `source_error` instead of being thrown so the
/// caller can always render a transparent disclosure.
#[derive(Debug)]
pub struct SearchOutcome {
    pub run_id: String,
    pub records: Vec<ContributionRecord>,
    pub matches: Vec<Option<MatchResult>>,
    pub attributions: Vec<AttributionResult>,
    pub rollup: ConduitRollup,
    pub owner_aggregates: Vec<OwnerAggregate>,
    pub coverage_years: Vec<i32>,
    pub source: Option<DataSource>,
    pub is_partial: bool,
    pub notes: Vec<CoverageNote>,
    pub source_error: Option<SourceError>,
    pub stats: PassStats,
}

impl SearchOutcome {
    fn degraded(run_id: String, error: SourceError) -> Self {
        Self {
            run_id,
            records: Vec::new(),
            matches: Vec::new(),
            attributions: Vec::new(),
            rollup: ConduitRollup::default(),
            owner_aggregates: Vec::new(),
            coverage_years: Vec::new(),
            source: None,
            is_partial: false,
            notes: Vec::new(),
            source_error: Some(error),
            stats: PassStats::default(),
        }
    }
}

/// Full pass for one search term: fetch, resolve, score, attribute,
/// aggregate.
pub async fn search(
    router: &SourceRouter,
    index: &OwnerIndex,
    raw_term: &str,
    budget_cap: usize,
    as_of: DateTime<Utc>,
) -> SearchOutcome {
    let run_id = Uuid::new_v4().to_string();
    let started = Instant::now();
    info!("🚀 [{}] Search starting for {:?}", run_id, raw_term);

    let term = match SearchTerm::parse(raw_term) {
        Ok(term) => term,
        Err(error) => {
            warn!("[{}] Rejected search term: {}", run_id, error);
            return SearchOutcome::degraded(run_id, error);
        }
    };

    let fetched = match router.fetch(&term, as_of).await {
        Ok(response) => response,
        Err(error) => {
            warn!("[{}] Fetch unavailable: {}", run_id, error);
            return SearchOutcome::degraded(run_id, error);
        }
    };
    info!(
        "📥 [{}] Fetched {} records from {} source (coverage: {:?}{})",
        run_id,
        fetched.records.len(),
        fetched.source.as_str(),
        fetched.coverage_years,
        if fetched.is_partial { ", partial" } else { "" }
    );

    let (matches, stats) = resolve_owner_matches(index, &fetched.records, budget_cap);
    let (attributions, rollup) = attribute_contributions(&fetched.records);
    let owner_aggregates = aggregate_by_owner(index, &fetched.records, &matches);

    info!(
        "✅ [{}] Search complete in {:.1}s: {}/{} matched ({} owners), {} budget-capped lookups",
        run_id,
        started.elapsed().as_secs_f32(),
        stats.records_matched,
        stats.records_total,
        owner_aggregates.len(),
        stats.budget_exhausted_lookups
    );

    SearchOutcome {
        run_id,
        records: fetched.records,
        matches,
        attributions,
        rollup,
        owner_aggregates,
        coverage_years: fetched.coverage_years,
        source: Some(fetched.source),
        is_partial: fetched.is_partial,
        notes: fetched.notes,
        source_error: None,
        stats,
    }
}
