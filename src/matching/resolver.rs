// src/matching/resolver.rs
use crate::matching::index::{LookupOutcome, MatchBudget, OwnerIndex};
use crate::models::core::ContributionRecord;

/// Resolve one contribution's contributor name against the owner
/// index. Stateless per call: the only cross-call state is the pass
/// budget the caller threads through, so a batch can be resolved in
/// any order (or in parallel with per-pass budgets).
pub fn resolve<'a>(
    contribution: &ContributionRecord,
    index: &'a OwnerIndex,
    budget: &mut MatchBudget,
) -> LookupOutcome<'a> {
    index.lookup(&contribution.contributor_name, budget)
}
