// src/matching/index.rs - Multi-key owner lookup with bounded fallback
use log::debug;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::matching::normalize::{
    collapse_middle_initials, identifiers_agree, is_generic_term, normalize, stem_organization,
};
use crate::models::core::{OwnerRecord, OwnerType};
use crate::utils::constants::{DEFAULT_SUBSTRING_BUDGET, MIN_STEM_LEN, MIN_SUBSTRING_KEY_LEN};

/// Iteration budget for the substring fallback, scoped to one
/// resolution pass and shared across every lookup in it. Exhaustion
/// turns remaining fallback scans into immediate no-match answers
/// instead of letting a pass degrade to unbounded scan time.
#[derive(Debug)]
pub struct MatchBudget {
    remaining: usize,
    exhausted: bool,
}

impl MatchBudget {
    pub fn new(cap: usize) -> Self {
        Self {
            remaining: cap,
            exhausted: false,
        }
    }

    pub fn standard() -> Self {
        Self::new(DEFAULT_SUBSTRING_BUDGET)
    }

    /// Spend one key comparison. Returns false once the cap is hit.
    pub fn try_consume(&mut self) -> bool {
        if self.remaining == 0 {
            self.exhausted = true;
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

/// Ordered lookup strategies, tried with early exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupStrategy {
    CrossReference,
    Exact,
    Reordered,
    Stemmed,
    Substring,
}

impl LookupStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CrossReference => "cross-reference",
            Self::Exact => "exact",
            Self::Reordered => "reordered",
            Self::Stemmed => "stemmed",
            Self::Substring => "substring",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// No owner matched. Expected and common; not a failure.
    NotFound,
    /// The fallback scan ran out of budget before completing. Reported
    /// as no-match, never as a partial-scan guess.
    BudgetExhausted,
}

#[derive(Debug)]
pub enum LookupOutcome<'a> {
    Hit {
        owner: &'a OwnerRecord,
        strategy: LookupStrategy,
    },
    Miss(MissReason),
}

impl<'a> LookupOutcome<'a> {
    pub fn owner(&self) -> Option<&'a OwnerRecord> {
        match self {
            Self::Hit { owner, .. } => Some(owner),
            Self::Miss(_) => None,
        }
    }
}

/// Read-only lookup structure over the owner registry. Built once per
/// process; lookups never mutate it, so concurrent passes only share
/// their own budgets, not index state.
pub struct OwnerIndex {
    owners: Vec<OwnerRecord>,
    /// Normalized name variants (original, space-stripped, collapsed
    /// initials, swapped two-word individual order) -> owner.
    by_key: HashMap<String, usize>,
    /// Organization stems -> owner. Colliding stems are excluded
    /// outright rather than arbitrarily assigned.
    stem_keys: HashMap<String, usize>,
    /// Cross-reference alias names -> owner, resolved via internal id.
    aliases: HashMap<String, usize>,
    by_internal_id: HashMap<String, usize>,
}

impl OwnerIndex {
    pub fn build(owners: Vec<OwnerRecord>) -> Self {
        Self::build_with_aliases(owners, &HashMap::new())
    }

    /// `alias_to_internal_id` carries the cross-reference mapping:
    /// alternate filing names keyed to an owner's stable internal id.
    pub fn build_with_aliases(
        owners: Vec<OwnerRecord>,
        alias_to_internal_id: &HashMap<String, String>,
    ) -> Self {
        let mut by_key: HashMap<String, usize> = HashMap::new();
        let mut stem_keys: HashMap<String, usize> = HashMap::new();
        let mut ambiguous_stems: HashSet<String> = HashSet::new();
        let mut by_internal_id: HashMap<String, usize> = HashMap::new();

        for (i, owner) in owners.iter().enumerate() {
            if let Some(id) = &owner.internal_id {
                by_internal_id.entry(id.clone()).or_insert(i);
            }

            let name = normalize(&owner.name_normalized);
            if name.is_empty() {
                continue;
            }

            let mut variants = vec![name.clone(), name.replace(' ', "")];
            let collapsed = collapse_middle_initials(&name);
            if collapsed != name {
                variants.push(collapsed.clone());
            }
            if owner.owner_type == OwnerType::Individual {
                let words: Vec<&str> = collapsed.split_whitespace().collect();
                if words.len() == 2 {
                    variants.push(format!("{} {}", words[1], words[0]));
                }
            }
            for variant in variants {
                if variant.is_empty() {
                    continue;
                }
                match by_key.entry(variant) {
                    Entry::Vacant(e) => {
                        e.insert(i);
                    }
                    Entry::Occupied(e) => {
                        if *e.get() != i {
                            debug!(
                                "Index: key '{}' already owned by record {}, keeping first",
                                e.key(),
                                e.get()
                            );
                        }
                    }
                }
            }

            if owner.owner_type == OwnerType::Organization {
                if let Some(stem) = stem_organization(&name, MIN_STEM_LEN) {
                    if ambiguous_stems.contains(&stem) {
                        continue;
                    }
                    match stem_keys.entry(stem) {
                        Entry::Vacant(e) => {
                            e.insert(i);
                        }
                        Entry::Occupied(e) => {
                            if *e.get() != i {
                                debug!("Index: ambiguous stem key '{}' excluded", e.key());
                                let (stem, _) = e.remove_entry();
                                ambiguous_stems.insert(stem);
                            }
                        }
                    }
                }
            }
        }

        let mut aliases: HashMap<String, usize> = HashMap::new();
        for (alias, internal_id) in alias_to_internal_id {
            let key = normalize(alias);
            if key.is_empty() {
                continue;
            }
            if let Some(&i) = by_internal_id.get(internal_id) {
                aliases.entry(key).or_insert(i);
            } else {
                debug!(
                    "Index: alias '{}' references unknown internal id {}",
                    alias, internal_id
                );
            }
        }

        Self {
            owners,
            by_key,
            stem_keys,
            aliases,
            by_internal_id,
        }
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn key_count(&self) -> usize {
        self.by_key.len() + self.stem_keys.len() + self.aliases.len()
    }

    pub fn owners(&self) -> &[OwnerRecord] {
        &self.owners
    }

    pub fn lookup_internal_id(&self, internal_id: &str) -> Option<&OwnerRecord> {
        self.by_internal_id.get(internal_id).map(|&i| &self.owners[i])
    }

    /// Direct key access for callers that already hold a normalized
    /// owner key (e.g. aggregation over match results).
    pub fn find_exact(&self, normalized_key: &str) -> Option<&OwnerRecord> {
        self.by_key.get(normalized_key).map(|&i| &self.owners[i])
    }

    /// Resolve a raw contributor name. Strategies run in fixed order
    /// with early exit; only the final substring fallback draws on the
    /// pass budget.
    pub fn lookup<'a>(&'a self, raw_name: &str, budget: &mut MatchBudget) -> LookupOutcome<'a> {
        let query = normalize(raw_name);
        if query.is_empty() {
            return LookupOutcome::Miss(MissReason::NotFound);
        }

        if let Some(&i) = self.aliases.get(&query) {
            return self.hit(i, LookupStrategy::CrossReference);
        }
        if let Some(i) = self.lookup_exact(&query) {
            return self.hit(i, LookupStrategy::Exact);
        }
        if let Some(i) = self.lookup_reordered(&query) {
            return self.hit(i, LookupStrategy::Reordered);
        }
        if let Some(i) = self.lookup_stemmed(&query) {
            return self.hit(i, LookupStrategy::Stemmed);
        }
        if budget.is_exhausted() {
            return LookupOutcome::Miss(MissReason::BudgetExhausted);
        }
        match self.lookup_substring(&query, budget) {
            Ok(Some(i)) => self.hit(i, LookupStrategy::Substring),
            Ok(None) => LookupOutcome::Miss(MissReason::NotFound),
            Err(reason) => LookupOutcome::Miss(reason),
        }
    }

    fn hit(&self, i: usize, strategy: LookupStrategy) -> LookupOutcome<'_> {
        LookupOutcome::Hit {
            owner: &self.owners[i],
            strategy,
        }
    }

    fn lookup_exact(&self, query: &str) -> Option<usize> {
        if let Some(&i) = self.by_key.get(query) {
            return Some(i);
        }
        let collapsed = collapse_middle_initials(query);
        if collapsed != query {
            if let Some(&i) = self.by_key.get(&collapsed) {
                return Some(i);
            }
        }
        let squeezed = query.replace(' ', "");
        if squeezed != query {
            return self.by_key.get(&squeezed).copied();
        }
        None
    }

    fn lookup_reordered(&self, query: &str) -> Option<usize> {
        for form in [query.to_string(), collapse_middle_initials(query)] {
            for candidate in reorderings(&form) {
                if let Some(&i) = self.by_key.get(&candidate) {
                    return Some(i);
                }
            }
        }
        None
    }

    fn lookup_stemmed(&self, query: &str) -> Option<usize> {
        let stem = stem_organization(query, MIN_STEM_LEN).unwrap_or_else(|| query.to_string());
        let &i = self.stem_keys.get(&stem)?;
        let owner_name = normalize(&self.owners[i].name_normalized);
        // a stem hit alone is not enough: stem-key collisions with a
        // different identifier must not resolve
        if identifiers_agree(query, &owner_name) {
            Some(i)
        } else {
            None
        }
    }

    fn lookup_substring(
        &self,
        query: &str,
        budget: &mut MatchBudget,
    ) -> Result<Option<usize>, MissReason> {
        let mut best: Option<(usize, &str)> = None;
        for (key, &i) in &self.by_key {
            if !budget.try_consume() {
                return Err(MissReason::BudgetExhausted);
            }
            if key.len() < MIN_SUBSTRING_KEY_LEN || is_generic_term(key) {
                continue;
            }
            if !(key.contains(query) || query.contains(key.as_str())) {
                continue;
            }
            if !identifiers_agree(query, key) {
                continue;
            }
            let better = match best {
                None => true,
                // most specific wins; lexicographic on equal length
                // keeps map iteration order out of the result
                Some((_, held)) => {
                    key.len() > held.len() || (key.len() == held.len() && key.as_str() < held)
                }
            };
            if better {
                best = Some((i, key.as_str()));
            }
        }
        Ok(best.map(|(i, _)| i))
    }
}

fn reorderings(query: &str) -> Vec<String> {
    let w: Vec<&str> = query.split_whitespace().collect();
    match w.len() {
        // "Last First" <-> "First Last"
        2 => vec![format!("{} {}", w[1], w[0])],
        // "Last First Middle" and "Middle Last First" conventions
        3 => vec![
            format!("{} {} {}", w[1], w[2], w[0]),
            format!("{} {} {}", w[2], w[0], w[1]),
            format!("{} {} {}", w[2], w[1], w[0]),
        ],
        4 => vec![
            format!("{} {} {} {}", w[1], w[2], w[3], w[0]),
            format!("{} {} {} {}", w[3], w[0], w[1], w[2]),
        ],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::Location;

    fn owner(name: &str, owner_type: OwnerType) -> OwnerRecord {
        OwnerRecord {
            name_normalized: name.to_string(),
            name_original: name.to_string(),
            owner_type,
            facilities: Vec::new(),
            internal_id: None,
            location: Location::default(),
        }
    }

    fn lookup_name<'a>(index: &'a OwnerIndex, name: &str) -> Option<&'a OwnerRecord> {
        let mut budget = MatchBudget::standard();
        index.lookup(name, &mut budget).owner()
    }

    #[test]
    fn exact_lookup_hits_normalized_key() {
        let index = OwnerIndex::build(vec![owner("PRUITTHEALTH INC", OwnerType::Organization)]);
        assert!(lookup_name(&index, "PruittHealth, Inc.").is_some());
    }

    #[test]
    fn two_word_individuals_match_in_either_order() {
        let index = OwnerIndex::build(vec![owner("MOSHE STERN", OwnerType::Individual)]);
        assert!(lookup_name(&index, "STERN MOSHE").is_some());
    }

    #[test]
    fn middle_initials_collapse_in_both_directions() {
        let index = OwnerIndex::build(vec![owner("MOSHE A STERN", OwnerType::Individual)]);
        assert!(lookup_name(&index, "MOSHE STERN").is_some());

        let index = OwnerIndex::build(vec![owner("MOSHE STERN", OwnerType::Individual)]);
        assert!(lookup_name(&index, "MOSHE A STERN").is_some());
        // the stored record is untouched by the collapse
        assert_eq!(index.owners()[0].name_normalized, "MOSHE STERN");
    }

    #[test]
    fn reordered_lookup_handles_last_first_middle() {
        let index = OwnerIndex::build(vec![owner("MOSHE A STERN", OwnerType::Individual)]);
        assert!(lookup_name(&index, "STERN MOSHE A").is_some());
    }

    #[test]
    fn stem_equality_matches_differing_suffixes() {
        let index = OwnerIndex::build(vec![owner("PRUITTHEALTH INC", OwnerType::Organization)]);
        let mut budget = MatchBudget::standard();
        match index.lookup("PRUITTHEALTH CORPORATION", &mut budget) {
            LookupOutcome::Hit { owner, strategy } => {
                assert_eq!(owner.name_normalized, "PRUITTHEALTH INC");
                assert_eq!(strategy, LookupStrategy::Stemmed);
            }
            LookupOutcome::Miss(reason) => panic!("expected stem hit, got {reason:?}"),
        }
    }

    #[test]
    fn colliding_stems_are_excluded_not_arbitrarily_assigned() {
        let index = OwnerIndex::build(vec![
            owner("ALPHACREST HOLDINGS INC", OwnerType::Organization),
            owner("ALPHACREST HOLDINGS LLC", OwnerType::Organization),
        ]);
        let mut budget = MatchBudget::standard();
        // stem key was dropped; containment does not apply either
        match index.lookup("ALPHACREST HOLDINGS CORP", &mut budget) {
            LookupOutcome::Miss(MissReason::NotFound) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn generic_tail_does_not_cross_match() {
        let index = OwnerIndex::build(vec![owner("P20 HOLDINGS LLC", OwnerType::Organization)]);
        let mut budget = MatchBudget::standard();
        match index.lookup("ERP HOLDINGS LLC", &mut budget) {
            LookupOutcome::Miss(MissReason::NotFound) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn substring_fallback_prefers_longest_qualifying_key() {
        let index = OwnerIndex::build(vec![
            owner("BROOKDALE SENIOR LIVING", OwnerType::Organization),
            owner(
                "BROOKDALE SENIOR LIVING COMMUNITIES INC",
                OwnerType::Organization,
            ),
        ]);
        let mut budget = MatchBudget::standard();
        match index.lookup("BROOKDALE SENIOR", &mut budget) {
            LookupOutcome::Hit { owner, strategy } => {
                assert_eq!(strategy, LookupStrategy::Substring);
                assert_eq!(
                    owner.name_normalized,
                    "BROOKDALE SENIOR LIVING COMMUNITIES INC"
                );
            }
            LookupOutcome::Miss(reason) => panic!("expected substring hit, got {reason:?}"),
        }
    }

    #[test]
    fn exhausted_budget_reports_no_match_and_skips_later_scans() {
        let owners: Vec<OwnerRecord> = (0..20)
            .map(|i| {
                owner(
                    &format!("WESTBROOK CONTINUING CARE {i:02}"),
                    OwnerType::Organization,
                )
            })
            .collect();
        let index = OwnerIndex::build(owners);

        let mut budget = MatchBudget::new(5);
        match index.lookup("UNRELATED QUERY NAME", &mut budget) {
            LookupOutcome::Miss(MissReason::BudgetExhausted) => {}
            other => panic!("expected BudgetExhausted, got {other:?}"),
        }
        assert!(budget.is_exhausted());
        assert_eq!(budget.remaining(), 0);

        // later lookups in the same pass skip the scan entirely
        match index.lookup("ANOTHER UNRELATED NAME", &mut budget) {
            LookupOutcome::Miss(MissReason::BudgetExhausted) => {}
            other => panic!("expected BudgetExhausted, got {other:?}"),
        }
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn budget_consumption_never_exceeds_cap() {
        let owners: Vec<OwnerRecord> = (0..50)
            .map(|i| owner(&format!("MERIDIAN POINTE GROUP {i:02}"), OwnerType::Organization))
            .collect();
        let index = OwnerIndex::build(owners);

        let cap = 120;
        let mut budget = MatchBudget::new(cap);
        for i in 0..10 {
            let _ = index.lookup(&format!("NOSUCH OWNER {i}"), &mut budget);
        }
        assert!(budget.remaining() <= cap);
    }

    #[test]
    fn cross_reference_alias_takes_priority() {
        let mut target = owner("STERLING OAKS MANAGEMENT LLC", OwnerType::Organization);
        target.internal_id = Some("OWN-0042".to_string());
        let decoy = owner("STERLING FILING SERVICES LLC", OwnerType::Organization);

        let mut aliases = HashMap::new();
        aliases.insert("Sterling Filing Services LLC".to_string(), "OWN-0042".to_string());

        let index = OwnerIndex::build_with_aliases(vec![target, decoy], &aliases);
        let mut budget = MatchBudget::standard();
        match index.lookup("STERLING FILING SERVICES LLC", &mut budget) {
            LookupOutcome::Hit { owner, strategy } => {
                assert_eq!(strategy, LookupStrategy::CrossReference);
                assert_eq!(owner.internal_id.as_deref(), Some("OWN-0042"));
            }
            LookupOutcome::Miss(reason) => panic!("expected alias hit, got {reason:?}"),
        }
        assert!(index.lookup_internal_id("OWN-0042").is_some());
    }
}
