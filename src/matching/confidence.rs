// src/matching/confidence.rs - Composite match scoring and banding
use strsim::jaro_winkler;

use crate::matching::normalize::{
    collapse_middle_initials, identifiers_agree, is_generic_term, normalize, stem_organization,
};
use crate::models::core::{ContributionRecord, Location, OwnerRecord};
use crate::models::matching::{ConfidenceBand, MatchResult};
use crate::utils::constants::MIN_STEM_LEN;

/// Name-similarity ladder (0-100). Structural matches score above the
/// guardrail; anything weaker falls through to graded fuzzy
/// similarity.
const SIM_EXACT: u32 = 100;
const SIM_SAME_PERSON: u32 = 95;
const SIM_SHARED_STEM: u32 = 88;
const SIM_GUARDED_SUBSTRING: u32 = 80;

/// Composite points available per component.
const NAME_SCORE_MAX: u32 = 70;
const GEO_FULL_AGREEMENT: u32 = 25;
const GEO_STATE_ONLY: u32 = 15;
const GEO_SIDE_MISSING: u32 = 10;
const EXACT_BONUS: u32 = 5;

/// Below this name similarity the band is forced to VeryLow no matter
/// how well geography corroborates.
const SIMILARITY_GUARDRAIL: u32 = 70;

/// Minimum combined length before substring containment is considered
/// at all in the similarity ladder.
const MIN_CONTAINMENT_LEN: usize = 12;

/// Score one resolved (contribution, owner) pair into a MatchResult.
pub fn score(contribution: &ContributionRecord, owner: &OwnerRecord) -> MatchResult {
    let query = normalize(&contribution.contributor_name);
    let owner_name = normalize(&owner.name_normalized);

    let similarity = name_similarity(&query, &owner_name);
    let name_score = (similarity * NAME_SCORE_MAX + 50) / 100;
    let geo_score = geo_agreement(&contribution.location, &owner.location);
    let exact_bonus = if loosely_identical(&query, &owner_name) {
        EXACT_BONUS
    } else {
        0
    };

    let composite_score = (name_score + geo_score + exact_bonus).min(100);
    let mut band = ConfidenceBand::from_composite(composite_score);
    if similarity < SIMILARITY_GUARDRAIL {
        band = ConfidenceBand::VeryLow;
    }
    // missing location data should not strand a structurally close
    // name in the bottom bands
    if matches!(band, ConfidenceBand::Low | ConfidenceBand::VeryLow)
        && names_very_close(&query, &owner_name)
    {
        band = ConfidenceBand::Moderate;
    }

    MatchResult {
        owner_key: owner_name,
        composite_score,
        band,
        name_score,
        geo_score,
        exact_bonus,
        transparency_label: transparency_label(band, geo_score),
    }
}

/// Graded name similarity on normalized forms.
pub fn name_similarity(query: &str, owner_name: &str) -> u32 {
    if query.is_empty() || owner_name.is_empty() {
        return 0;
    }
    if query == owner_name {
        return SIM_EXACT;
    }
    if same_person(query, owner_name) {
        return SIM_SAME_PERSON;
    }
    if shared_stem(query, owner_name) {
        return SIM_SHARED_STEM;
    }
    if guarded_containment(query, owner_name) {
        return SIM_GUARDED_SUBSTRING;
    }
    (jaro_winkler(query, owner_name) * 100.0).round() as u32
}

/// Same word multiset, middle initials collapsed: "MOSHE A STERN" and
/// "STERN MOSHE" are the same person.
fn same_person(a: &str, b: &str) -> bool {
    let multiset = |name: &str| {
        let collapsed = collapse_middle_initials(name);
        let mut words: Vec<String> = collapsed.split_whitespace().map(str::to_string).collect();
        words.sort();
        words
    };
    multiset(a) == multiset(b)
}

fn shared_stem(a: &str, b: &str) -> bool {
    let stem_of = |name: &str| {
        stem_organization(name, MIN_STEM_LEN).unwrap_or_else(|| name.to_string())
    };
    let (sa, sb) = (stem_of(a), stem_of(b));
    !sa.is_empty() && sa == sb && !is_generic_term(&sa)
}

fn guarded_containment(a: &str, b: &str) -> bool {
    let long_enough = a.len().max(b.len()) >= MIN_CONTAINMENT_LEN;
    long_enough && (a.contains(b) || b.contains(a)) && identifiers_agree(a, b)
}

/// Geographic corroboration. Absence of location data on either side
/// is a gap in the source, not a disagreement, and is never penalized
/// as harshly as a confirmed different state.
fn geo_agreement(contribution: &Location, owner: &Location) -> u32 {
    match (&contribution.state, &owner.state) {
        (Some(cs), Some(os)) if cs.eq_ignore_ascii_case(os) => {
            match (&contribution.city, &owner.city) {
                (Some(cc), Some(oc)) if cc.eq_ignore_ascii_case(oc) => GEO_FULL_AGREEMENT,
                _ => GEO_STATE_ONLY,
            }
        }
        (Some(_), Some(_)) => 0,
        _ => GEO_SIDE_MISSING,
    }
}

/// Case/punctuation/suffix-insensitive identity for the exact bonus.
fn loosely_identical(query: &str, owner_name: &str) -> bool {
    let strip = |name: &str| {
        stem_organization(name, 1).unwrap_or_else(|| name.to_string())
    };
    !query.is_empty() && strip(query) == strip(owner_name)
}

/// Independent structural closeness test used to promote bands when
/// one side's location is simply missing: shared stem, one name's
/// words a subset of the other's, or at least two shared non-generic
/// words.
fn names_very_close(a: &str, b: &str) -> bool {
    if shared_stem(a, b) {
        return true;
    }
    fn words(name: &str) -> std::collections::HashSet<&str> {
        name.split_whitespace().collect()
    }
    let (wa, wb) = (words(a), words(b));
    if wa.is_empty() || wb.is_empty() {
        return false;
    }
    if wa.is_subset(&wb) || wb.is_subset(&wa) {
        return true;
    }
    let shared_distinctive = wa
        .intersection(&wb)
        .filter(|w| !is_generic_term(w) && w.len() > 1)
        .count();
    shared_distinctive >= 2
}

fn transparency_label(band: ConfidenceBand, geo_score: u32) -> String {
    let base = match band {
        ConfidenceBand::VeryHigh => "name and location confirmed",
        ConfidenceBand::High => "strong name match",
        ConfidenceBand::Moderate => "probable match",
        ConfidenceBand::Low => "weak match",
        ConfidenceBand::VeryLow => "unlikely match",
    };
    if geo_score == GEO_SIDE_MISSING {
        format!("{base} (location data incomplete)")
    } else {
        base.to_string()
    }
}
