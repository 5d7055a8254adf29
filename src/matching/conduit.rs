// src/matching/conduit.rs - Earmark detection and ultimate-recipient attribution
use std::collections::HashMap;

use crate::models::core::ContributionRecord;
use crate::models::matching::{AttributionResult, AttributionType, ConduitRollup, RecipientTotal};

/// Collectors known to forward contributions to other recipients.
/// Small and fixed; anything routed through one of these is earmarked
/// even without an explicit marker on the record.
pub const KNOWN_PASS_THROUGH_COLLECTORS: [&str; 5] = [
    "C00401224", // ActBlue
    "C00694323", // WinRed
    "C00495861", // NGP VAN conduit
    "C00551941", // Democracy Engine
    "C00637512", // Anedot
];

/// Forwarding language in free-text memo lines.
const FORWARDING_PHRASES: [&str; 6] = [
    "EARMARK",
    "EARMARKED",
    "CONDUIT",
    "CONTRIBUTION TO BE FORWARDED",
    "FORWARDED TO",
    "ATTRIBUTION TO",
];

pub fn is_pass_through_collector(collector_id: &str) -> bool {
    KNOWN_PASS_THROUGH_COLLECTORS.contains(&collector_id)
}

/// A contribution is earmarked when its immediate collector is a known
/// pass-through, or its markers say so (flag set, or memo text carries
/// forwarding language).
pub fn is_earmarked(contribution: &ContributionRecord) -> bool {
    if is_pass_through_collector(&contribution.collector_id) {
        return true;
    }
    match &contribution.earmark_markers {
        Some(markers) => {
            markers.flag
                || markers
                    .text
                    .as_deref()
                    .map(|text| {
                        let upper = text.to_uppercase();
                        FORWARDING_PHRASES.iter().any(|phrase| upper.contains(phrase))
                    })
                    .unwrap_or(false)
        }
        None => false,
    }
}

/// Classify one contribution's ultimate-recipient chain.
pub fn attribute(contribution: &ContributionRecord) -> AttributionResult {
    if is_earmarked(contribution) {
        match &contribution.recipient_candidate {
            Some(candidate) => AttributionResult {
                attribution_type: AttributionType::ConduitResolved,
                ultimate_recipient_id: candidate.id.clone(),
                ultimate_recipient_name: candidate.name.clone(),
            },
            None => AttributionResult {
                attribution_type: AttributionType::ConduitUnresolved,
                ultimate_recipient_id: String::new(),
                ultimate_recipient_name: String::new(),
            },
        }
    } else {
        AttributionResult {
            attribution_type: AttributionType::Direct,
            ultimate_recipient_id: contribution.collector_id.clone(),
            ultimate_recipient_name: contribution.collector_name.clone(),
        }
    }
}

fn pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part / whole) * 100.0
    } else {
        0.0
    }
}

/// Diagnostics rollup over one attributed set: how much money moved
/// through conduits, how much of that resolved, and where it landed.
pub fn rollup(
    contributions: &[ContributionRecord],
    attributions: &[AttributionResult],
    top_n: usize,
) -> ConduitRollup {
    let mut out = ConduitRollup {
        total_count: contributions.len(),
        ..Default::default()
    };
    let mut recipients: HashMap<String, RecipientTotal> = HashMap::new();

    for (contribution, attribution) in contributions.iter().zip(attributions) {
        out.total_amount += contribution.amount;
        match attribution.attribution_type {
            AttributionType::Direct => {}
            AttributionType::ConduitResolved => {
                out.conduit_count += 1;
                out.conduit_amount += contribution.amount;
                out.resolved_count += 1;
                out.resolved_amount += contribution.amount;
            }
            AttributionType::ConduitUnresolved => {
                out.conduit_count += 1;
                out.conduit_amount += contribution.amount;
                out.unresolved_count += 1;
                out.unresolved_amount += contribution.amount;
            }
        }
        if !attribution.ultimate_recipient_id.is_empty() {
            let entry = recipients
                .entry(attribution.ultimate_recipient_id.clone())
                .or_insert_with(|| RecipientTotal {
                    recipient_id: attribution.ultimate_recipient_id.clone(),
                    recipient_name: attribution.ultimate_recipient_name.clone(),
                    amount: 0.0,
                    count: 0,
                });
            entry.amount += contribution.amount;
            entry.count += 1;
        }
    }

    out.conduit_pct = pct(out.conduit_amount, out.total_amount);
    out.resolved_pct = pct(out.resolved_amount, out.conduit_amount);
    out.unresolved_pct = pct(out.unresolved_amount, out.conduit_amount);

    let mut totals: Vec<RecipientTotal> = recipients.into_values().collect();
    totals.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.recipient_id.cmp(&b.recipient_id))
    });
    totals.truncate(top_n);
    out.top_recipients = totals;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::{EarmarkMarkers, Location, Provenance, RecipientCandidate};

    fn contribution(
        collector_id: &str,
        amount: f64,
        candidate: Option<(&str, &str)>,
        markers: Option<EarmarkMarkers>,
    ) -> ContributionRecord {
        ContributionRecord {
            contributor_name: "MOSHE STERN".to_string(),
            amount,
            date: None,
            collector_id: collector_id.to_string(),
            collector_name: format!("COMMITTEE {collector_id}"),
            location: Location::default(),
            recipient_candidate: candidate.map(|(id, name)| RecipientCandidate {
                id: id.to_string(),
                name: name.to_string(),
            }),
            earmark_markers: markers,
            provenance: Provenance {
                record_id: format!("{collector_id}-{amount}"),
                source_document_ref: None,
            },
        }
    }

    #[test]
    fn pass_through_with_candidate_resolves_to_candidate() {
        let record = contribution("C00401224", 500.0, Some(("C00222222", "FRIENDS OF SMITH")), None);
        let result = attribute(&record);
        assert_eq!(result.attribution_type, AttributionType::ConduitResolved);
        assert_eq!(result.ultimate_recipient_id, "C00222222");
        assert_eq!(result.ultimate_recipient_name, "FRIENDS OF SMITH");
    }

    #[test]
    fn pass_through_without_candidate_is_unresolved_with_empty_fields() {
        let result = attribute(&contribution("C00401224", 500.0, None, None));
        assert_eq!(result.attribution_type, AttributionType::ConduitUnresolved);
        assert!(result.ultimate_recipient_id.is_empty());
        assert!(result.ultimate_recipient_name.is_empty());
    }

    #[test]
    fn ordinary_collector_is_direct_to_itself() {
        let result = attribute(&contribution("C00999999", 250.0, None, None));
        assert_eq!(result.attribution_type, AttributionType::Direct);
        assert_eq!(result.ultimate_recipient_id, "C00999999");
    }

    #[test]
    fn memo_text_forwarding_language_marks_earmark() {
        let markers = EarmarkMarkers {
            flag: false,
            text: Some("Earmarked for Friends of Smith".to_string()),
        };
        let record = contribution("C00999999", 100.0, Some(("C00222222", "FRIENDS OF SMITH")), Some(markers));
        assert!(is_earmarked(&record));
        assert_eq!(attribute(&record).attribution_type, AttributionType::ConduitResolved);
    }

    #[test]
    fn explicit_flag_marks_earmark_without_text() {
        let markers = EarmarkMarkers { flag: true, text: None };
        let record = contribution("C00999999", 100.0, None, Some(markers));
        assert!(is_earmarked(&record));
    }

    #[test]
    fn rollup_totals_and_percentages() {
        let records = vec![
            contribution("C00999999", 100.0, None, None),
            contribution("C00401224", 300.0, Some(("C00222222", "FRIENDS OF SMITH")), None),
            contribution("C00401224", 100.0, None, None),
        ];
        let attributions: Vec<_> = records.iter().map(attribute).collect();
        let rollup = rollup(&records, &attributions, 5);

        assert_eq!(rollup.total_count, 3);
        assert_eq!(rollup.total_amount, 500.0);
        assert_eq!(rollup.conduit_count, 2);
        assert_eq!(rollup.conduit_amount, 400.0);
        assert!((rollup.conduit_pct - 80.0).abs() < 1e-9);
        assert_eq!(rollup.resolved_count, 1);
        assert!((rollup.resolved_pct - 75.0).abs() < 1e-9);
        assert_eq!(rollup.unresolved_count, 1);
        assert!((rollup.unresolved_pct - 25.0).abs() < 1e-9);

        // top recipients exclude the unresolved (empty id) bucket
        assert_eq!(rollup.top_recipients.len(), 2);
        assert_eq!(rollup.top_recipients[0].recipient_id, "C00222222");
        assert_eq!(rollup.top_recipients[0].amount, 300.0);
    }

    #[test]
    fn rollup_of_empty_set_has_no_nan_percentages() {
        let rollup = rollup(&[], &[], 5);
        assert_eq!(rollup.conduit_pct, 0.0);
        assert_eq!(rollup.resolved_pct, 0.0);
        assert_eq!(rollup.unresolved_pct, 0.0);
    }
}
