// src/matching/normalize.rs - Canonical name forms for owner matching
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Trailing legal-entity markers stripped when stemming organization
/// names. Checked token-by-token from the right, so "X SERVICES CO INC"
/// loses both "CO" and "INC".
pub const LEGAL_SUFFIXES: [&str; 26] = [
    "INC", "INCORPORATED", "CORP", "CORPORATION", "LLC", "LLP", "LP", "LTD", "LIMITED", "CO",
    "COMPANY", "PC", "PA", "PLLC", "PLC", "TRUST", "PARTNERSHIP", "GROUP", "ENTERPRISES",
    "VENTURES", "ASSOCIATES", "ASSOC", "INTL", "INTERNATIONAL", "FUND", "FOUNDATION",
];

/// Industry-generic words that may not stand alone as a stem or an
/// identifier. A name whose only distinctive content is one of these
/// cross-matches half the registry, so they are excluded outright.
pub const GENERIC_TERMS: [&str; 36] = [
    "SERVICES", "SERVICE", "CARE", "HEALTHCARE", "HEALTH", "MEDICAL", "NURSING", "REHAB",
    "REHABILITATION", "SENIOR", "LIVING", "CENTER", "CENTERS", "CENTRE", "VILLAGE", "MANOR",
    "HOME", "HOMES", "MANAGEMENT", "HOLDINGS", "PROPERTIES", "PROPERTY", "REALTY", "CAPITAL",
    "INVESTMENTS", "INVESTMENT", "CONSULTING", "OPERATIONS", "OPERATING", "FAMILY", "AMERICAN",
    "NATIONAL", "REGIONAL", "COMMUNITY", "PAVILION", "GARDENS",
];

static LEGAL_SUFFIX_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| LEGAL_SUFFIXES.iter().copied().collect());
static GENERIC_TERM_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| GENERIC_TERMS.iter().copied().collect());

pub fn is_legal_suffix(token: &str) -> bool {
    LEGAL_SUFFIX_SET.contains(token)
}

pub fn is_generic_term(token: &str) -> bool {
    GENERIC_TERM_SET.contains(token)
}

/// Canonicalize a free-text name: uppercase, strip everything outside
/// the alphanumeric/space alphabet, collapse whitespace. Digits are
/// kept so identifiers like "P20" stay distinguishable. Idempotent.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch.to_ascii_uppercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Drop single-letter tokens so "MOSHE A STERN" compares as
/// "MOSHE STERN". Display names are never altered; this is a matching
/// form only. Returns the input unchanged when dropping initials would
/// leave nothing.
pub fn collapse_middle_initials(name: &str) -> String {
    let kept: Vec<&str> = name
        .split_whitespace()
        .filter(|token| token.chars().count() > 1)
        .collect();
    if kept.is_empty() {
        name.to_string()
    } else {
        kept.join(" ")
    }
}

/// Strip trailing legal-entity suffixes from an organization name.
/// Returns `None` when nothing was stripped, when the remaining stem
/// is shorter than `min_len`, or when the stem is itself a generic
/// term (those stems cause false cross-matches).
pub fn stem_organization(name: &str, min_len: usize) -> Option<String> {
    let mut tokens: Vec<&str> = name.split_whitespace().collect();
    let original_len = tokens.len();
    while tokens.len() > 1 && is_legal_suffix(tokens[tokens.len() - 1]) {
        tokens.pop();
    }
    if tokens.len() == original_len {
        return None;
    }
    let stem = tokens.join(" ");
    if stem.len() < min_len || is_generic_term(&stem) {
        return None;
    }
    Some(stem)
}

/// First token that is neither a legal suffix nor a generic term. Two
/// names may only substring-match when their identifiers agree.
pub fn identifier(name: &str) -> Option<&str> {
    name.split_whitespace()
        .find(|token| !is_legal_suffix(token) && !is_generic_term(token))
}

/// Minimum length for the prefix form of identifier agreement.
const MIN_IDENTIFIER_PREFIX_LEN: usize = 5;

fn identifier_tokens_agree(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    (a.len() >= MIN_IDENTIFIER_PREFIX_LEN && b.starts_with(a))
        || (b.len() >= MIN_IDENTIFIER_PREFIX_LEN && a.starts_with(b))
}

/// Whether `id` anchors a whole word of `name` (exactly, or through
/// the length-guarded prefix relation). A bare substring inside a
/// longer word does not count.
fn identifier_anchors_word(name: &str, id: &str) -> bool {
    name.split_whitespace()
        .any(|word| identifier_tokens_agree(word, id))
}

/// The substring-match guard: identifiers must agree (exactly, or one
/// a length-≥5 prefix of the other) and each must anchor a whole word
/// in the other name. This is what keeps "ERP HOLDINGS" away from
/// "P20 HOLDINGS" despite the shared generic tail.
pub fn identifiers_agree(name_a: &str, name_b: &str) -> bool {
    let (id_a, id_b) = match (identifier(name_a), identifier(name_b)) {
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };
    identifier_tokens_agree(id_a, id_b)
        && identifier_anchors_word(name_b, id_a)
        && identifier_anchors_word(name_a, id_b)
}
