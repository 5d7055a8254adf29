// src/utils/constants.rs

/// Key comparisons allowed for the substring fallback across one whole
/// resolution pass. The cap is a tunable latency guard, not a tuned
/// bound: raising it buys recall on long registries at linear
/// worst-case scan cost, lowering it converts tail-end lookups into
/// no-match answers sooner. Override per process with
/// `MATCH_SUBSTRING_BUDGET`.
pub const DEFAULT_SUBSTRING_BUDGET: usize = 200_000;

/// Index keys shorter than this never participate in substring
/// containment; short keys match half the registry.
pub const MIN_SUBSTRING_KEY_LEN: usize = 12;

/// Minimum character length for an organization stem to become an
/// index key.
pub const MIN_STEM_LEN: usize = 4;

/// Minimum spacing between live query calls, enforced process-wide.
pub const DEFAULT_MIN_CALL_INTERVAL_MS: u64 = 500;

/// Per-call ceiling for one live page request.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 15;

/// Pages fetched per coverage period before the period is cut off and
/// the response flagged partial.
pub const DEFAULT_MAX_PAGES_PER_PERIOD: u32 = 10;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Number of two-year coverage windows queried when the caller does
/// not pin a range.
pub const DEFAULT_COVERAGE_WINDOWS: usize = 3;
