/// How long a cached record stays usable, in seconds.
pub const FRESHNESS_WINDOW_SECS: i64 = 3600;

/// A record written at `record_ts` may still be served at `now`.
///
/// Only the upper bound is checked, so a record stamped in the future
/// (clock skew) counts as fresh.
pub fn is_fresh(record_ts: i64, now: i64) -> bool {
    now.saturating_sub(record_ts) <= FRESHNESS_WINDOW_SECS
}
