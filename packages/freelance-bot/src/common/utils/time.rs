use chrono::{DateTime, Duration, Utc};

/// Upper bound for any day count turned into a cutoff (ten years).
pub const MAX_LOOKBACK_DAYS: i64 = 3650;

/// `now - days`. `None` unless `days` is in `1..=MAX_LOOKBACK_DAYS`.
///
/// Day counts arrive from env vars, the chats file and callback buttons, so
/// the arithmetic is checked instead of trusting `Utc::now() - days`.
pub fn days_ago(days: i64) -> Option<DateTime<Utc>> {
    if !(1..=MAX_LOOKBACK_DAYS).contains(&days) {
        return None;
    }
    Utc::now().checked_sub_signed(Duration::try_days(days)?)
}
