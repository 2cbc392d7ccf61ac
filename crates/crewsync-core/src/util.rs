//! Shared utility functions used across multiple modules.

const MINUTE_MS: i64 = 60_000;

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current Unix timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Whole minutes elapsed between two millisecond timestamps, never negative.
pub const fn elapsed_minutes(since_ms: i64, now_ms: i64) -> i64 {
    let diff = now_ms.saturating_sub(since_ms);
    if diff <= 0 {
        0
    } else {
        diff / MINUTE_MS
    }
}

/// Render a millisecond timestamp as `HH:MM UTC`, falling back to the raw value.
pub fn format_clock_time(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%H:%M UTC").to_string(),
    )
}
