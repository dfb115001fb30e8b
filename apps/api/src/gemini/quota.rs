//! Quota-exceeded detection and retry-delay selection for Gemini responses.

use std::time::Duration;

use serde_json::Value;

/// Base delay of the exponential fallback: 2s, 4s, 8s, ...
const BACKOFF_BASE_MS: u64 = 2_000;
const BACKOFF_CAP: Duration = Duration::from_secs(60);

/// True when an error response means "quota exceeded" rather than a hard failure.
pub fn is_quota_exceeded(status: u16, body: &str) -> bool {
    if status == 429 {
        return true;
    }
    let lower = body.to_lowercase();
    lower.contains("resource_exhausted") || lower.contains("quota exceeded")
}

/// Picks the delay before retrying a quota-exceeded call.
///
/// Order: `RetryInfo.retryDelay` in the error details, then a "retry in Ns"
/// hint in the message, then exponential backoff for `attempt` (0-based).
pub fn retry_delay(body: &str, attempt: u32) -> Duration {
    parse_retry_info(body)
        .or_else(|| parse_retry_hint(body))
        .map(|d| d.min(BACKOFF_CAP))
        .unwrap_or_else(|| backoff(attempt))
}

pub fn backoff(attempt: u32) -> Duration {
    let factor = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(BACKOFF_BASE_MS.saturating_mul(factor)).min(BACKOFF_CAP)
}

/// Reads `error.details[].retryDelay` (e.g. `"37s"`) from a Google RPC error body.
fn parse_retry_info(body: &str) -> Option<Duration> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .pointer("/error/details")?
        .as_array()?
        .iter()
        .filter_map(|detail| detail.get("retryDelay").and_then(Value::as_str))
        .find_map(parse_seconds)
}

/// Finds "retry in 12.5s" (any case) anywhere in the body.
fn parse_retry_hint(body: &str) -> Option<Duration> {
    let lower = body.to_lowercase();
    let start = lower.find("retry in ")? + "retry in ".len();
    let rest = &lower[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let number = &rest[..end];
    if !rest[end..].starts_with('s') {
        return None;
    }
    capped_seconds(number)
}

fn parse_seconds(raw: &str) -> Option<Duration> {
    capped_seconds(raw.trim().strip_suffix('s')?)
}

/// Parses a seconds count, clamped to the backoff cap before conversion.
fn capped_seconds(raw: &str) -> Option<Duration> {
    raw.parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| Duration::from_secs_f64(s.min(BACKOFF_CAP.as_secs_f64())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTA_BODY: &str = r#"{
        "error": {
            "code": 429,
            "message": "You exceeded your current quota. Please retry in 12.5s.",
            "status": "RESOURCE_EXHAUSTED",
            "details": [
                {"@type": "type.googleapis.com/google.rpc.QuotaFailure"},
                {"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "37s"}
            ]
        }
    }"#;

    #[test]
    fn test_429_is_quota() {
        assert!(is_quota_exceeded(429, ""));
    }

    #[test]
    fn test_resource_exhausted_body_is_quota() {
        assert!(is_quota_exceeded(400, QUOTA_BODY));
    }

    #[test]
    fn test_plain_500_is_not_quota() {
        assert!(!is_quota_exceeded(500, r#"{"error":{"message":"internal"}}"#));
    }

    #[test]
    fn test_retry_info_wins_over_message_hint() {
        assert_eq!(retry_delay(QUOTA_BODY, 0), Duration::from_secs(37));
    }

    #[test]
    fn test_message_hint_used_without_retry_info() {
        let body = "Quota exceeded for metric. Please retry in 12.5s.";
        assert_eq!(retry_delay(body, 0), Duration::from_millis(12_500));
    }

    #[test]
    fn test_falls_back_to_exponential_backoff() {
        assert_eq!(retry_delay("quota exceeded", 0), Duration::from_secs(2));
        assert_eq!(retry_delay("quota exceeded", 2), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff(10), Duration::from_secs(60));
        assert_eq!(backoff(200), Duration::from_secs(60));
    }

    #[test]
    fn test_huge_server_delay_is_capped() {
        let body = r#"{"error":{"details":[{"retryDelay":"3600s"}]}}"#;
        assert_eq!(retry_delay(body, 0), Duration::from_secs(60));
    }

    #[test]
    fn test_absurd_server_delays_are_capped() {
        let body = r#"{"error":{"details":[{"retryDelay":"1e30s"}]}}"#;
        assert_eq!(retry_delay(body, 0), Duration::from_secs(60));
        let body = "Please retry in 99999999999999999999999s.";
        assert_eq!(retry_delay(body, 0), Duration::from_secs(60));
    }
}
