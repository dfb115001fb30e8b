//! Usage limiter for the generative-AI provider.
//!
//! Counters live in Redis so every API instance shares the same request/token
//! budget. Each admission bumps three windows atomically:
//!
//! - `{prefix}:rl:rpm:{minute}` requests in the current minute
//! - `{prefix}:rl:tpm:{minute}` estimated tokens in the current minute
//! - `{prefix}:rl:rpd:{day}`    requests in the current UTC day
//!
//! A denied admission rolls its increments back so rejected calls never eat quota.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_DAY: u64 = 86_400;

/// Provider quota, expressed per window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageLimits {
    pub requests_per_minute: u64,
    pub tokens_per_minute: u64,
    pub requests_per_day: u64,
}

/// Counter values observed after an admission's increments were applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCounts {
    pub minute_requests: u64,
    pub minute_tokens: u64,
    pub day_requests: u64,
}

/// Minute window that holds an admitted request's token reservation.
/// Reconciliation must target this window, not the one current at reconcile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub minute: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed(Reservation),
    /// The minute window is full; it reopens after the given delay.
    Wait(Duration),
    /// The daily budget is spent; the delay is the time until UTC midnight.
    Exhausted(Duration),
}

#[derive(Debug, thiserror::Error)]
#[error("rate limiter backend failure: {0}")]
pub struct LimiterError(pub String);

impl From<redis::RedisError> for LimiterError {
    fn from(e: redis::RedisError) -> Self {
        LimiterError(e.to_string())
    }
}

/// Shared limiter seam. Carried in `AppState` as `Arc<dyn UsageLimiter>`.
#[async_trait]
pub trait UsageLimiter: Send + Sync {
    /// Reserves one request and `estimated_tokens` tokens if the budget allows it.
    async fn admit(&self, estimated_tokens: u64) -> Result<Admission, LimiterError>;

    /// Adjusts the reservation's token counter once real usage is known.
    /// `delta` may be negative when the estimate overshot.
    async fn record_tokens(&self, reservation: Reservation, delta: i64) -> Result<(), LimiterError>;
}

/// Decides whether the counts (which already include this admission) fit the limits.
/// Daily exhaustion wins over minute pressure: waiting a minute would not help.
pub fn evaluate(counts: WindowCounts, limits: &UsageLimits, now_secs: u64) -> Admission {
    if counts.day_requests > limits.requests_per_day {
        let until_midnight = SECONDS_PER_DAY - now_secs % SECONDS_PER_DAY;
        return Admission::Exhausted(Duration::from_secs(until_midnight));
    }

    if counts.minute_requests > limits.requests_per_minute
        || counts.minute_tokens > limits.tokens_per_minute
    {
        let until_next_minute = SECONDS_PER_MINUTE - now_secs % SECONDS_PER_MINUTE;
        return Admission::Wait(Duration::from_secs(until_next_minute));
    }

    Admission::Allowed(Reservation {
        minute: now_secs / SECONDS_PER_MINUTE,
    })
}

/// Redis-backed limiter shared by every instance pointing at the same prefix.
#[derive(Clone)]
pub struct RedisUsageLimiter {
    client: redis::Client,
    prefix: String,
    limits: UsageLimits,
}

impl RedisUsageLimiter {
    pub fn new(client: redis::Client, prefix: impl Into<String>, limits: UsageLimits) -> Self {
        Self {
            client,
            prefix: prefix.into(),
            limits,
        }
    }

    fn minute_keys(&self, now_secs: u64) -> (String, String) {
        let minute = now_secs / SECONDS_PER_MINUTE;
        (
            format!("{}:rl:rpm:{minute}", self.prefix),
            self.token_key(minute),
        )
    }

    fn token_key(&self, minute: u64) -> String {
        format!("{}:rl:tpm:{minute}", self.prefix)
    }

    fn day_key(&self, now_secs: u64) -> String {
        format!("{}:rl:rpd:{}", self.prefix, now_secs / SECONDS_PER_DAY)
    }
}

#[async_trait]
impl UsageLimiter for RedisUsageLimiter {
    async fn admit(&self, estimated_tokens: u64) -> Result<Admission, LimiterError> {
        let now = unix_now()?;
        let (rpm_key, tpm_key) = self.minute_keys(now);
        let rpd_key = self.day_key(now);
        let tokens = i64::try_from(estimated_tokens).unwrap_or(i64::MAX);

        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (minute_requests, minute_tokens, day_requests): (i64, i64, i64) = redis::pipe()
            .atomic()
            .incr(&rpm_key, 1_i64)
            .expire(&rpm_key, 2 * SECONDS_PER_MINUTE as i64)
            .ignore()
            .incr(&tpm_key, tokens)
            .expire(&tpm_key, 2 * SECONDS_PER_MINUTE as i64)
            .ignore()
            .incr(&rpd_key, 1_i64)
            .expire(&rpd_key, 2 * SECONDS_PER_DAY as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;

        let counts = WindowCounts {
            minute_requests: minute_requests.max(0) as u64,
            minute_tokens: minute_tokens.max(0) as u64,
            day_requests: day_requests.max(0) as u64,
        };
        let admission = evaluate(counts, &self.limits, now);
        debug!(?counts, ?admission, "AI usage admission");

        if !matches!(admission, Admission::Allowed(_)) {
            warn!(?counts, "AI usage limit reached, rolling back reservation");
            redis::pipe()
                .atomic()
                .decr(&rpm_key, 1_i64)
                .ignore()
                .decr(&tpm_key, tokens)
                .ignore()
                .decr(&rpd_key, 1_i64)
                .ignore()
                .query_async::<_, ()>(&mut conn)
                .await?;
        }

        Ok(admission)
    }

    async fn record_tokens(&self, reservation: Reservation, delta: i64) -> Result<(), LimiterError> {
        if delta == 0 {
            return Ok(());
        }
        let tpm_key = self.token_key(reservation.minute);
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::pipe()
            .incr(&tpm_key, delta)
            .ignore()
            .expire(&tpm_key, 2 * SECONDS_PER_MINUTE as i64)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

fn unix_now() -> Result<u64, LimiterError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| LimiterError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> UsageLimits {
        UsageLimits {
            requests_per_minute: 15,
            tokens_per_minute: 1_000_000,
            requests_per_day: 1_500,
        }
    }

    fn counts(minute_requests: u64, minute_tokens: u64, day_requests: u64) -> WindowCounts {
        WindowCounts {
            minute_requests,
            minute_tokens,
            day_requests,
        }
    }

    #[test]
    fn test_within_all_windows_is_allowed() {
        assert_eq!(
            evaluate(counts(15, 1_000_000, 1_500), &limits(), 120),
            Admission::Allowed(Reservation { minute: 2 })
        );
    }

    #[test]
    fn test_request_overflow_waits_for_next_minute() {
        // 125s into the epoch → 55s until the minute rolls over.
        assert_eq!(
            evaluate(counts(16, 10, 20), &limits(), 125),
            Admission::Wait(Duration::from_secs(55))
        );
    }

    #[test]
    fn test_token_overflow_waits_for_next_minute() {
        assert_eq!(
            evaluate(counts(1, 1_000_001, 1), &limits(), 60),
            Admission::Wait(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_daily_exhaustion_takes_precedence() {
        let now = SECONDS_PER_DAY * 3 + 3_600;
        assert_eq!(
            evaluate(counts(99, 9_999_999, 1_501), &limits(), now),
            Admission::Exhausted(Duration::from_secs(SECONDS_PER_DAY - 3_600))
        );
    }

    #[test]
    fn test_keys_are_namespaced_by_window() {
        let client = redis::Client::open("redis://127.0.0.1:6379").unwrap();
        let limiter = RedisUsageLimiter::new(client, "origem", limits());
        let (rpm, tpm) = limiter.minute_keys(125);
        assert_eq!(rpm, "origem:rl:rpm:2");
        assert_eq!(tpm, "origem:rl:tpm:2");
        assert_eq!(limiter.day_key(SECONDS_PER_DAY + 5), "origem:rl:rpd:1");
    }

    #[test]
    fn test_reconciliation_targets_the_reserved_minute() {
        let client = redis::Client::open("redis://127.0.0.1:6379").unwrap();
        let limiter = RedisUsageLimiter::new(client, "origem", limits());
        // Admitted at t=59s, reconciled after the minute rolled over.
        let Admission::Allowed(reservation) = evaluate(counts(1, 4_096, 1), &limits(), 59) else {
            panic!("expected admission");
        };
        let (_, tpm_now) = limiter.minute_keys(75);
        assert_eq!(tpm_now, "origem:rl:tpm:1");
        assert_eq!(limiter.token_key(reservation.minute), "origem:rl:tpm:0");
    }
}
