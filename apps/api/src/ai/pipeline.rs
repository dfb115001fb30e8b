//! Steps shared by both AI endpoints:
//! storage fetch → token estimate → File API upload → poll until ACTIVE →
//! admission under the shared limiter → generate → reconcile token usage.
//! A quota-exceeded answer is retried once, through the limiter again.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::gemini::{GeminiClient, GeminiError, Part, UsageMetadata};
use crate::rate_limit::{Admission, Reservation, UsageLimiter};
use crate::state::AppState;
use crate::storage::{fetch_document, StoredDocument};

/// Upper bound on files attached to one request.
pub const MAX_FILES: usize = 10;
/// Used when a document's text cannot be extracted for counting.
const FALLBACK_DOCUMENT_TOKENS: u64 = 2_000;
/// Reserved for the model answer when reserving tokens up front.
const OUTPUT_TOKEN_RESERVE: u64 = 2_048;
/// Quota-exceeded answers are retried this many times, no more.
const MAX_QUOTA_RETRIES: u32 = 1;

pub struct PreparedFiles {
    pub parts: Vec<Part>,
    pub estimated_tokens: u64,
}

/// Rough token count: about four characters per token.
pub fn estimate_text_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

async fn estimate_document_tokens(doc: &StoredDocument) -> u64 {
    if doc.mime_type.starts_with("text/") {
        return estimate_text_tokens(&String::from_utf8_lossy(&doc.bytes));
    }
    if !doc.is_pdf() {
        return FALLBACK_DOCUMENT_TOKENS;
    }

    let bytes = doc.bytes.clone();
    let extracted =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;
    match extracted {
        Ok(Ok(text)) if !text.trim().is_empty() => estimate_text_tokens(&text),
        Ok(Ok(_)) => FALLBACK_DOCUMENT_TOKENS,
        Ok(Err(e)) => {
            warn!("Could not extract text from {} for token estimate: {e}", doc.key);
            FALLBACK_DOCUMENT_TOKENS
        }
        Err(e) => {
            warn!("PDF text extraction task failed for {}: {e}", doc.key);
            FALLBACK_DOCUMENT_TOKENS
        }
    }
}

/// Maps client failures to API errors: quota → 429, everything else → AI error with its message.
pub fn ai_error(context: &str, e: GeminiError) -> AppError {
    match e {
        GeminiError::QuotaExceeded { retry_after } => AppError::QuotaExceeded {
            retry_after_secs: retry_after.as_secs().max(1),
        },
        other => AppError::Ai(format!("{context}: {other}")),
    }
}

pub fn validate_file_ids(file_ids: &[String]) -> Result<(), AppError> {
    if file_ids.len() > MAX_FILES {
        return Err(AppError::Validation(format!(
            "at most {MAX_FILES} files per request, got {}",
            file_ids.len()
        )));
    }
    for id in file_ids {
        crate::storage::validate_key(id)?;
    }
    Ok(())
}

/// Fetches, uploads and activates every file, in order.
pub async fn prepare_files(
    state: &AppState,
    file_ids: &[String],
) -> Result<PreparedFiles, AppError> {
    let mut parts = Vec::with_capacity(file_ids.len());
    let mut estimated_tokens = 0;

    for key in file_ids {
        let doc = fetch_document(&state.s3, &state.config.s3_bucket, key).await?;
        estimated_tokens += estimate_document_tokens(&doc).await;
        let file = upload_and_activate(&state.gemini, &doc).await?;
        parts.push(Part::file(&file));
    }

    Ok(PreparedFiles {
        parts,
        estimated_tokens,
    })
}

async fn upload_and_activate(
    gemini: &GeminiClient,
    doc: &StoredDocument,
) -> Result<crate::gemini::GeminiFile, AppError> {
    let uploaded = gemini
        .upload_file(doc.bytes.to_vec(), doc.file_name(), &doc.mime_type)
        .await
        .map_err(|e| ai_error(&format!("Upload of {} failed", doc.key), e))?;
    gemini
        .wait_until_active(uploaded)
        .await
        .map_err(|e| ai_error(&format!("File {} not ready", doc.key), e))
}

/// Waits for a minute window to reopen as long as the total wait stays within
/// `max_wait`; a full day budget, or a longer wait, is reported as a 429.
pub async fn admit(
    limiter: &dyn UsageLimiter,
    estimated_tokens: u64,
    max_wait: Duration,
) -> Result<Reservation, AppError> {
    let mut waited = Duration::ZERO;
    loop {
        let admission = limiter
            .admit(estimated_tokens)
            .await
            .map_err(|e| AppError::RateLimiter(e.to_string()))?;

        match admission {
            Admission::Allowed(reservation) => return Ok(reservation),
            Admission::Exhausted(until_reset) => {
                return Err(AppError::QuotaExceeded {
                    retry_after_secs: until_reset.as_secs().max(1),
                })
            }
            Admission::Wait(delay) => {
                if waited + delay > max_wait {
                    return Err(AppError::QuotaExceeded {
                        retry_after_secs: delay.as_secs().max(1),
                    });
                }
                info!(
                    "AI usage window full, waiting {}s before retrying",
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
                waited += delay;
            }
        }
    }
}

async fn reconcile(limiter: &dyn UsageLimiter, reservation: Reservation, delta: i64) {
    if let Err(e) = limiter.record_tokens(reservation, delta).await {
        warn!("Could not reconcile token usage ({delta:+}): {e}");
    }
}

/// Whether the provider rejected the call before doing any work, so the tokens
/// reserved for it were never spent.
fn nothing_consumed(e: &GeminiError) -> bool {
    matches!(
        e,
        GeminiError::QuotaExceeded { .. } | GeminiError::Api { .. } | GeminiError::Http(_)
    )
}

/// Runs `call` under the limiter. Every attempt, the quota retry included, is
/// admitted first. Token usage is reconciled against the reservation's window,
/// and reservations of calls that consumed nothing are released.
async fn run_admitted<T, F, Fut>(
    limiter: &dyn UsageLimiter,
    estimated_tokens: u64,
    max_wait: Duration,
    context: &str,
    mut call: F,
) -> Result<(T, UsageMetadata), AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(T, UsageMetadata), GeminiError>>,
{
    let reserved = estimated_tokens + OUTPUT_TOKEN_RESERVE;
    let mut attempt = 0;
    loop {
        let reservation = admit(limiter, reserved, max_wait).await?;

        match call().await {
            Ok((answer, usage)) => {
                let delta = usage.total_token_count as i64 - reserved as i64;
                reconcile(limiter, reservation, delta).await;
                return Ok((answer, usage));
            }
            Err(e) => {
                if nothing_consumed(&e) {
                    reconcile(limiter, reservation, -(reserved as i64)).await;
                }
                match e {
                    GeminiError::QuotaExceeded { retry_after } if attempt < MAX_QUOTA_RETRIES => {
                        warn!(
                            "AI quota exceeded, retrying after {}ms",
                            retry_after.as_millis()
                        );
                        tokio::time::sleep(retry_after).await;
                        attempt += 1;
                    }
                    other => return Err(ai_error(context, other)),
                }
            }
        }
    }
}

/// Runs one admitted generation and returns the parsed JSON answer.
pub async fn generate_json<T: DeserializeOwned>(
    state: &AppState,
    parts: &[Part],
    system: &str,
    estimated_tokens: u64,
    context: &str,
) -> Result<(T, UsageMetadata), AppError> {
    run_admitted(
        state.limiter.as_ref(),
        estimated_tokens,
        state.config.rate_limit_max_wait,
        context,
        || state.gemini.generate_json::<T>(parts, system),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::rate_limit::LimiterError;

    /// Replays a fixed sequence of admissions and records every reconciliation.
    struct ScriptedLimiter {
        script: Mutex<Vec<Admission>>,
        calls: AtomicUsize,
        recorded: Mutex<Vec<(Reservation, i64)>>,
    }

    impl ScriptedLimiter {
        fn new(mut script: Vec<Admission>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
                recorded: Mutex::new(Vec::new()),
            }
        }

        fn recorded(&self) -> Vec<(Reservation, i64)> {
            self.recorded.lock().unwrap().clone()
        }
    }

    fn allowed(minute: u64) -> Admission {
        Admission::Allowed(Reservation { minute })
    }

    fn usage(total: u64) -> UsageMetadata {
        UsageMetadata {
            total_token_count: total,
            ..Default::default()
        }
    }

    fn quota(ms: u64) -> GeminiError {
        GeminiError::QuotaExceeded {
            retry_after: Duration::from_millis(ms),
        }
    }

    #[async_trait]
    impl UsageLimiter for ScriptedLimiter {
        async fn admit(&self, _estimated_tokens: u64) -> Result<Admission, LimiterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| LimiterError("script exhausted".into()))
        }

        async fn record_tokens(
            &self,
            reservation: Reservation,
            delta: i64,
        ) -> Result<(), LimiterError> {
            self.recorded.lock().unwrap().push((reservation, delta));
            Ok(())
        }
    }

    #[test]
    fn test_estimate_text_tokens_rounds_up() {
        assert_eq!(estimate_text_tokens(""), 0);
        assert_eq!(estimate_text_tokens("abcde"), 2);
        assert_eq!(estimate_text_tokens("edital"), 2);
    }

    #[test]
    fn test_too_many_files_rejected() {
        let ids: Vec<String> = (0..=MAX_FILES).map(|i| format!("editais/{i}.pdf")).collect();
        assert!(matches!(validate_file_ids(&ids), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_quota_error_becomes_429() {
        let err = ai_error(
            "generate",
            GeminiError::QuotaExceeded {
                retry_after: Duration::from_millis(400),
            },
        );
        assert!(matches!(err, AppError::QuotaExceeded { retry_after_secs: 1 }));
    }

    #[test]
    fn test_other_errors_keep_message() {
        let err = ai_error(
            "Proposal generation failed",
            GeminiError::Api {
                status: 400,
                message: "invalid argument".into(),
            },
        );
        assert!(matches!(err, AppError::Ai(msg) if msg.contains("invalid argument")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_admit_waits_then_succeeds() {
        let limiter = ScriptedLimiter::new(vec![
            Admission::Wait(Duration::from_secs(20)),
            allowed(7),
        ]);
        let reservation = admit(&limiter, 100, Duration::from_secs(60)).await.unwrap();
        assert_eq!(reservation, Reservation { minute: 7 });
        assert_eq!(limiter.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admit_gives_up_past_max_wait() {
        let limiter = ScriptedLimiter::new(vec![
            Admission::Wait(Duration::from_secs(40)),
            Admission::Wait(Duration::from_secs(40)),
        ]);
        let err = admit(&limiter, 100, Duration::from_secs(60)).await.unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded { retry_after_secs: 40 }));
    }

    #[tokio::test]
    async fn test_admit_daily_exhaustion_is_immediate() {
        let limiter = ScriptedLimiter::new(vec![Admission::Exhausted(Duration::from_secs(3_600))]);
        let err = admit(&limiter, 100, Duration::from_secs(60)).await.unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded { retry_after_secs: 3_600 }));
        assert_eq!(limiter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_limiter_backend_failure_surfaces() {
        let limiter = ScriptedLimiter::new(vec![]);
        let err = admit(&limiter, 1, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimiter(_)));
    }

    #[tokio::test]
    async fn test_success_reconciles_against_its_own_window() {
        let limiter = ScriptedLimiter::new(vec![allowed(3)]);
        let (answer, _) = run_admitted(&limiter, 1_000, Duration::ZERO, "generate", || async {
            Ok::<_, GeminiError>(("ok", usage(1_500)))
        })
        .await
        .unwrap();
        assert_eq!(answer, "ok");
        assert_eq!(
            limiter.recorded(),
            vec![(Reservation { minute: 3 }, 1_500 - (1_000 + OUTPUT_TOKEN_RESERVE as i64))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_retry_is_admitted_again() {
        let limiter = ScriptedLimiter::new(vec![allowed(10), allowed(11)]);
        let attempts = AtomicUsize::new(0);
        let (answer, _) = run_admitted(&limiter, 100, Duration::ZERO, "generate", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(quota(500))
                } else {
                    Ok(("ok", usage(50)))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(answer, "ok");
        assert_eq!(limiter.calls.load(Ordering::SeqCst), 2);
        let reserved = (100 + OUTPUT_TOKEN_RESERVE) as i64;
        assert_eq!(
            limiter.recorded(),
            vec![
                (Reservation { minute: 10 }, -reserved),
                (Reservation { minute: 11 }, 50 - reserved),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_retried_once_then_429() {
        let limiter = ScriptedLimiter::new(vec![allowed(1), allowed(1)]);
        let attempts = AtomicUsize::new(0);
        let err = run_admitted(&limiter, 100, Duration::ZERO, "generate", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<((), UsageMetadata), _>(quota(2_000)) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::QuotaExceeded { retry_after_secs: 2 }));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(limiter.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_call_releases_its_reservation() {
        let limiter = ScriptedLimiter::new(vec![allowed(4)]);
        let err = run_admitted(&limiter, 100, Duration::ZERO, "generate", || async {
            Err::<((), UsageMetadata), _>(GeminiError::Api {
                status: 400,
                message: "invalid argument".into(),
            })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Ai(_)));
        assert_eq!(
            limiter.recorded(),
            vec![(Reservation { minute: 4 }, -((100 + OUTPUT_TOKEN_RESERVE) as i64))]
        );
    }

    #[tokio::test]
    async fn test_unparsable_answer_keeps_its_reservation() {
        let limiter = ScriptedLimiter::new(vec![allowed(4)]);
        let err = run_admitted(&limiter, 100, Duration::ZERO, "generate", || async {
            Err::<((), UsageMetadata), _>(GeminiError::EmptyContent)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Ai(_)));
        assert!(limiter.recorded().is_empty());
    }
}
