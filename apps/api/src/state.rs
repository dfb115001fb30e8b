use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::rate_limit::UsageLimiter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub gemini: GeminiClient,
    /// Request/token budget shared by every instance. Default: RedisUsageLimiter.
    pub limiter: Arc<dyn UsageLimiter>,
    pub config: Config,
}
