/// Gemini client. The single point of entry for all generative-AI calls.
///
/// No other module may call the provider directly. The File API (upload and
/// status polling) and `generateContent` both live here, together with
/// quota-exceeded detection.
use std::time::Duration;

use reqwest::{multipart, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub mod prompts;
pub mod quota;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const UPLOAD_URL: &str = "https://generativelanguage.googleapis.com/upload/v1beta/files";
/// The model used for every generation call. Hardcoded so prompts and quota stay in step.
pub const MODEL: &str = "gemini-2.0-flash";
const MAX_OUTPUT_TOKENS: u32 = 8192;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Quota exceeded; retry after {}s", .retry_after.as_secs())]
    QuotaExceeded { retry_after: Duration },

    #[error("File {0} failed processing")]
    FileFailed(String),

    #[error("File {name} not active after {}s", .waited.as_secs())]
    FileTimeout { name: String, waited: Duration },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Model returned empty content")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    StateUnspecified,
    Processing,
    Active,
    Failed,
    #[serde(other)]
    Unknown,
}

/// A file as reported by the File API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiFile {
    /// Resource name, `files/{id}`.
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub state: FileState,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: GeminiFile,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

/// One element of a prompt: either text or a reference to an uploaded file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    FileData(FileData),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn file(file: &GeminiFile) -> Self {
        Part::FileData(FileData {
            mime_type: file.mime_type.clone(),
            file_uri: file.uri.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: &'a [Part],
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
    #[serde(default)]
    pub total_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "usageMetadata")]
    usage_metadata: UsageMetadata,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenates the text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Text produced by a generation call plus the provider's token accounting.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub usage: UsageMetadata,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        poll_interval: Duration,
        poll_timeout: Duration,
    ) -> Result<Self, GeminiError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(180))
                .build()?,
            api_key,
            poll_interval,
            poll_timeout,
        })
    }

    /// Uploads raw bytes to the File API. The returned file is usually still PROCESSING.
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
        mime_type: &str,
    ) -> Result<GeminiFile, GeminiError> {
        let metadata = serde_json::json!({ "file": { "display_name": display_name } });
        let form = multipart::Form::new()
            .part(
                "metadata",
                multipart::Part::text(metadata.to_string()).mime_str("application/json")?,
            )
            .part(
                "file",
                multipart::Part::bytes(bytes)
                    .file_name(display_name.to_string())
                    .mime_str(mime_type)?,
            );

        let response = self
            .client
            .post(UPLOAD_URL)
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "multipart")
            .multipart(form)
            .send()
            .await?;

        let uploaded: UploadResponse = parse_success(response).await?;
        info!(
            "Uploaded {} to Gemini as {} ({:?})",
            display_name, uploaded.file.name, uploaded.file.state
        );
        Ok(uploaded.file)
    }

    pub async fn get_file(&self, name: &str) -> Result<GeminiFile, GeminiError> {
        let response = self
            .client
            .get(format!("{API_BASE}/{name}"))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;
        parse_success(response).await
    }

    /// Polls the file until it is ACTIVE. Fails on FAILED or once the poll timeout elapses.
    pub async fn wait_until_active(&self, file: GeminiFile) -> Result<GeminiFile, GeminiError> {
        if file.state == FileState::Active {
            return Ok(file);
        }

        let started = Instant::now();
        let mut current = file;
        loop {
            match current.state {
                FileState::Active => {
                    debug!(
                        "File {} active after {}ms",
                        current.name,
                        started.elapsed().as_millis()
                    );
                    return Ok(current);
                }
                FileState::Failed => return Err(GeminiError::FileFailed(current.name)),
                _ => {}
            }

            if started.elapsed() >= self.poll_timeout {
                return Err(GeminiError::FileTimeout {
                    name: current.name,
                    waited: started.elapsed(),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
            current = self.get_file(&current.name).await?;
        }
    }

    /// Runs one `generateContent` call with JSON output. A quota-exceeded answer
    /// comes back as `QuotaExceeded` carrying the provider-suggested delay (or
    /// backoff); the caller decides whether to retry, so every attempt passes
    /// through its usage limiter.
    pub async fn generate(&self, parts: &[Part], system: &str) -> Result<Generation, GeminiError> {
        let request_body = GenerateRequest {
            contents: vec![Content { role: "user", parts }],
            system_instruction: SystemInstruction {
                parts: vec![Part::text(system)],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.2,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(format!("{API_BASE}/models/{MODEL}:generateContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let parsed: GenerateResponse = response.json().await?;
            let text = parsed.text().ok_or(GeminiError::EmptyContent)?;
            debug!(
                "Gemini call succeeded: prompt_tokens={}, output_tokens={}",
                parsed.usage_metadata.prompt_token_count,
                parsed.usage_metadata.candidates_token_count
            );
            return Ok(Generation {
                text,
                usage: parsed.usage_metadata,
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(failure(status.as_u16(), body))
    }

    /// Calls the model and deserializes its text answer as JSON.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        parts: &[Part],
        system: &str,
    ) -> Result<(T, UsageMetadata), GeminiError> {
        let generation = self.generate(parts, system).await?;
        let value = serde_json::from_str(extract_json_payload(&generation.text))?;
        Ok((value, generation.usage))
    }
}

async fn parse_success<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GeminiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(api_error(status.as_u16(), body));
    }
    Ok(response.json().await?)
}

/// Classifies a failed `generateContent` response.
fn failure(status: u16, body: String) -> GeminiError {
    if quota::is_quota_exceeded(status, &body) {
        let retry_after = quota::retry_delay(&body, 0);
        warn!("Gemini quota exceeded, provider asks to wait {}ms", retry_after.as_millis());
        return GeminiError::QuotaExceeded { retry_after };
    }
    api_error(status, body)
}

fn api_error(status: u16, body: String) -> GeminiError {
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    GeminiError::Api { status, message }
}

/// Returns the JSON document inside a model answer: code fences are dropped, and
/// prose around a single object or array is cut away.
pub fn extract_json_payload(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        text = rest.trim_start();
        if let Some(inner) = text.strip_suffix("```") {
            text = inner.trim_end();
        }
    }

    if text.starts_with('{') || text.starts_with('[') {
        return text;
    }

    let start = text.find(|c: char| c == '{' || c == '[');
    let end = text.rfind(|c: char| c == '}' || c == ']');
    match (start, end) {
        (Some(s), Some(e)) if e > s => &text[s..=e],
        _ => text,
    }
}
