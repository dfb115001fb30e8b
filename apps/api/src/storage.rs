//! Object storage access for edital PDFs and supporting documents.

use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::{debug, info};

use crate::errors::AppError;

/// A document fetched from the bucket, ready to hand to the AI file API.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub key: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl StoredDocument {
    /// Last path segment of the key, used as the upload display name.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == "application/pdf"
    }
}

/// Rejects keys that could escape the bucket prefix layout or are obviously malformed.
pub fn validate_key(key: &str) -> Result<(), AppError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::Validation("file id cannot be empty".to_string()));
    }
    if key.starts_with('/') || key.split('/').any(|segment| segment == "..") {
        return Err(AppError::Validation(format!("invalid file id '{key}'")));
    }
    Ok(())
}

/// Mime type from the object metadata, falling back to the key's extension.
fn resolve_mime(key: &str, reported: Option<&str>) -> String {
    if let Some(reported) = reported.filter(|m| !m.is_empty() && *m != "binary/octet-stream") {
        return reported.to_string();
    }
    let ext = key.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
    .to_string()
}

pub async fn fetch_document(s3: &S3Client, bucket: &str, key: &str) -> Result<StoredDocument, AppError> {
    validate_key(key)?;
    debug!("Fetching s3://{bucket}/{key}");

    let object = s3
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| match e.as_service_error() {
            Some(service) if service.is_no_such_key() => {
                AppError::NotFound(format!("File {key} not found"))
            }
            _ => AppError::Storage(format!("get_object {key} failed: {e}")),
        })?;

    let mime_type = resolve_mime(key, object.content_type());
    let bytes = object
        .body
        .collect()
        .await
        .map_err(|e| AppError::Storage(format!("reading {key} failed: {e}")))?
        .into_bytes();

    info!("Fetched {key} ({} bytes, {mime_type})", bytes.len());
    Ok(StoredDocument {
        key: key.to_string(),
        mime_type,
        bytes,
    })
}
