//! Model provider abstraction layer.
//!
//! Defines the two modality traits the composer depends on, plus the
//! HTTP helpers shared by every outbound client:
//! - [`Transcriber`]: speech-to-text ([`whisper::WhisperTranscriber`])
//! - [`Describer`]: image-to-text ([`vision::VisionDescriber`])

use async_trait::async_trait;
use regex::Regex;

use crate::config::HttpConfig;
use crate::media::MediaPayload;

pub mod vision;
pub mod whisper;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by model providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure (including timeouts).
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match expected schema.
    #[error("provider response parse error: {0}")]
    Parse(String),
    /// Upstream provider responded with an error status.
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
}

/// Speech-to-text failure.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    /// The backend call failed.
    #[error("transcription failed: {0}")]
    Provider(#[from] ProviderError),
    /// The upload form could not be built.
    #[error("invalid transcription upload: {0}")]
    InvalidUpload(String),
}

/// Image description failure.
#[derive(Debug, thiserror::Error)]
pub enum DescriptionError {
    /// The backend call failed.
    #[error("image description failed: {0}")]
    Provider(#[from] ProviderError),
    /// The model answered without any text.
    #[error("image description was empty")]
    Empty,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Converts an audio payload to text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `audio`. `mime_subtype` (e.g. `ogg`, `x-wav`) names the
    /// container so the backend can pick a decoder.
    ///
    /// # Errors
    ///
    /// Returns [`TranscriptionError`] on backend or upload failure.
    async fn transcribe(
        &self,
        audio: MediaPayload,
        mime_subtype: &str,
    ) -> Result<String, TranscriptionError>;
}

/// Converts an image payload to a textual description.
#[async_trait]
pub trait Describer: Send + Sync {
    /// Describe `image`, transcribing any visible text.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptionError`] on backend failure or an empty answer.
    async fn describe(&self, image: MediaPayload) -> Result<String, DescriptionError>;
}

// ---------------------------------------------------------------------------
// HTTP helpers (shared by all outbound clients)
// ---------------------------------------------------------------------------

/// Build a `reqwest` client with the configured connect and request timeouts.
///
/// # Errors
///
/// Returns the builder error when the TLS backend cannot be initialised.
pub fn http_client(http: &HttpConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(http.connect_timeout())
        .timeout(http.request_timeout())
        .build()
}

/// Check HTTP response status and return body text or a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure, `ProviderError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

/// Collapse whitespace, redact token-like values and truncate an error body
/// so it is safe to log.
pub fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"sk-proj-[A-Za-z0-9_\-]{10,}",
        r"sk-[A-Za-z0-9]{32,}",
        r"AC[0-9a-fA-F]{32}",
        r"eyJ[A-Za-z0-9_\-]{10,}\.[A-Za-z0-9_\-]+\.[A-Za-z0-9_\-]+",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}
