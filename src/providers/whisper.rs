//! OpenAI Whisper speech-to-text via `/audio/transcriptions`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use super::{check_http_response, http_client, ProviderError, Transcriber, TranscriptionError};
use crate::config::{HttpConfig, OpenAiConfig};
use crate::credentials::Secret;
use crate::media::{mime_subtype, MediaPayload};

/// Transcription response body (`response_format=json`).
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct TranscriptionResponse {
    /// Transcribed text.
    pub text: String,
}

/// Whisper-backed [`Transcriber`].
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: Secret,
    base_url: String,
    model: String,
}

impl WhisperTranscriber {
    /// Create a transcriber from OpenAI settings.
    ///
    /// # Errors
    ///
    /// Returns the client builder error when the TLS backend cannot be initialised.
    pub fn new(openai: &OpenAiConfig, http: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http_client(http)?,
            api_key: openai.api_key.clone(),
            base_url: openai.base_url.trim_end_matches('/').to_owned(),
            model: openai.transcription_model.clone(),
        })
    }

    /// Model identifier sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// File name hint for the upload: `voice_note.<subtype>` with any `x-`
/// prefix removed. Accepts a full MIME type or a bare subtype.
///
/// `audio/ogg` → `voice_note.ogg`, `x-wav` → `voice_note.wav`.
pub fn voice_note_filename(mime: &str) -> String {
    let subtype = mime_subtype(mime);
    let normalized = subtype.strip_prefix("x-").unwrap_or(subtype);
    format!("voice_note.{normalized}")
}

/// Parse a transcription response into its text.
///
/// # Errors
///
/// Returns `ProviderError::Parse` when the body is not the expected JSON.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<String, ProviderError> {
    let resp: TranscriptionResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(resp.text)
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(
        &self,
        audio: MediaPayload,
        mime_subtype: &str,
    ) -> Result<String, TranscriptionError> {
        let filename = voice_note_filename(mime_subtype);
        debug!(
            model = %self.model,
            %filename,
            bytes = audio.len(),
            "sending audio for transcription"
        );

        let file_part = Part::bytes(audio.bytes)
            .file_name(filename)
            .mime_str(&audio.mime_type)
            .map_err(|e| TranscriptionError::InvalidUpload(e.to_string()))?;

        let form = Form::new()
            .text("model", self.model.clone())
            .text("response_format", "json")
            .part("file", file_part);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose())
            .multipart(form)
            .send()
            .await
            .map_err(ProviderError::from)?;

        let payload = check_http_response(response).await?;
        Ok(parse_response(&payload)?)
    }
}
