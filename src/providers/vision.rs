//! Image description through an OpenAI vision-capable chat model.
//!
//! The image travels inline as a base64 `data:` URL next to a fixed
//! instruction asking for a detailed description and a transcription of
//! any visible text.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_http_response, http_client, DescriptionError, Describer, ProviderError};
use crate::config::{HttpConfig, OpenAiConfig};
use crate::credentials::Secret;
use crate::media::MediaPayload;

/// Instruction sent alongside every image.
pub const DESCRIBE_PROMPT: &str =
    "Describe this image in detail. If it contains text, transcribe it.";

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Chat completions request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct VisionRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages (a single user turn).
    pub messages: Vec<VisionMessage>,
    /// Maximum completion tokens.
    pub max_tokens: u32,
}

/// A chat message with multi-part content.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct VisionMessage {
    /// Always `user`.
    pub role: String,
    /// Text and image parts.
    pub content: Vec<VisionContentPart>,
}

/// One content part of a vision message.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisionContentPart {
    /// Instruction text.
    Text {
        /// The text.
        text: String,
    },
    /// Inline image.
    ImageUrl {
        /// Image reference.
        image_url: ImageUrl,
    },
}

/// Image reference carrying a `data:` URL.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct ImageUrl {
    /// `data:<mime>;base64,<payload>`.
    pub url: String,
}

/// Chat completions response body (only the fields read here).
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct VisionResponse {
    /// Response choices.
    pub choices: Vec<VisionChoice>,
}

/// A response choice.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct VisionChoice {
    /// Assistant message.
    pub message: VisionResponseMessage,
}

/// Assistant message.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct VisionResponseMessage {
    /// Text content, absent on refusals.
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Describer
// ---------------------------------------------------------------------------

/// Vision-model-backed [`Describer`].
#[derive(Debug, Clone)]
pub struct VisionDescriber {
    client: reqwest::Client,
    api_key: Secret,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl VisionDescriber {
    /// Create a describer from OpenAI settings.
    ///
    /// # Errors
    ///
    /// Returns the client builder error when the TLS backend cannot be initialised.
    pub fn new(openai: &OpenAiConfig, http: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http_client(http)?,
            api_key: openai.api_key.clone(),
            base_url: openai.base_url.trim_end_matches('/').to_owned(),
            model: openai.vision_model.clone(),
            max_tokens: openai.vision_max_tokens,
        })
    }
}

/// Encode a payload as `data:<mime>;base64,<payload>`.
pub fn image_data_url(image: &MediaPayload) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
    format!("data:{};base64,{encoded}", image.mime_type)
}

/// Build the chat completions request for one image.
#[doc(hidden)]
pub fn build_request(model: &str, max_tokens: u32, data_url: String) -> VisionRequest {
    VisionRequest {
        model: model.to_owned(),
        messages: vec![VisionMessage {
            role: "user".to_owned(),
            content: vec![
                VisionContentPart::Text {
                    text: DESCRIBE_PROMPT.to_owned(),
                },
                VisionContentPart::ImageUrl {
                    image_url: ImageUrl { url: data_url },
                },
            ],
        }],
        max_tokens,
    }
}

/// Extract the description from a chat completions response.
///
/// # Errors
///
/// Returns `DescriptionError::Provider(Parse)` on malformed JSON or missing
/// `choices[0]`, and `DescriptionError::Empty` when the content is absent
/// or blank.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<String, DescriptionError> {
    let resp: VisionResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("missing choices[0]".to_owned()))?;

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(DescriptionError::Empty),
    }
}

#[async_trait]
impl Describer for VisionDescriber {
    async fn describe(&self, image: MediaPayload) -> Result<String, DescriptionError> {
        debug!(
            model = %self.model,
            bytes = image.len(),
            mime = %image.mime_type,
            "requesting image description"
        );

        let api_request = build_request(&self.model, self.max_tokens, image_data_url(&image));

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&api_request)
            .send()
            .await
            .map_err(ProviderError::from)?;

        let payload = check_http_response(response).await?;
        parse_response(&payload)
    }
}
