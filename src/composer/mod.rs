//! Multi-modal query composition.
//!
//! Turns one [`InboundMessage`] into one textual query for the retrieval
//! backend and always resolves to a [`ChatReply`]:
//!
//! 1. text body → fragment, verbatim
//! 2. `audio/*` → fetch + transcribe; any failure aborts with [`VOICE_NOTE_FAILED_REPLY`]
//! 3. `image/*` with a URL → fetch + describe; failures become [`IMAGE_ERROR_PLACEHOLDER`]
//! 4. no fragments → [`EMPTY_MESSAGE_REPLY`], backend not called
//! 5. newline-joined fragments → retrieval backend, once
//! 6. backend failure → [`RETRIEVAL_FAILED_REPLY`]
//!
//! Audio failures abort the whole request; image failures only degrade
//! the query.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::media::{mime_subtype, MediaFetcher, MediaKind};
use crate::providers::{Describer, Transcriber};
use crate::retrieval::RetrievalGateway;

mod message;

pub use message::{build_query, ChatReply, InboundMessage, QueryFragment};

/// Reply when a voice note cannot be fetched or transcribed.
pub const VOICE_NOTE_FAILED_REPLY: &str = "I couldn't hear that voice note.";

/// Reply when the message carries nothing usable.
pub const EMPTY_MESSAGE_REPLY: &str = "Please send text, audio, or an image.";

/// Reply when the retrieval backend fails.
pub const RETRIEVAL_FAILED_REPLY: &str =
    "Sorry, I am having trouble accessing the system right now.";

/// Description used when an image cannot be fetched or described.
pub const IMAGE_ERROR_PLACEHOLDER: &str = "[Error analyzing image]";

/// Orchestrates media fetch, modality conversion and retrieval for one message.
///
/// Holds no per-request state; one instance serves all requests concurrently.
#[derive(Clone)]
pub struct QueryComposer {
    fetcher: Arc<dyn MediaFetcher>,
    transcriber: Arc<dyn Transcriber>,
    describer: Arc<dyn Describer>,
    gateway: Arc<dyn RetrievalGateway>,
}

impl std::fmt::Debug for QueryComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryComposer").finish_non_exhaustive()
    }
}

impl QueryComposer {
    /// Create a composer from its collaborators.
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        transcriber: Arc<dyn Transcriber>,
        describer: Arc<dyn Describer>,
        gateway: Arc<dyn RetrievalGateway>,
    ) -> Self {
        Self {
            fetcher,
            transcriber,
            describer,
            gateway,
        }
    }

    /// Produce the reply for one inbound message. Never fails.
    pub async fn compose(&self, message: &InboundMessage) -> ChatReply {
        let mut fragments: Vec<QueryFragment> = Vec::new();

        if !message.text_body.is_empty() {
            fragments.push(QueryFragment::Text(message.text_body.clone()));
        }

        let media_type = message.media_type.as_deref().unwrap_or_default();
        let kind = MediaKind::from_mime(media_type);

        if kind == MediaKind::Audio {
            match self.transcribe_voice_note(message.media_url.as_deref(), media_type).await {
                Some(transcription) if transcription.is_empty() => {
                    debug!("transcription is empty, no fragment added");
                }
                Some(transcription) => fragments.push(QueryFragment::Transcription(transcription)),
                None => return ChatReply::text(VOICE_NOTE_FAILED_REPLY),
            }
        }

        if kind == MediaKind::Image {
            if let Some(url) = message.media_url.as_deref() {
                let description = self.describe_image(url, media_type).await;
                fragments.push(QueryFragment::ImageContext(description));
            }
        }

        if kind == MediaKind::Other && !media_type.is_empty() {
            debug!(mime = %media_type, "ignoring unsupported media type");
        }

        let Some(query) = build_query(&fragments) else {
            info!("message has no usable content");
            return ChatReply::text(EMPTY_MESSAGE_REPLY);
        };

        info!(
            fragments = fragments.len(),
            chars = query.chars().count(),
            "composed retrieval query"
        );
        debug!(%query, "retrieval query text");

        match self.gateway.query(&query).await {
            Ok(answer) => ChatReply::text(answer),
            Err(e) => {
                error!(error = %e, "retrieval backend failed");
                ChatReply::text(RETRIEVAL_FAILED_REPLY)
            }
        }
    }

    /// Fetch and transcribe a voice note. `None` means the request must abort.
    async fn transcribe_voice_note(&self, url: Option<&str>, media_type: &str) -> Option<String> {
        let Some(url) = url else {
            warn!(mime = %media_type, "audio message without media URL");
            return None;
        };

        let audio = match self.fetcher.fetch(url, media_type).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(error = %e, "failed to fetch voice note");
                return None;
            }
        };

        match self.transcriber.transcribe(audio, mime_subtype(media_type)).await {
            Ok(text) => {
                info!(chars = text.chars().count(), "voice note transcribed");
                Some(text)
            }
            Err(e) => {
                warn!(error = %e, "failed to transcribe voice note");
                None
            }
        }
    }

    /// Fetch and describe an image, degrading to the placeholder on failure.
    async fn describe_image(&self, url: &str, media_type: &str) -> String {
        let image = match self.fetcher.fetch(url, media_type).await {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "failed to fetch image");
                return IMAGE_ERROR_PLACEHOLDER.to_owned();
            }
        };

        match self.describer.describe(image).await {
            Ok(description) => {
                info!(chars = description.chars().count(), "image described");
                description
            }
            Err(e) => {
                warn!(error = %e, "failed to describe image");
                IMAGE_ERROR_PLACEHOLDER.to_owned()
            }
        }
    }
}
