//! Request-scoped message types: inbound message, query fragments, reply.

use serde::Serialize;

/// One inbound channel message, already parsed from the transport.
///
/// If `media_url` is set, `media_type` is set and non-empty. Use
/// [`InboundMessage::with_media`] to keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender identifier (e.g. `whatsapp:+15551234567`).
    pub sender_id: String,
    /// Text body; may be empty.
    pub text_body: String,
    /// Attachment URL in the channel's media storage.
    pub media_url: Option<String>,
    /// Attachment MIME type.
    pub media_type: Option<String>,
}

impl InboundMessage {
    /// A text-only message.
    pub fn text(sender_id: impl Into<String>, text_body: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            text_body: text_body.into(),
            media_url: None,
            media_type: None,
        }
    }

    /// Attach media. An empty MIME type drops the attachment.
    #[must_use]
    pub fn with_media(
        mut self,
        media_url: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        let media_type = media_type.into();
        if media_type.trim().is_empty() {
            self.media_url = None;
            self.media_type = None;
        } else {
            self.media_url = Some(media_url.into());
            self.media_type = Some(media_type);
        }
        self
    }
}

/// Text contributed by one input modality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFragment {
    /// The message body, verbatim.
    Text(String),
    /// A voice note transcription.
    Transcription(String),
    /// An image description (or the error placeholder).
    ImageContext(String),
}

impl QueryFragment {
    /// Text as it appears in the composed query.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) | Self::Transcription(text) => text.clone(),
            Self::ImageContext(description) => format!("[Image Context: {description}]"),
        }
    }
}

/// Newline-join fragments in the order given. `None` when there are none.
pub fn build_query(fragments: &[QueryFragment]) -> Option<String> {
    if fragments.is_empty() {
        return None;
    }
    Some(
        fragments
            .iter()
            .map(QueryFragment::render)
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Reply returned to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    /// Reply text.
    pub text: String,
    /// Optional media attachment. Never set by the composer today.
    pub media_url: Option<String>,
}

impl ChatReply {
    /// A text-only reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            media_url: None,
        }
    }
}
