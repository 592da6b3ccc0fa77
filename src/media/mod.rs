//! Inbound media: payload type, modality classification and the fetcher seam.

use async_trait::async_trait;

pub mod twilio;

/// Raw bytes of one media attachment.
///
/// Fetched once and moved into exactly one modality handler.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaPayload {
    /// Payload bytes.
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `audio/ogg` or `image/jpeg`.
    pub mime_type: String,
}

impl MediaPayload {
    /// Build a payload from bytes and a MIME type.
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for MediaPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPayload")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Input modality of an attachment, derived from its MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `audio/*`
    Audio,
    /// `image/*`
    Image,
    /// Anything else (video, documents, ...). Ignored by the composer.
    Other,
}

impl MediaKind {
    /// Classify a MIME type by its top-level type. Matching is case-sensitive
    /// on the `audio/` and `image/` prefixes.
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("audio/") {
            Self::Audio
        } else if mime_type.starts_with("image/") {
            Self::Image
        } else {
            Self::Other
        }
    }
}

/// Subtype of a MIME type without parameters: `audio/ogg; codecs=opus` → `ogg`.
pub fn mime_subtype(mime_type: &str) -> &str {
    let essence = mime_type.split(';').next().unwrap_or(mime_type).trim();
    essence.rsplit('/').next().unwrap_or(essence)
}

/// Failure while downloading an attachment.
#[derive(Debug, thiserror::Error)]
pub enum MediaFetchError {
    /// URL could not be parsed or uses an unsupported scheme.
    #[error("invalid media URL: {0}")]
    InvalidUrl(String),
    /// HTTP transport failure (including timeouts).
    #[error("media request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Media storage answered with a non-success status.
    #[error("media storage returned status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// Attachment is larger than the configured cap.
    #[error("media exceeds the {limit}-byte download limit")]
    TooLarge {
        /// Configured cap in bytes.
        limit: u64,
    },
}

/// Retrieves attachment bytes from the channel's media storage.
///
/// Implementations carry their own credentials.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download the attachment at `url`. `declared_mime` is the type the
    /// channel announced and is used when storage omits `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns [`MediaFetchError`] on invalid URL, transport failure,
    /// timeout, non-2xx status or an oversized attachment.
    async fn fetch(&self, url: &str, declared_mime: &str) -> Result<MediaPayload, MediaFetchError>;
}
