//! Media downloads from Twilio's media storage.
//!
//! Twilio media URLs require HTTP basic auth with the account SID and auth
//! token, and usually redirect to a pre-signed storage URL.

use async_trait::async_trait;
use tracing::debug;

use super::{MediaFetchError, MediaFetcher, MediaPayload};
use crate::config::HttpConfig;
use crate::credentials::ChannelCredentials;
use crate::providers::{http_client, sanitize_http_error_body};

/// Authenticated media fetcher for Twilio-hosted attachments.
#[derive(Debug, Clone)]
pub struct TwilioMediaFetcher {
    client: reqwest::Client,
    credentials: ChannelCredentials,
    max_bytes: u64,
}

impl TwilioMediaFetcher {
    /// Create a fetcher with the configured timeouts and size cap. Redirects
    /// are followed with reqwest's default policy.
    ///
    /// # Errors
    ///
    /// Returns the client builder error when the TLS backend cannot be initialised.
    pub fn new(credentials: ChannelCredentials, http: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http_client(http)?,
            credentials,
            max_bytes: http.max_media_bytes,
        })
    }
}

/// Parse a media URL, accepting only `http` and `https`.
///
/// # Errors
///
/// Returns [`MediaFetchError::InvalidUrl`] for unparsable URLs or other schemes.
pub fn parse_media_url(raw: &str) -> Result<url::Url, MediaFetchError> {
    let parsed =
        url::Url::parse(raw).map_err(|e| MediaFetchError::InvalidUrl(format!("{raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(MediaFetchError::InvalidUrl(format!(
            "{raw}: unsupported scheme {other:?}"
        ))),
    }
}

#[async_trait]
impl MediaFetcher for TwilioMediaFetcher {
    async fn fetch(&self, url: &str, declared_mime: &str) -> Result<MediaPayload, MediaFetchError> {
        let parsed = parse_media_url(url)?;

        let mut response = self
            .client
            .get(parsed)
            .basic_auth(
                &self.credentials.account_sid,
                Some(self.credentials.auth_token.expose()),
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaFetchError::HttpStatus {
                status: status.as_u16(),
                body: sanitize_http_error_body(&body),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        if let Some(declared_len) = response.content_length() {
            if declared_len > self.max_bytes {
                return Err(MediaFetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let total = bytes.len().saturating_add(chunk.len());
            if u64::try_from(total).unwrap_or(u64::MAX) > self.max_bytes {
                return Err(MediaFetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        let mime_type = if declared_mime.trim().is_empty() {
            content_type.unwrap_or_else(|| "application/octet-stream".to_owned())
        } else {
            declared_mime.to_owned()
        };

        debug!(bytes = bytes.len(), mime = %mime_type, "media downloaded");

        Ok(MediaPayload::new(bytes, mime_type))
    }
}
