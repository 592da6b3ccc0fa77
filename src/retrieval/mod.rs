//! Retrieval backend seam.
//!
//! The composer sees the knowledge base as one call: `query(text) -> answer`.
//! Authentication and session handling belong to the implementation
//! ([`rag::RagClient`]).

use async_trait::async_trait;

pub mod rag;

/// Failure talking to the retrieval backend.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// HTTP transport failure (including timeouts).
    #[error("retrieval request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Backend answered with a non-success status.
    #[error("retrieval backend returned status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// Response body did not contain an answer.
    #[error("retrieval response parse error: {0}")]
    Parse(String),
    /// Login was rejected or returned no token.
    #[error("retrieval authentication failed: {0}")]
    Auth(String),
}

/// Sends a composed query to the knowledge backend.
#[async_trait]
pub trait RetrievalGateway: Send + Sync {
    /// Ask the backend and return its answer text.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] on network failure, non-2xx status,
    /// authentication failure or a malformed response.
    async fn query(&self, text: &str) -> Result<String, RetrievalError>;
}
