//! HTTP client for the RAG knowledge backend.
//!
//! The backend issues a bearer token on login and answers questions posted
//! to a chat session. The token is cached and obtained lazily; a 401 drops
//! it so the next query logs in again. Failed calls are not retried.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{RetrievalError, RetrievalGateway};
use crate::config::{HttpConfig, RagConfig};
use crate::credentials::Secret;
use crate::providers::{http_client, sanitize_http_error_body};

/// Login request body.
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Query request body.
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    content: &'a str,
}

/// RAG backend client implementing [`RetrievalGateway`].
pub struct RagClient {
    client: reqwest::Client,
    base_url: String,
    email: String,
    password: Secret,
    login_url: String,
    query_url: String,
    token: RwLock<Option<Secret>>,
}

impl std::fmt::Debug for RagClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagClient")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("query_url", &self.query_url)
            .finish_non_exhaustive()
    }
}

impl RagClient {
    /// Create a client from RAG settings.
    ///
    /// # Errors
    ///
    /// Returns the client builder error when the TLS backend cannot be initialised.
    pub fn new(rag: &RagConfig, http: &HttpConfig) -> Result<Self, reqwest::Error> {
        let base_url = rag.base_url.trim_end_matches('/').to_owned();
        let query_path = rag
            .query_path_template
            .replace("{session_id}", &rag.session_id);
        Ok(Self {
            client: http_client(http)?,
            login_url: join_url(&base_url, &rag.login_path),
            query_url: join_url(&base_url, &query_path),
            base_url,
            email: rag.email.clone(),
            password: rag.password.clone(),
            token: RwLock::new(None),
        })
    }

    /// Endpoint that receives queries.
    pub fn query_url(&self) -> &str {
        &self.query_url
    }

    /// Whether a token is currently cached.
    pub async fn is_logged_in(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Log in and cache the bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Auth`] when credentials are rejected or the
    /// response has no token, and `Request` on transport failure.
    pub async fn login(&self) -> Result<(), RetrievalError> {
        let response = self
            .client
            .post(&self.login_url)
            .json(&LoginRequest {
                email: &self.email,
                password: self.password.expose(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RetrievalError::Auth(format!(
                "login returned status {}: {}",
                status.as_u16(),
                sanitize_http_error_body(&body)
            )));
        }

        let token = extract_token(&body)?;
        *self.token.write().await = Some(Secret::new(token));
        info!(email = %self.email, "logged in to retrieval backend");
        Ok(())
    }

    /// Drop the cached token if it is still `used`. A token stored by a
    /// concurrent login is kept. Returns whether the cache was cleared.
    pub async fn invalidate_token(&self, used: &Secret) -> bool {
        let mut cached = self.token.write().await;
        if cached.as_ref() == Some(used) {
            *cached = None;
            true
        } else {
            false
        }
    }

    async fn bearer_token(&self) -> Result<Secret, RetrievalError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }
        self.login().await?;
        self.token
            .read()
            .await
            .clone()
            .ok_or_else(|| RetrievalError::Auth("no token after login".to_owned()))
    }
}

#[async_trait]
impl RetrievalGateway for RagClient {
    async fn query(&self, text: &str) -> Result<String, RetrievalError> {
        let token = self.bearer_token().await?;
        debug!(url = %self.query_url, chars = text.chars().count(), "querying retrieval backend");

        let response = self
            .client
            .post(&self.query_url)
            .bearer_auth(token.expose())
            .json(&QueryRequest { content: text })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED && self.invalidate_token(&token).await {
            warn!("retrieval token rejected, clearing cached session");
        }
        if !status.is_success() {
            return Err(RetrievalError::HttpStatus {
                status: status.as_u16(),
                body: sanitize_http_error_body(&body),
            });
        }

        extract_answer(&body)
    }
}

/// Join a base URL and a path with exactly one `/` between them.
fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Pull the bearer token out of a login response.
///
/// Accepts `access_token`, `token`, or the same keys nested under `data`.
///
/// # Errors
///
/// Returns [`RetrievalError::Auth`] when no token is present.
#[doc(hidden)]
pub fn extract_token(body: &str) -> Result<String, RetrievalError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| RetrievalError::Auth(format!("login response is not JSON: {e}")))?;

    let candidates = [
        value.get("access_token"),
        value.get("token"),
        value.pointer("/data/access_token"),
        value.pointer("/data/token"),
    ];
    let token = candidates
        .into_iter()
        .flatten()
        .find_map(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_owned);
    token.ok_or_else(|| RetrievalError::Auth("login response has no token".to_owned()))
}

/// Pull the answer text out of a query response.
///
/// Checks `answer`, `content`, `response`, `message.content` and
/// `data.answer` in that order. A bare JSON string is also accepted.
///
/// # Errors
///
/// Returns [`RetrievalError::Parse`] on malformed JSON or when no answer
/// field is present.
#[doc(hidden)]
pub fn extract_answer(body: &str) -> Result<String, RetrievalError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| RetrievalError::Parse(e.to_string()))?;

    if let Some(answer) = value.as_str() {
        return Ok(answer.to_owned());
    }

    let candidates = [
        value.get("answer"),
        value.get("content"),
        value.get("response"),
        value.pointer("/message/content"),
        value.pointer("/data/answer"),
    ];
    let answer = candidates
        .into_iter()
        .flatten()
        .find_map(Value::as_str)
        .map(str::to_owned);
    answer.ok_or_else(|| RetrievalError::Parse("response has no answer field".to_owned()))
}
