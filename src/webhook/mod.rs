//! Twilio WhatsApp webhook surface.
//!
//! Parses Twilio's form-encoded callback into an [`InboundMessage`], runs it
//! through the [`QueryComposer`] and answers with TwiML.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Instrument};

use crate::composer::{InboundMessage, QueryComposer};
use crate::config::ServerConfig;

pub mod twiml;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Message pipeline.
    pub composer: Arc<QueryComposer>,
}

/// Fields read from Twilio's messaging webhook. Other fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwilioWebhookForm {
    /// Sender address, e.g. `whatsapp:+15551234567`.
    #[serde(rename = "From", default)]
    pub from: String,
    /// Message text.
    #[serde(rename = "Body", default)]
    pub body: String,
    /// Number of attachments.
    #[serde(rename = "NumMedia", default)]
    pub num_media: Option<u32>,
    /// First attachment URL.
    #[serde(rename = "MediaUrl0", default)]
    pub media_url0: Option<String>,
    /// First attachment MIME type.
    #[serde(rename = "MediaContentType0", default)]
    pub media_content_type0: Option<String>,
}

impl TwilioWebhookForm {
    /// Convert to an [`InboundMessage`]. Only the first attachment is used;
    /// an attachment without a content type is dropped.
    pub fn into_inbound(self) -> InboundMessage {
        let message = InboundMessage::text(self.from, self.body);
        if self.num_media == Some(0) {
            return message;
        }
        match (self.media_url0, self.media_content_type0) {
            (Some(url), Some(mime)) if !url.is_empty() => message.with_media(url, mime),
            _ => message,
        }
    }
}

/// Build the HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/whatsapp", post(whatsapp_reply))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(
    server: &ServerConfig,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((server.host.as_str(), server.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", server.host, server.port))?;
    let local_addr = listener
        .local_addr()
        .context("failed to read bound address")?;
    info!(addr = %local_addr, "webhook server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("webhook server failed")
}

async fn index() -> Html<&'static str> {
    Html("<h1>WhatsApp Bot Server is Running</h1>")
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn whatsapp_reply(
    State(state): State<AppState>,
    Form(form): Form<TwilioWebhookForm>,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("webhook", %request_id, sender = %form.from);
    let message = form.into_inbound();

    let reply = async {
        info!(
            has_text = !message.text_body.is_empty(),
            media_type = message.media_type.as_deref().unwrap_or("none"),
            "inbound message"
        );
        state.composer.compose(&message).await
    }
    .instrument(span)
    .await;

    (
        [(header::CONTENT_TYPE, "application/xml")],
        twiml::render_reply(&reply),
    )
        .into_response()
}
