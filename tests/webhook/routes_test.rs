//! Webhook routes driven through the router without a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use chatbridge::composer::{EMPTY_MESSAGE_REPLY, VOICE_NOTE_FAILED_REPLY};
use chatbridge::webhook::{router, AppState, TwilioWebhookForm};

use crate::stubs::{Harness, StubDescriber, StubFetcher, StubGateway, StubTranscriber};

fn state(h: &Harness) -> AppState {
    AppState {
        composer: Arc::new(h.composer.clone()),
    }
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = match axum::body::to_bytes(response.into_body(), 1024 * 1024).await {
        Ok(bytes) => bytes,
        Err(err) => panic!("body should read: {err}"),
    };
    String::from_utf8_lossy(&bytes).into_owned()
}

fn form_request(body: &'static str) -> Request<Body> {
    match Request::builder()
        .method("POST")
        .uri("/whatsapp")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
    {
        Ok(request) => request,
        Err(err) => panic!("request should build: {err}"),
    }
}

#[tokio::test]
async fn text_message_returns_twiml_answer() {
    let h = Harness::happy("Open 9 to 5 & weekends");
    let response = match router(state(&h))
        .oneshot(form_request("From=whatsapp%3A%2B15550001&Body=opening+hours%3F"))
        .await
    {
        Ok(response) => response,
        Err(err) => match err {},
    };

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/xml")
    );
    let body = body_text(response).await;
    assert!(body.contains("<Body>Open 9 to 5 &amp; weekends</Body>"));
    assert_eq!(h.gateway.recorded(), vec!["opening hours?".to_owned()]);
}

#[tokio::test]
async fn failing_voice_note_returns_fixed_reply() {
    let h = Harness::new(
        StubFetcher::ok(),
        StubTranscriber::failing(),
        StubDescriber::ok("unused"),
        StubGateway::ok("unused"),
    );
    let response = match router(state(&h))
        .oneshot(form_request(
            "From=whatsapp%3A%2B1&Body=&NumMedia=1&MediaUrl0=http%3A%2F%2Fx%2Fa.ogg&MediaContentType0=audio%2Fogg",
        ))
        .await
    {
        Ok(response) => response,
        Err(err) => match err {},
    };

    let body = body_text(response).await;
    assert!(body.contains("I couldn&apos;t hear that voice note."));
    assert!(VOICE_NOTE_FAILED_REPLY.contains('\''));
    assert!(h.gateway.recorded().is_empty());
}

#[tokio::test]
async fn missing_body_field_is_treated_as_empty() {
    let h = Harness::happy("unused");
    let response = match router(state(&h))
        .oneshot(form_request("From=whatsapp%3A%2B1"))
        .await
    {
        Ok(response) => response,
        Err(err) => match err {},
    };

    let body = body_text(response).await;
    assert!(body.contains(EMPTY_MESSAGE_REPLY));
}

#[tokio::test]
async fn index_reports_running() {
    let h = Harness::happy("unused");
    let request = match Request::builder().uri("/").body(Body::empty()) {
        Ok(request) => request,
        Err(err) => panic!("request should build: {err}"),
    };
    let response = match router(state(&h)).oneshot(request).await {
        Ok(response) => response,
        Err(err) => match err {},
    };
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Running"));
}

#[tokio::test]
async fn health_returns_ok_json() {
    let h = Harness::happy("unused");
    let request = match Request::builder().uri("/health").body(Body::empty()) {
        Ok(request) => request,
        Err(err) => panic!("request should build: {err}"),
    };
    let response = match router(state(&h)).oneshot(request).await {
        Ok(response) => response,
        Err(err) => match err {},
    };
    let body = body_text(response).await;
    assert_eq!(body, r#"{"status":"ok"}"#);
}

#[test]
fn form_without_media_maps_to_text_message() {
    let form = TwilioWebhookForm {
        from: "whatsapp:+1".to_owned(),
        body: "hi".to_owned(),
        ..TwilioWebhookForm::default()
    };
    let message = form.into_inbound();
    assert_eq!(message.sender_id, "whatsapp:+1");
    assert_eq!(message.text_body, "hi");
    assert_eq!(message.media_url, None);
    assert_eq!(message.media_type, None);
}

#[test]
fn form_uses_first_attachment() {
    let form = TwilioWebhookForm {
        from: "whatsapp:+1".to_owned(),
        body: String::new(),
        num_media: Some(1),
        media_url0: Some("https://api.twilio.com/Media/ME1".to_owned()),
        media_content_type0: Some("image/jpeg".to_owned()),
    };
    let message = form.into_inbound();
    assert_eq!(
        message.media_url.as_deref(),
        Some("https://api.twilio.com/Media/ME1")
    );
    assert_eq!(message.media_type.as_deref(), Some("image/jpeg"));
}

#[test]
fn form_drops_attachment_without_content_type() {
    let form = TwilioWebhookForm {
        from: "whatsapp:+1".to_owned(),
        body: "hi".to_owned(),
        num_media: Some(1),
        media_url0: Some("https://api.twilio.com/Media/ME1".to_owned()),
        media_content_type0: None,
    };
    assert_eq!(form.into_inbound().media_url, None);
}

#[test]
fn form_ignores_media_when_count_is_zero() {
    let form = TwilioWebhookForm {
        from: "whatsapp:+1".to_owned(),
        body: "hi".to_owned(),
        num_media: Some(0),
        media_url0: Some("https://api.twilio.com/Media/ME1".to_owned()),
        media_content_type0: Some("image/jpeg".to_owned()),
    };
    assert_eq!(form.into_inbound().media_url, None);
}
