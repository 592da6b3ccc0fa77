//! Vision describer wire format and HTTP exchange.

use chatbridge::config::{HttpConfig, OpenAiConfig};
use chatbridge::credentials::Secret;
use chatbridge::media::MediaPayload;
use chatbridge::providers::vision::{
    build_request, image_data_url, parse_response, VisionDescriber, DESCRIBE_PROMPT,
};
use chatbridge::providers::{DescriptionError, Describer, ProviderError};
use serde_json::json;

use crate::http::{MockResponse, MockServer};

fn describer(base_url: &str) -> VisionDescriber {
    let openai = OpenAiConfig {
        api_key: Secret::new("sk-test"),
        base_url: base_url.to_owned(),
        ..OpenAiConfig::default()
    };
    match VisionDescriber::new(&openai, &HttpConfig::default()) {
        Ok(d) => d,
        Err(err) => panic!("describer should build: {err}"),
    }
}

#[test]
fn data_url_embeds_mime_and_base64() {
    let payload = MediaPayload::new(b"hi".to_vec(), "image/png");
    assert_eq!(image_data_url(&payload), "data:image/png;base64,aGk=");
}

#[test]
fn build_request_has_prompt_then_image() {
    let req = build_request("gpt-4o", 300, "data:image/png;base64,aGk=".to_owned());
    let value = match serde_json::to_value(&req) {
        Ok(value) => value,
        Err(err) => panic!("request should serialize: {err}"),
    };

    assert_eq!(value["model"], "gpt-4o");
    assert_eq!(value["max_tokens"], 300);
    assert_eq!(value["messages"][0]["role"], "user");
    assert_eq!(value["messages"][0]["content"][0]["type"], "text");
    assert_eq!(value["messages"][0]["content"][0]["text"], DESCRIBE_PROMPT);
    assert_eq!(value["messages"][0]["content"][1]["type"], "image_url");
    assert_eq!(
        value["messages"][0]["content"][1]["image_url"]["url"],
        "data:image/png;base64,aGk="
    );
}

#[test]
fn parse_response_returns_content() {
    let body = json!({
        "choices": [{"message": {"role": "assistant", "content": "A receipt for 12 EUR"}}]
    });
    assert!(matches!(
        parse_response(&body.to_string()),
        Ok(text) if text == "A receipt for 12 EUR"
    ));
}

#[test]
fn parse_response_empty_content_is_error() {
    let body = json!({"choices": [{"message": {"content": null}}]});
    assert!(matches!(
        parse_response(&body.to_string()),
        Err(DescriptionError::Empty)
    ));
}

#[test]
fn parse_response_without_choices_is_parse_error() {
    let body = json!({"choices": []});
    assert!(matches!(
        parse_response(&body.to_string()),
        Err(DescriptionError::Provider(ProviderError::Parse(_)))
    ));
}

#[tokio::test]
async fn describe_posts_chat_completion() {
    let server = MockServer::start(vec![MockResponse::json(
        "200 OK",
        &json!({"choices": [{"message": {"content": "A menu board"}}]}),
    )])
    .await;
    let d = describer(&server.base_url);

    let text = match d
        .describe(MediaPayload::new(b"jpegdata".to_vec(), "image/jpeg"))
        .await
    {
        Ok(text) => text,
        Err(err) => panic!("describe should succeed: {err}"),
    };
    assert_eq!(text, "A menu board");

    let requests = server.requests().await;
    let request = &requests[0];
    assert!(request.starts_with("POST /chat/completions "));
    assert!(request.contains("Bearer sk-test"));
    assert!(request.contains("data:image/jpeg;base64,"));
    assert!(request.contains("gpt-4o"));
}

#[tokio::test]
async fn describe_maps_rate_limit() {
    let server = MockServer::start(vec![MockResponse::json(
        "429 Too Many Requests",
        &json!({"error": "slow down"}),
    )])
    .await;
    let d = describer(&server.base_url);

    let result = d
        .describe(MediaPayload::new(b"x".to_vec(), "image/jpeg"))
        .await;
    assert!(matches!(
        result,
        Err(DescriptionError::Provider(ProviderError::HttpStatus { status: 429, .. }))
    ));
    let _ = server.requests().await;
}
