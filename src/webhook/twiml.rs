//! TwiML reply envelope.

use crate::composer::ChatReply;

/// Render a reply as a TwiML `<Response>` with a single `<Message>`.
pub fn render_reply(reply: &ChatReply) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response><Message>"#);
    xml.push_str("<Body>");
    xml.push_str(&escape_xml(&reply.text));
    xml.push_str("</Body>");
    if let Some(media_url) = &reply.media_url {
        xml.push_str("<Media>");
        xml.push_str(&escape_xml(media_url));
        xml.push_str("</Media>");
    }
    xml.push_str("</Message></Response>");
    xml
}

/// Escape the five XML special characters.
pub fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
