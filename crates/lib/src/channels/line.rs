//! LINE channel: webhook signature verification and event parsing.
//!
//! LINE signs each webhook POST with base64(HMAC-SHA256(channel secret, raw body)) and sends
//! it in the `X-Line-Signature` header. The body is a JSON object with an `events` array.

use crate::channels::inbound::InboundMessage;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

pub const SIGNATURE_HEADER: &str = "X-Line-Signature";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("malformed webhook body: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Webhook POST body.
#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<LineEvent>,
}

/// One webhook event. Only message events carry a payload we care about.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LineEvent {
    Message {
        message: LineMessage,
        #[serde(default, rename = "replyToken")]
        reply_token: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// Message object inside a message event.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LineMessage {
    Text {
        #[serde(default)]
        id: Option<String>,
        text: String,
    },
    #[serde(other)]
    Other,
}

impl WebhookBody {
    /// Text messages in event order; every other event or message type is skipped.
    pub fn text_messages(&self) -> Vec<InboundMessage> {
        self.events
            .iter()
            .filter_map(|event| match event {
                LineEvent::Message {
                    message: LineMessage::Text { text, .. },
                    ..
                } => Some(InboundMessage { text: text.clone() }),
                _ => None,
            })
            .collect()
    }
}

/// Check `signature` (base64 header value) against the HMAC of `body`. Constant-time compare.
pub fn verify_signature(channel_secret: &str, signature: &str, body: &[u8]) -> bool {
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Verify and parse a webhook request. A missing signature counts as invalid.
pub fn parse_request(
    channel_secret: &str,
    signature: Option<&str>,
    body: &[u8],
) -> Result<WebhookBody, ParseError> {
    let signature = signature.ok_or(ParseError::InvalidSignature)?;
    if !verify_signature(channel_secret, signature, body) {
        return Err(ParseError::InvalidSignature);
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "channel-secret";

    fn sign(body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"events":[]}"#;
        assert!(verify_signature(SECRET, &sign(body), body));
    }

    #[test]
    fn rejects_tampered_body_and_garbage_header() {
        let body = br#"{"events":[]}"#;
        let sig = sign(body);
        assert!(!verify_signature(SECRET, &sig, br#"{"events":[{}]}"#));
        assert!(!verify_signature("other-secret", &sig, body));
        assert!(!verify_signature(SECRET, "not base64!!", body));
    }

    #[test]
    fn missing_signature_is_invalid() {
        let err = parse_request(SECRET, None, b"{}").unwrap_err();
        assert!(matches!(err, ParseError::InvalidSignature));
    }

    #[test]
    fn bad_json_with_valid_signature_is_malformed() {
        let body = b"not json";
        let err = parse_request(SECRET, Some(&sign(body)), body).unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
    }

    #[test]
    fn extracts_only_text_messages_in_order() {
        let body = br#"{
            "destination": "U123",
            "events": [
                {"type":"message","replyToken":"r1","message":{"type":"text","id":"1","text":"first"}},
                {"type":"follow","replyToken":"r2"},
                {"type":"message","message":{"type":"sticker","id":"2","packageId":"1","stickerId":"1"}},
                {"type":"message","message":{"type":"text","id":"3","text":"second"}}
            ]
        }"#;
        let parsed = parse_request(SECRET, Some(&sign(body)), body).unwrap();
        assert_eq!(parsed.destination.as_deref(), Some("U123"));
        assert_eq!(parsed.events.len(), 4);
        let texts: Vec<String> = parsed.text_messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn empty_events_is_valid() {
        let body = br#"{"destination":"U1","events":[]}"#;
        let parsed = parse_request(SECRET, Some(&sign(body)), body).unwrap();
        assert!(parsed.text_messages().is_empty());
    }
}
