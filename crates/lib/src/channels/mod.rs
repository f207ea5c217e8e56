//! Communication channels (LINE Messaging API webhook).
//!
//! Verifies and parses webhook requests into inbound text messages; the gateway
//! forwards each one to the record store.

mod inbound;
mod line;

pub use inbound::InboundMessage;
pub use line::{
    parse_request, verify_signature, LineEvent, LineMessage, ParseError, WebhookBody,
    SIGNATURE_HEADER,
};
