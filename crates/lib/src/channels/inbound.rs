//! Inbound message from a channel: handed to the record store for forwarding.

/// A text message received from a channel, forwarded once and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
}
