//! Gateway: HTTP server for the LINE webhook.
//!
//! `POST /callback` verifies and parses the webhook, then forwards each text
//! message to the record store. `GET /` is a health probe.

mod server;

pub use server::{forward_messages, router, run_gateway, run_gateway_with_store, GatewayState};
