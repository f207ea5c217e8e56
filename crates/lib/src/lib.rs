//! LINE → Notion relay library: webhook ingress, record mapping, and the Notion
//! client, shared by the CLI and the integration tests.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod notion;
pub mod records;
