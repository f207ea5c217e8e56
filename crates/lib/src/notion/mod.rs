//! Notion API client and the person property schema.
//!
//! The client speaks raw JSON properties; `schema` knows the fixed keys and how to
//! build and read each property type.

mod client;
pub mod schema;

pub use client::{
    CreatePageRequest, DatabaseParent, NotionClient, NotionError, Page, QueryDatabaseRequest,
    QueryDatabaseResponse,
};
