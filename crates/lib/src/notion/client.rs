//! Notion API client (https://api.notion.com by default).
//! Supports page creation and database queries; errors are passed through untranslated.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{NotionSettings, DEFAULT_NOTION_BASE_URL, DEFAULT_NOTION_VERSION};

/// Client for the Notion HTTP API. Cheap to clone; shares one connection pool.
#[derive(Clone)]
pub struct NotionClient {
    base_url: String,
    token: String,
    version: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum NotionError {
    #[error("notion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("notion api error: {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("property {0:?} cannot be used in an equality filter")]
    UnsupportedFilter(String),
}

/// Error object returned by Notion for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseParent {
    pub database_id: String,
}

/// POST /v1/pages body.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePageRequest {
    pub parent: DatabaseParent,
    pub properties: Map<String, Value>,
}

/// POST /v1/databases/{id}/query body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// A page as returned by create and query. Properties are kept raw for schema decoding.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct QueryDatabaseResponse {
    #[serde(default)]
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl NotionClient {
    pub fn new(token: &str, base_url: Option<String>, version: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_NOTION_BASE_URL.to_string());
        Self {
            base_url,
            token: token.to_string(),
            version: version.unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string()),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_settings(settings: &NotionSettings) -> Self {
        Self::new(
            &settings.integration_token,
            Some(settings.base_url.clone()),
            Some(settings.version.clone()),
        )
    }

    /// POST /v1/pages: create a page under a database.
    pub async fn create_page(&self, req: &CreatePageRequest) -> Result<Page, NotionError> {
        let url = format!("{}/v1/pages", self.base_url);
        self.post_json(&url, req).await
    }

    /// POST /v1/databases/{id}/query: one page of results (no cursor following).
    pub async fn query_database(
        &self,
        database_id: &str,
        req: &QueryDatabaseRequest,
    ) -> Result<QueryDatabaseResponse, NotionError> {
        let url = format!("{}/v1/databases/{}/query", self.base_url, database_id);
        self.post_json(&url, req).await
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, NotionError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let res = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.version)
            .json(body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &text));
        }
        Ok(res.json().await?)
    }
}

/// Build an Api error from a non-2xx body; non-JSON bodies become the message as-is.
fn api_error(status: u16, body: &str) -> NotionError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(e) => NotionError::Api {
            status,
            code: e.code,
            message: e.message,
        },
        Err(_) => NotionError::Api {
            status,
            code: String::new(),
            message: body.to_string(),
        },
    }
}
