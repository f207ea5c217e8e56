//! In-process fake of the two Notion endpoints the relay calls. Pages created through it
//! are stored in response shape so later queries can read them back.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

/// One request as received by the fake.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub notion_version: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct FakeNotion {
    pub pages: Arc<Mutex<Vec<Value>>>,
    pub requests: Arc<Mutex<Vec<Recorded>>>,
    /// When true every call answers 401 like an invalid integration token.
    pub reject_auth: bool,
}

impl FakeNotion {
    pub fn rejecting_auth() -> Self {
        Self {
            reject_auth: true,
            ..Default::default()
        }
    }

    /// Bind on a free port and serve in the background. Returns the base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/v1/pages", post(create_page))
            .route("/v1/databases/:id/query", post(query_database))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake notion");
        let addr = listener.local_addr().expect("local_addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}", addr)
    }

    pub async fn insert_page(&self, id: &str, properties: Value) {
        self.pages.lock().await.push(json!({
            "object": "page",
            "id": id,
            "properties": properties,
        }));
    }

    pub async fn recorded(&self) -> Vec<Recorded> {
        self.requests.lock().await.clone()
    }

    async fn record(&self, path: String, headers: &HeaderMap, body: &Value) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().await.push(Recorded {
            path,
            authorization: header("authorization"),
            notion_version: header("notion-version"),
            body: body.clone(),
        });
    }
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "object": "error",
            "status": 401,
            "code": "unauthorized",
            "message": "API token is invalid."
        })),
    )
}

async fn create_page(
    State(fake): State<FakeNotion>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.record("/v1/pages".to_string(), &headers, &body).await;
    if fake.reject_auth {
        return unauthorized();
    }
    let mut pages = fake.pages.lock().await;
    let id = format!("page-{}", pages.len() + 1);
    let properties = body
        .get("properties")
        .and_then(|p| p.as_object())
        .map(response_properties)
        .unwrap_or_default();
    let page = json!({ "object": "page", "id": id, "properties": properties });
    pages.push(page.clone());
    (StatusCode::OK, Json(page))
}

async fn query_database(
    State(fake): State<FakeNotion>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.record(format!("/v1/databases/{}/query", id), &headers, &body)
        .await;
    if fake.reject_auth {
        return unauthorized();
    }
    let pages = fake.pages.lock().await;
    let results: Vec<Value> = pages
        .iter()
        .filter(|page| match body.get("filter") {
            Some(filter) => matches_filter(page, filter),
            None => true,
        })
        .cloned()
        .collect();
    (
        StatusCode::OK,
        Json(json!({
            "object": "list",
            "results": results,
            "has_more": false,
            "next_cursor": null
        })),
    )
}

/// Request property values → stored shape: adds `type` and `plain_text` the way Notion does.
fn response_properties(props: &Map<String, Value>) -> Map<String, Value> {
    props
        .iter()
        .filter_map(|(key, value)| {
            let (kind, payload) = value.as_object()?.iter().next()?;
            let payload = match kind.as_str() {
                "title" | "rich_text" => Value::Array(
                    payload
                        .as_array()
                        .cloned()
                        .unwrap_or_default()
                        .into_iter()
                        .map(|mut item| {
                            let content = item
                                .pointer("/text/content")
                                .cloned()
                                .unwrap_or(Value::String(String::new()));
                            item["plain_text"] = content;
                            item
                        })
                        .collect(),
                ),
                _ => payload.clone(),
            };
            let mut prop = Map::new();
            prop.insert("type".to_string(), Value::String(kind.clone()));
            prop.insert(kind.clone(), payload);
            Some((key.clone(), Value::Object(prop)))
        })
        .collect()
}

fn matches_filter(page: &Value, filter: &Value) -> bool {
    let Some(key) = filter.get("property").and_then(|p| p.as_str()) else {
        return false;
    };
    let Some(prop) = page.pointer("/properties").and_then(|p| p.get(key)) else {
        return false;
    };
    let kind = prop.get("type").and_then(|t| t.as_str()).unwrap_or("");
    let Some(condition) = filter.get(kind) else {
        return false;
    };
    let payload = &prop[kind];
    if let Some(wanted) = condition.get("equals").and_then(|v| v.as_str()) {
        let actual = match payload {
            Value::Array(items) => items
                .iter()
                .filter_map(|i| i.get("plain_text").and_then(|t| t.as_str()))
                .collect::<String>(),
            Value::String(s) => s.clone(),
            _ => String::new(),
        };
        return actual == wanted;
    }
    if let Some(wanted) = condition.get("contains").and_then(|v| v.as_str()) {
        return payload
            .as_array()
            .map(|opts| {
                opts.iter()
                    .any(|o| o.get("name").and_then(|n| n.as_str()) == Some(wanted))
            })
            .unwrap_or(false);
    }
    false
}
