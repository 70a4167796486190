// src/client/memory.rs
//! In-process transport
//!
//! Serves the same endpoints as the platform API from memory: collections
//! get server-assigned ids and timestamps, and the rule test endpoint is
//! answered by the local evaluator. Every request is recorded, and failures
//! can be queued to exercise error paths.

use super::{ApiRequest, Transport, POSTBACK_PROFILES_PATH, RULES_PATH, RULE_TEST_PATH};
use crate::harness::{TestReport, TestRequest};
use crate::ApiError;
use ahash::HashMap;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Method;
use serde_json::Value as Json;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::debug;

const COLLECTIONS: &[(&str, &str)] = &[(RULES_PATH, "rule"), (POSTBACK_PROFILES_PATH, "postback")];

#[derive(Default)]
struct MemoryState {
    collections: HashMap<&'static str, Vec<Json>>,
    next_id: u64,
    log: Vec<ApiRequest>,
    failures: VecDeque<u16>,
}

/// Transport that keeps every collection in memory
#[derive(Default)]
pub struct InMemoryTransport {
    state: Mutex<MemoryState>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request received so far, in order
    pub async fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().await.log.clone()
    }

    /// Answer the next request with `status` instead of handling it
    pub async fn fail_next(&self, status: u16) {
        self.state.lock().await.failures.push_back(status);
    }

    /// Number of documents stored under `collection`
    pub async fn count(&self, collection: &str) -> usize {
        let state = self.state.lock().await;
        state.collections.get(collection).map_or(0, Vec::len)
    }
}

fn status(status: u16, body: impl Into<String>) -> ApiError {
    ApiError::Status {
        status,
        body: body.into(),
    }
}

fn now() -> Json {
    Json::from(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Split a path into its collection and optional document id
fn route(path: &str) -> Option<(&'static str, &'static str, Option<&str>)> {
    COLLECTIONS.iter().find_map(|&(collection, prefix)| {
        if path == collection {
            Some((collection, prefix, None))
        } else {
            path.strip_prefix(collection)
                .and_then(|rest| rest.strip_prefix('/'))
                .filter(|id| !id.is_empty() && !id.contains('/'))
                .map(|id| (collection, prefix, Some(id)))
        }
    })
}

fn doc_id(doc: &Json) -> Option<&str> {
    doc.get("id").and_then(Json::as_str)
}

impl MemoryState {
    fn handle(&mut self, request: &ApiRequest) -> Result<Json, ApiError> {
        if request.path == RULE_TEST_PATH {
            return if request.method == Method::POST {
                Self::run_tests(request.body.as_ref())
            } else {
                Err(status(405, "method not allowed"))
            };
        }

        let (collection, prefix, id) =
            route(&request.path).ok_or_else(|| status(404, "unknown endpoint"))?;

        match (request.method.as_str(), id) {
            ("GET", None) => Ok(Json::Array(
                self.collections.get(collection).cloned().unwrap_or_default(),
            )),
            ("POST", None) => {
                self.next_id += 1;
                let id = format!("{}-{}", prefix, self.next_id);
                let mut doc = object_body(request)?;
                if let Some(fields) = doc.as_object_mut() {
                    fields.insert("id".to_string(), Json::from(id));
                    fields.insert("createdAt".to_string(), now());
                    fields.insert("updatedAt".to_string(), now());
                }
                self.collections
                    .entry(collection)
                    .or_default()
                    .push(doc.clone());
                Ok(doc)
            }
            ("PUT", Some(id)) => {
                let mut doc = object_body(request)?;
                let docs = self.collections.entry(collection).or_default();
                let slot = docs
                    .iter_mut()
                    .find(|existing| doc_id(existing) == Some(id))
                    .ok_or_else(|| status(404, format!("{} not found", id)))?;

                if let Some(fields) = doc.as_object_mut() {
                    fields.insert("id".to_string(), Json::from(id));
                    if let Some(created) = slot.get("createdAt") {
                        fields.insert("createdAt".to_string(), created.clone());
                    }
                    fields.insert("updatedAt".to_string(), now());
                }
                *slot = doc.clone();
                Ok(doc)
            }
            ("DELETE", Some(id)) => {
                let docs = self.collections.entry(collection).or_default();
                let index = docs
                    .iter()
                    .position(|existing| doc_id(existing) == Some(id))
                    .ok_or_else(|| status(404, format!("{} not found", id)))?;
                docs.remove(index);
                Ok(Json::Null)
            }
            _ => Err(status(405, "method not allowed")),
        }
    }

    fn run_tests(body: Option<&Json>) -> Result<Json, ApiError> {
        let body = body.ok_or_else(|| status(400, "missing body"))?;
        let request: TestRequest = serde_json::from_value(body.clone())
            .map_err(|e| status(400, e.to_string()))?;

        let report = TestReport::local(&request.rule, &request.test_cases);
        Ok(serde_json::to_value(report.results)?)
    }
}

fn object_body(request: &ApiRequest) -> Result<Json, ApiError> {
    match &request.body {
        Some(body @ Json::Object(_)) => Ok(body.clone()),
        _ => Err(status(400, "expected a JSON object body")),
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, request: ApiRequest) -> Result<Json, ApiError> {
        debug!(method = %request.method, path = %request.path, "In-memory API request");

        let mut state = self.state.lock().await;
        state.log.push(request.clone());

        if let Some(code) = state.failures.pop_front() {
            return Err(status(code, "injected failure"));
        }

        state.handle(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_crud_cycle() {
        let transport = InMemoryTransport::new();

        let created = transport
            .send(ApiRequest::save(RULES_PATH, "new", json!({"id": "new", "name": "a"})))
            .await
            .unwrap();
        assert_eq!(created["id"], "rule-1");
        assert!(created["createdAt"].is_string());

        let updated = transport
            .send(ApiRequest::save(RULES_PATH, "rule-1", json!({"name": "b"})))
            .await
            .unwrap();
        assert_eq!(updated["id"], "rule-1");
        assert_eq!(updated["name"], "b");
        assert_eq!(updated["createdAt"], created["createdAt"]);

        let listed = transport.send(ApiRequest::list(RULES_PATH)).await.unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        transport
            .send(ApiRequest::delete(RULES_PATH, "rule-1"))
            .await
            .unwrap();
        assert_eq!(transport.count(RULES_PATH).await, 0);
        assert_eq!(transport.requests().await.len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_documents() {
        let transport = InMemoryTransport::new();

        let result = transport
            .send(ApiRequest::save(RULES_PATH, "rule-9", json!({})))
            .await;
        assert!(matches!(result, Err(ApiError::Status { status: 404, .. })));

        let result = transport
            .send(ApiRequest::delete(POSTBACK_PROFILES_PATH, "postback-1"))
            .await;
        assert!(matches!(result, Err(ApiError::Status { status: 404, .. })));

        let result = transport.send(ApiRequest::list("/api/offers")).await;
        assert!(matches!(result, Err(ApiError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let transport = InMemoryTransport::new();
        transport.fail_next(503).await;

        let first = transport.send(ApiRequest::list(RULES_PATH)).await;
        assert!(matches!(first, Err(ApiError::Status { status: 503, .. })));

        let second = transport.send(ApiRequest::list(RULES_PATH)).await.unwrap();
        assert_eq!(second, json!([]));
    }

    #[test]
    fn test_route() {
        assert_eq!(route("/api/fraud/rules"), Some((RULES_PATH, "rule", None)));
        assert_eq!(
            route("/api/postback-profiles/postback-3"),
            Some((POSTBACK_PROFILES_PATH, "postback", Some("postback-3")))
        );
        assert_eq!(route("/api/fraud/rules/"), None);
        assert_eq!(route("/api/fraud/rules/a/b"), None);
    }
}
