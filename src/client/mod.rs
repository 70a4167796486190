// src/client/mod.rs
//! Persistence client for the rule store and postback profiles
//!
//! Requests are plain values ([`ApiRequest`]) executed by a [`Transport`]:
//! [`HttpTransport`] talks to the platform API, [`InMemoryTransport`] keeps
//! everything in process for offline editing and tests. [`Store`] layers
//! validation, upsert routing, a read-through cache and pending-operation
//! guards on top.

pub mod cache;
#[cfg(test)]
pub(crate) mod gated;
pub mod http;
pub mod memory;
pub(crate) mod pending;
pub mod store;

use crate::postback::PostbackProfile;
use crate::rule::{RuleDocument, NEW_RULE_ID};
use crate::{ApiError, ValidationIssue};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as Json;

pub use cache::QueryCache;
pub use http::HttpTransport;
pub use memory::InMemoryTransport;
pub use store::Store;

/// Fraud rule collection
pub const RULES_PATH: &str = "/api/fraud/rules";

/// Remote rule test endpoint
pub const RULE_TEST_PATH: &str = "/api/fraud/rules/test";

/// Postback profile collection
pub const POSTBACK_PROFILES_PATH: &str = "/api/postback-profiles";

/// One call against the platform API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Json>,
}

impl ApiRequest {
    /// Fetch a whole collection
    pub fn list(collection: &str) -> Self {
        Self {
            method: Method::GET,
            path: collection.to_string(),
            body: None,
        }
    }

    /// Create or update, decided only by the sentinel id: POST to the
    /// collection for `"new"`, PUT to `{collection}/{id}` for anything else.
    pub fn save(collection: &str, id: &str, body: Json) -> Self {
        let (method, path) = if id == NEW_RULE_ID {
            (Method::POST, collection.to_string())
        } else {
            (Method::PUT, format!("{}/{}", collection, id))
        };

        Self {
            method,
            path,
            body: Some(body),
        }
    }

    /// Delete one document
    pub fn delete(collection: &str, id: &str) -> Self {
        Self {
            method: Method::DELETE,
            path: format!("{}/{}", collection, id),
            body: None,
        }
    }

    /// Evaluate a rule remotely against test cases
    pub fn test_rule(body: Json) -> Self {
        Self {
            method: Method::POST,
            path: RULE_TEST_PATH.to_string(),
            body: Some(body),
        }
    }
}

/// Executes API requests
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the decoded JSON body (`Null` when empty)
    async fn send(&self, request: ApiRequest) -> Result<Json, ApiError>;
}

/// A document type persisted through a [`Store`]
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection path, e.g. `/api/fraud/rules`
    const COLLECTION: &'static str;

    /// Human-readable name used in notices
    const LABEL: &'static str;

    fn id(&self) -> &str;

    fn validate(&self) -> Result<(), Vec<ValidationIssue>>;

    /// The form sent to the server
    fn prepared(&self) -> Self {
        self.clone()
    }
}

impl Resource for RuleDocument {
    const COLLECTION: &'static str = RULES_PATH;
    const LABEL: &'static str = "rule";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        RuleDocument::validate(self)
    }

    fn prepared(&self) -> Self {
        self.normalized()
    }
}

impl Resource for PostbackProfile {
    const COLLECTION: &'static str = POSTBACK_PROFILES_PATH;
    const LABEL: &'static str = "postback profile";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        PostbackProfile::validate(self)
    }
}
