// src/lib.rs
//! # Fraud Rule Editor
//!
//! Client-side core of the fraud-rule editor: the rule document model,
//! ordered AND/OR condition chains, ordered action lists, the drag-and-drop
//! reorder primitive, the remote "test this rule" harness and the
//! persistence client for the rule store.
//!
//! ## Example
//!
//! ```rust
//! use fraud_rule_editor::{
//!     evaluator, ActionKind, Operator, RuleEditor, RuleType, Value,
//! };
//! use ahash::HashMap;
//!
//! let mut editor = RuleEditor::create("Block bad subnet", RuleType::IpBlock);
//! editor.append_condition("ip_address", Operator::Contains, "192.168.");
//! editor.append_condition("country", Operator::InList, "RU, CN");
//! editor.add_action(ActionKind::Block);
//!
//! assert!(editor.validate().is_ok());
//!
//! let mut input = HashMap::default();
//! input.insert("ip_address".to_string(), Value::from("192.168.1.1"));
//! input.insert("country".to_string(), Value::from("RU"));
//!
//! let outcome = evaluator::evaluate_rule(editor.document(), &input);
//! assert!(outcome.matched);
//! assert_eq!(outcome.actions.len(), 1);
//! ```

pub mod actions;
pub mod client;
pub mod config;
pub mod editor;
pub mod harness;
pub mod ids;
pub mod postback;
pub mod reorder;
pub mod rule;
pub mod runtime;
pub mod telemetry;

use std::fmt;
use thiserror::Error;

pub use actions::{Action, ActionKind, ActionList, ActionType, Severity};
pub use client::{ApiRequest, HttpTransport, InMemoryTransport, QueryCache, Store, Transport};
pub use config::EditorConfig;
pub use editor::RuleEditor;
pub use harness::{RuleTest, RuleTestHarness, TestCaseResult, TestReport};
pub use postback::PostbackProfile;
pub use rule::condition::{Condition, ConditionChain, ConditionPatch, Logic, Operator};
pub use rule::{RuleDocument, RuleType, NEW_RULE_ID};
pub use runtime::evaluator;
pub use runtime::value::Value;

/// Errors raised while talking to the platform API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A single reason a document cannot be saved
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Priority {0} is outside 1-100")]
    PriorityOutOfRange(i32),

    #[error("Action {id} is missing its {param}")]
    IncompleteAction { id: String, param: &'static str },

    #[error("URL must start with http:// or https://: {0}")]
    InvalidUrl(String),

    #[error("Unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),

    #[error("Status {0} is mapped more than once")]
    DuplicateStatus(String),

    #[error("Parameter key must not be empty")]
    EmptyParameterKey,

    #[error("Signing is enabled but no secret is set")]
    MissingSecret,

    #[error("Max attempts {0} is outside 1-10")]
    AttemptsOutOfRange(u32),

    #[error("Initial delay {initial}s exceeds max delay {max}s")]
    DelayExceedsCap { initial: u64, max: u64 },
}

/// User-triggered operations that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Save,
    Delete,
    Test,
}

impl Operation {
    fn verb(self) -> &'static str {
        match self {
            Operation::List => "load",
            Operation::Save => "save",
            Operation::Delete => "delete",
            Operation::Test => "test",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "List",
            Operation::Save => "Save",
            Operation::Delete => "Delete",
            Operation::Test => "Test",
        };
        f.write_str(name)
    }
}

/// Errors surfaced to the editing session
///
/// Every variant is recoverable: the document being edited is never
/// touched by a failure, so the user can fix it and retry.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("{op} {resource} failed: {source}")]
    Api {
        op: Operation,
        resource: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("Validation failed: {}", join_issues(.0))]
    Invalid(Vec<ValidationIssue>),

    #[error("{op} already in progress")]
    Busy { op: Operation },

    #[error("At least one test case is required")]
    EmptyTestSuite,
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl EditorError {
    /// The toast shown for this failure.
    ///
    /// Transport errors and server-side rejections collapse into the same
    /// generic message.
    pub fn notice(&self) -> Notice {
        match self {
            EditorError::Api { op, resource, .. } => {
                Notice::error(format!("Failed to {} {}", op.verb(), resource))
            }
            EditorError::Invalid(issues) => Notice::error(join_issues(issues)),
            EditorError::Busy { op } => Notice::error(format!("{} already in progress", op)),
            EditorError::EmptyTestSuite => Notice::error("Add at least one test case"),
        }
    }
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// User-facing toast message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: &'static str,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: "Success",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: "Error",
            message: message.into(),
        }
    }

    /// Notice for a successful save of `resource`
    pub fn saved(resource: &str) -> Self {
        Self::success(format!("{} saved successfully", capitalize(resource)))
    }

    /// Notice for a successful delete of `resource`
    pub fn deleted(resource: &str) -> Self {
        Self::success(format!("{} deleted successfully", capitalize(resource)))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
