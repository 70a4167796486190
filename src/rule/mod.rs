// src/rule/mod.rs
//! Fraud rule documents
//!
//! A rule is metadata plus an ordered condition chain and an ordered action
//! list. Conditions and actions are never stored on their own; they always
//! travel inside their rule.

pub mod condition;

use crate::actions::ActionList;
use crate::ValidationIssue;
use chrono::{DateTime, Utc};
use condition::ConditionChain;
use serde::{Deserialize, Serialize};

/// Id carried by a rule that has not been persisted yet
pub const NEW_RULE_ID: &str = "new";

/// Accepted priority range
pub const PRIORITY_RANGE: std::ops::RangeInclusive<i32> = 1..=100;

const DEFAULT_PRIORITY: i32 = 50;

/// Rule category. Purely descriptive; it does not change how conditions or
/// actions behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    IpBlock,
    CountryBlock,
    UserAgentBlock,
    RateLimit,
    ConversionRate,
    DeviceFingerprint,
    Behavioral,
}

/// One fraud-detection rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDocument {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub priority: i32,
    pub is_active: bool,
    #[serde(default)]
    pub conditions: ConditionChain,
    #[serde(default)]
    pub actions: ActionList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl RuleDocument {
    /// Unsaved rule with the editor's defaults
    pub fn new(name: impl Into<String>, rule_type: RuleType) -> Self {
        Self {
            id: NEW_RULE_ID.to_string(),
            name: name.into(),
            rule_type,
            priority: DEFAULT_PRIORITY,
            is_active: true,
            conditions: ConditionChain::new(),
            actions: ActionList::new(),
            description: None,
            tags: None,
            created_at: None,
            updated_at: None,
            created_by: None,
        }
    }

    /// Whether the rule still needs a create call
    pub fn is_new(&self) -> bool {
        self.id == NEW_RULE_ID
    }

    /// Check everything the editor requires before a save
    pub fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::EmptyName);
        }

        if !PRIORITY_RANGE.contains(&self.priority) {
            issues.push(ValidationIssue::PriorityOutOfRange(self.priority));
        }

        for action in &self.actions {
            if let Some(param) = action.kind.missing_param() {
                issues.push(ValidationIssue::IncompleteAction {
                    id: action.id.clone(),
                    param,
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Copy ready to be sent: a stale leading logic tag is cleared
    pub fn normalized(&self) -> Self {
        Self {
            conditions: self.conditions.normalized(),
            ..self.clone()
        }
    }
}
