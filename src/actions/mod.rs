// src/actions/mod.rs
//! Actions applied when a rule matches
//!
//! Actions have no logic tags: once the condition chain of a rule holds,
//! every action runs, in list order. On the wire an action is
//! `{"id", "type", "params"}`; in memory the parameters are a sum type so
//! each kind only carries the fields that are legal for it.

use crate::ids;
use crate::reorder::{self, Identified};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// Alert severity for notify actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Action discriminant, as sent in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Block,
    Flag,
    Score,
    Notify,
    Redirect,
    Track,
}

/// What an action does, with its type-specific parameters
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    /// Reject the event
    Block,

    /// Mark the event for review
    Flag,

    /// Add to the fraud score
    Score { score: f64 },

    /// Alert the account team
    Notify { message: String, severity: Severity },

    /// Send the visitor elsewhere
    Redirect { url: String },

    /// Record the event without intervening
    Track,
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionKind::Block => ActionType::Block,
            ActionKind::Flag => ActionType::Flag,
            ActionKind::Score { .. } => ActionType::Score,
            ActionKind::Notify { .. } => ActionType::Notify,
            ActionKind::Redirect { .. } => ActionType::Redirect,
            ActionKind::Track => ActionType::Track,
        }
    }

    /// Kind with empty parameters, used when the type picker changes
    pub fn default_for(action_type: ActionType) -> Self {
        match action_type {
            ActionType::Block => ActionKind::Block,
            ActionType::Flag => ActionKind::Flag,
            ActionType::Score => ActionKind::Score { score: 0.0 },
            ActionType::Notify => ActionKind::Notify {
                message: String::new(),
                severity: Severity::Medium,
            },
            ActionType::Redirect => ActionKind::Redirect { url: String::new() },
            ActionType::Track => ActionKind::Track,
        }
    }

    /// Notify action
    pub fn notify(message: impl Into<String>, severity: Severity) -> Self {
        ActionKind::Notify {
            message: message.into(),
            severity,
        }
    }

    /// Redirect action
    pub fn redirect(url: impl Into<String>) -> Self {
        ActionKind::Redirect { url: url.into() }
    }

    /// The parameter a user still has to fill in before the action is usable
    pub fn missing_param(&self) -> Option<&'static str> {
        match self {
            ActionKind::Redirect { url } if url.trim().is_empty() => Some("url"),
            ActionKind::Notify { message, .. } if message.trim().is_empty() => Some("message"),
            _ => None,
        }
    }

    fn to_params(&self) -> Map<String, Json> {
        let mut params = Map::new();
        match self {
            ActionKind::Score { score } => {
                params.insert("score".to_string(), Json::from(*score));
            }
            ActionKind::Notify { message, severity } => {
                params.insert("message".to_string(), Json::from(message.clone()));
                params.insert(
                    "severity".to_string(),
                    serde_json::to_value(severity).unwrap_or(Json::Null),
                );
            }
            ActionKind::Redirect { url } => {
                params.insert("url".to_string(), Json::from(url.clone()));
            }
            ActionKind::Block | ActionKind::Flag | ActionKind::Track => {}
        }
        params
    }

    /// Decode wire params. Missing params fall back to the
    /// [`ActionKind::default_for`] values so half-edited drafts still load;
    /// params of the wrong type are rejected.
    fn from_params(action_type: ActionType, params: &Map<String, Json>) -> Result<Self, String> {
        let kind = match action_type {
            ActionType::Score => ActionKind::Score {
                score: match present(params, "score") {
                    Some(raw) => raw
                        .as_f64()
                        .ok_or("score action requires a numeric `score`")?,
                    None => 0.0,
                },
            },
            ActionType::Redirect => ActionKind::Redirect {
                url: string_param(params, "url")?,
            },
            ActionType::Notify => ActionKind::Notify {
                message: string_param(params, "message")?,
                severity: match present(params, "severity") {
                    Some(raw) => serde_json::from_value(raw.clone())
                        .map_err(|e| format!("invalid severity: {}", e))?,
                    None => Severity::Medium,
                },
            },
            ActionType::Block | ActionType::Flag | ActionType::Track => {
                ActionKind::default_for(action_type)
            }
        };
        Ok(kind)
    }
}

/// A param that is set to something other than `null`
fn present<'a>(params: &'a Map<String, Json>, key: &str) -> Option<&'a Json> {
    params.get(key).filter(|value| !value.is_null())
}

/// String param, empty when absent
fn string_param(params: &Map<String, Json>, key: &str) -> Result<String, String> {
    match present(params, key) {
        Some(raw) => raw
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| format!("parameter `{}` must be a string", key)),
        None => Ok(String::new()),
    }
}

/// One action of a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireAction", into = "WireAction")]
pub struct Action {
    pub id: String,
    pub kind: ActionKind,
}

impl Action {
    /// New action with a fresh id
    pub fn new(kind: ActionKind) -> Self {
        Self {
            id: ids::action_id(),
            kind,
        }
    }

    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }
}

impl Identified for Action {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Serialize, Deserialize)]
struct WireAction {
    id: String,
    #[serde(rename = "type")]
    action_type: ActionType,
    #[serde(default)]
    params: Map<String, Json>,
}

impl TryFrom<WireAction> for Action {
    type Error = String;

    fn try_from(wire: WireAction) -> Result<Self, Self::Error> {
        let kind = ActionKind::from_params(wire.action_type, &wire.params)?;
        Ok(Action { id: wire.id, kind })
    }
}

impl From<Action> for WireAction {
    fn from(action: Action) -> Self {
        WireAction {
            action_type: action.kind.action_type(),
            params: action.kind.to_params(),
            id: action.id,
        }
    }
}

/// Ordered list of actions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action at the end of the list
    pub fn append(&mut self, kind: ActionKind) -> &Action {
        self.actions.push(Action::new(kind));
        &self.actions[self.actions.len() - 1]
    }

    /// Replace the parameters of the action with `id`. Unknown ids are ignored.
    pub fn update(&mut self, id: &str, kind: ActionKind) -> bool {
        match self.actions.iter_mut().find(|a| a.id == id) {
            Some(action) => {
                action.kind = kind;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Action> {
        let index = self.actions.iter().position(|a| a.id == id)?;
        Some(self.actions.remove(index))
    }

    /// Move `from_id` to the slot held by `to_id`
    pub fn reorder(&mut self, from_id: &str, to_id: &str) -> bool {
        reorder::move_by_id(&mut self.actions, from_id, Some(to_id))
    }

    pub fn get(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn as_slice(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl From<Vec<Action>> for ActionList {
    fn from(actions: Vec<Action>) -> Self {
        Self { actions }
    }
}

impl<'a> IntoIterator for &'a ActionList {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}
