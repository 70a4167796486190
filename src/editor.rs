// src/editor.rs
//! Editing session for a single rule
//!
//! Holds the document being edited and tracks whether it diverged from the
//! last saved version. Drag-and-drop reorders only touch this in-memory
//! copy; nothing is persisted until the caller saves.

use crate::actions::{Action, ActionKind, ActionType};
use crate::rule::condition::{Condition, ConditionPatch, Operator, KNOWN_FIELDS};
use crate::rule::{RuleDocument, RuleType};
use crate::ValidationIssue;

#[derive(Debug, Clone)]
pub struct RuleEditor {
    document: RuleDocument,
    dirty: bool,
}

impl RuleEditor {
    /// Start editing a brand-new rule
    pub fn create(name: impl Into<String>, rule_type: RuleType) -> Self {
        Self {
            document: RuleDocument::new(name, rule_type),
            dirty: true,
        }
    }

    /// Start editing an existing rule
    pub fn open(document: RuleDocument) -> Self {
        Self {
            document,
            dirty: false,
        }
    }

    pub fn document(&self) -> &RuleDocument {
        &self.document
    }

    pub fn into_document(self) -> RuleDocument {
        self.document
    }

    pub fn is_new(&self) -> bool {
        self.document.is_new()
    }

    /// Whether there are edits not yet saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the session's document with the stored version after a save
    pub fn mark_saved(&mut self, stored: RuleDocument) {
        self.document = stored;
        self.dirty = false;
    }

    pub fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        self.document.validate()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.document.name = name.into();
        self.dirty = true;
    }

    pub fn set_type(&mut self, rule_type: RuleType) {
        self.document.rule_type = rule_type;
        self.dirty = true;
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.document.priority = priority;
        self.dirty = true;
    }

    pub fn set_active(&mut self, active: bool) {
        self.document.is_active = active;
        self.dirty = true;
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.document.description = description;
        self.dirty = true;
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.document.tags = if tags.is_empty() { None } else { Some(tags) };
        self.dirty = true;
    }

    // Conditions

    /// Add a blank condition as the "Add Condition" button does
    pub fn add_condition(&mut self) -> &Condition {
        self.append_condition(KNOWN_FIELDS[0], Operator::Equals, "")
    }

    pub fn append_condition(
        &mut self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<String>,
    ) -> &Condition {
        self.dirty = true;
        self.document.conditions.append(field, operator, value)
    }

    pub fn update_condition(&mut self, id: &str, patch: ConditionPatch) -> bool {
        let changed = self.document.conditions.update(id, patch);
        self.dirty |= changed;
        changed
    }

    pub fn remove_condition(&mut self, id: &str) -> Option<Condition> {
        let removed = self.document.conditions.remove(id);
        self.dirty |= removed.is_some();
        removed
    }

    /// Drag-end handler for the condition list
    pub fn drag_condition(&mut self, active_id: &str, over_id: Option<&str>) -> bool {
        let moved = match over_id {
            Some(over_id) => self.document.conditions.reorder(active_id, over_id),
            None => false,
        };
        self.dirty |= moved;
        moved
    }

    // Actions

    /// Add a block action as the "Add Action" button does
    pub fn add_default_action(&mut self) -> &Action {
        self.add_action(ActionKind::default_for(ActionType::Block))
    }

    pub fn add_action(&mut self, kind: ActionKind) -> &Action {
        self.dirty = true;
        self.document.actions.append(kind)
    }

    pub fn update_action(&mut self, id: &str, kind: ActionKind) -> bool {
        let changed = self.document.actions.update(id, kind);
        self.dirty |= changed;
        changed
    }

    pub fn remove_action(&mut self, id: &str) -> Option<Action> {
        let removed = self.document.actions.remove(id);
        self.dirty |= removed.is_some();
        removed
    }

    /// Drag-end handler for the action list
    pub fn drag_action(&mut self, active_id: &str, over_id: Option<&str>) -> bool {
        let moved = match over_id {
            Some(over_id) => self.document.actions.reorder(active_id, over_id),
            None => false,
        };
        self.dirty |= moved;
        moved
    }
}
