// src/rule/condition.rs
//! Condition chain: ordered predicates combined by a strict left-to-right fold
//!
//! Each condition carries the combinator applied between the running result
//! and itself, so `[c0, c1(OR), c2(AND)]` reads `((c0 OR c1) AND c2)`. The
//! tag belongs to the element, not to the slot: moving an element moves its
//! tag with it and the chain is always evaluated in its current order.

use crate::ids;
use crate::reorder::{self, Identified};
use crate::runtime::evaluator;
use crate::runtime::value::Value;
use ahash::HashMap;
use serde::{Deserialize, Serialize};

/// Input fields offered by the editor's field picker
pub const KNOWN_FIELDS: &[&str] = &[
    "ip_address",
    "country",
    "user_agent",
    "click_rate",
    "conversion_rate",
    "device_id",
    "referrer",
    "session_duration",
    "clicks_per_ip",
    "time_to_convert",
];

/// Comparison applied between an input field and the condition value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    NotContains,
    Regex,
    InList,
}

/// Boolean combinator joining a condition to the result so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    #[inline]
    pub fn apply(self, left: bool, right: bool) -> bool {
        match self {
            Logic::And => left && right,
            Logic::Or => left || right,
        }
    }
}

/// One field-operator-value test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: String,
    pub field: String,
    pub operator: Operator,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<Logic>,
}

impl Identified for Condition {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Partial update for a condition; `None` fields are left as they are
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionPatch {
    pub field: Option<String>,
    pub operator: Option<Operator>,
    pub value: Option<String>,
    pub logic: Option<Logic>,
}

impl ConditionPatch {
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::default()
        }
    }

    pub fn operator(operator: Operator) -> Self {
        Self {
            operator: Some(operator),
            ..Self::default()
        }
    }

    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn logic(logic: Logic) -> Self {
        Self {
            logic: Some(logic),
            ..Self::default()
        }
    }

    fn apply_to(self, condition: &mut Condition) {
        if let Some(field) = self.field {
            condition.field = field;
        }
        if let Some(operator) = self.operator {
            condition.operator = operator;
        }
        if let Some(value) = self.value {
            condition.value = value;
        }
        if let Some(logic) = self.logic {
            condition.logic = Some(logic);
        }
    }
}

/// Ordered sequence of conditions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionChain {
    conditions: Vec<Condition>,
}

impl ConditionChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a condition at the end of the chain.
    ///
    /// The first condition never carries logic; every later one starts as `AND`.
    pub fn append(
        &mut self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<String>,
    ) -> &Condition {
        let logic = if self.conditions.is_empty() {
            None
        } else {
            Some(Logic::And)
        };

        self.conditions.push(Condition {
            id: ids::condition_id(),
            field: field.into(),
            operator,
            value: value.into(),
            logic,
        });

        &self.conditions[self.conditions.len() - 1]
    }

    /// Merge `patch` into the condition with `id`. Unknown ids are ignored.
    pub fn update(&mut self, id: &str, patch: ConditionPatch) -> bool {
        match self.conditions.iter_mut().find(|c| c.id == id) {
            Some(condition) => {
                patch.apply_to(condition);
                true
            }
            None => false,
        }
    }

    /// Remove the condition with `id`.
    ///
    /// A logic tag left on the new first element is kept as is; see
    /// [`ConditionChain::normalized`].
    pub fn remove(&mut self, id: &str) -> Option<Condition> {
        let index = self.conditions.iter().position(|c| c.id == id)?;
        Some(self.conditions.remove(index))
    }

    /// Move `from_id` to the slot held by `to_id`
    pub fn reorder(&mut self, from_id: &str, to_id: &str) -> bool {
        reorder::move_by_id(&mut self.conditions, from_id, Some(to_id))
    }

    /// Move by position; out-of-range or equal positions are a no-op
    pub fn move_to(&mut self, from: usize, to: usize) -> bool {
        reorder::move_item(&mut self.conditions, from, to)
    }

    /// Whether the first condition still carries a logic tag
    pub fn leading_logic_is_stale(&self) -> bool {
        self.conditions
            .first()
            .map_or(false, |first| first.logic.is_some())
    }

    /// Copy of the chain as it is saved: the leading logic tag cleared and
    /// every later condition without one joined with `AND`.
    ///
    /// Drags carry tags along with their conditions, so moving an element
    /// into or out of the first slot leaves both kinds of gap.
    pub fn normalized(&self) -> Self {
        let mut chain = self.clone();
        for (index, condition) in chain.conditions.iter_mut().enumerate() {
            if index == 0 {
                condition.logic = None;
            } else if condition.logic.is_none() {
                condition.logic = Some(Logic::And);
            }
        }
        chain
    }

    /// Positions of non-leading conditions that have no logic tag
    pub fn missing_logic(&self) -> Vec<(usize, &str)> {
        self.conditions
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, c)| c.logic.is_none())
            .map(|(i, c)| (i, c.id.as_str()))
            .collect()
    }

    /// Fold the chain over `input` (see [`evaluator::evaluate_chain`])
    pub fn evaluate(&self, input: &HashMap<String, Value>) -> bool {
        evaluator::evaluate_chain(self, input)
    }

    pub fn get(&self, id: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Condition> {
        self.conditions.iter()
    }

    pub fn as_slice(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn first(&self) -> Option<&Condition> {
        self.conditions.first()
    }

    pub fn last(&self) -> Option<&Condition> {
        self.conditions.last()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl From<Vec<Condition>> for ConditionChain {
    fn from(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }
}

impl<'a> IntoIterator for &'a ConditionChain {
    type Item = &'a Condition;
    type IntoIter = std::slice::Iter<'a, Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(chain: &ConditionChain) -> Vec<String> {
        chain.iter().map(|c| c.id.clone()).collect()
    }

    #[test]
    fn test_append_to_empty_chain_has_no_logic() {
        let mut chain = ConditionChain::new();
        chain.append("ip_address", Operator::Equals, "1.2.3.4");

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.last().unwrap().logic, None);
        assert_eq!(chain.last().unwrap().value, "1.2.3.4");
    }

    #[test]
    fn test_append_to_non_empty_chain_defaults_to_and() {
        let mut chain = ConditionChain::new();
        chain.append("ip_address", Operator::Equals, "1.2.3.4");
        chain.append("click_rate", Operator::GreaterThan, "10");
        let before = ids(&chain);

        chain.append("country", Operator::Equals, "US");

        assert_eq!(chain.len(), 3);
        assert_eq!(&ids(&chain)[..2], &before[..]);
        let last = chain.last().unwrap();
        assert_eq!(last.logic, Some(Logic::And));
        assert_eq!(last.field, "country");
    }

    #[test]
    fn test_update_merges_fields() {
        let mut chain = ConditionChain::new();
        let id = chain.append("ip_address", Operator::Equals, "").id.clone();
        chain.append("country", Operator::Equals, "US");

        assert!(chain.update(&id, ConditionPatch::value("10.0.0.1")));
        assert!(chain.update(&id, ConditionPatch::operator(Operator::Contains)));

        let updated = chain.get(&id).unwrap();
        assert_eq!(updated.field, "ip_address");
        assert_eq!(updated.operator, Operator::Contains);
        assert_eq!(updated.value, "10.0.0.1");
        assert_eq!(chain.iter().nth(1).unwrap().value, "US");
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut chain = ConditionChain::new();
        chain.append("ip_address", Operator::Equals, "1.2.3.4");
        let before = chain.clone();

        assert!(!chain.update("cond_missing", ConditionPatch::value("x")));
        assert_eq!(chain, before);
    }

    #[test]
    fn test_remove_first_keeps_stale_logic() {
        let mut chain = ConditionChain::new();
        let first = chain.append("ip_address", Operator::Equals, "a").id.clone();
        chain.append("country", Operator::Equals, "US");

        let removed = chain.remove(&first).unwrap();
        assert_eq!(removed.id, first);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.first().unwrap().logic, Some(Logic::And));
        assert!(chain.leading_logic_is_stale());

        let normalized = chain.normalized();
        assert!(!normalized.leading_logic_is_stale());
        assert_eq!(normalized.len(), 1);
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut chain = ConditionChain::new();
        chain.append("ip_address", Operator::Equals, "a");
        assert!(chain.remove("nope").is_none());
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_reorder_moves_logic_with_element() {
        let mut chain = ConditionChain::new();
        let a = chain.append("ip_address", Operator::Equals, "a").id.clone();
        let b = chain.append("country", Operator::Equals, "b").id.clone();
        let c = chain.append("user_agent", Operator::Contains, "c").id.clone();
        chain.update(&c, ConditionPatch::logic(Logic::Or));

        assert!(chain.reorder(&a, &c));

        assert_eq!(ids(&chain), vec![b.clone(), c.clone(), a.clone()]);
        let logics: Vec<_> = chain.iter().map(|c| c.logic).collect();
        assert_eq!(logics, vec![Some(Logic::And), Some(Logic::Or), None]);
        assert_eq!(chain.missing_logic(), vec![(2, a.as_str())]);

        let saved = chain.normalized();
        let logics: Vec<_> = saved.iter().map(|c| c.logic).collect();
        assert_eq!(logics, vec![None, Some(Logic::Or), Some(Logic::And)]);
        assert!(saved.missing_logic().is_empty());
    }

    #[test]
    fn test_json_shape() {
        let mut chain = ConditionChain::new();
        chain.append("ip_address", Operator::InList, "1.1.1.1,2.2.2.2");
        chain.append("click_rate", Operator::GreaterThan, "50");

        let json = serde_json::to_value(&chain).unwrap();
        let items = json.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["operator"], "in_list");
        assert!(items[0].get("logic").is_none());
        assert_eq!(items[1]["logic"], "AND");
        assert_eq!(items[1]["operator"], "greater_than");
    }
}
