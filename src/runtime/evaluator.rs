// src/runtime/evaluator.rs
//! Local preview evaluator
//!
//! Mirrors the matching contract the rule store uses so a rule can be
//! tried against sample input without a round trip. The chain is folded
//! strictly left to right; there is no operator precedence.

use crate::actions::Action;
use crate::rule::condition::{Condition, ConditionChain, Logic, Operator};
use crate::rule::RuleDocument;
use crate::runtime::value::Value;
use ahash::HashMap;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::{LazyLock, PoisonError, RwLock};

/// Compiled condition patterns. Invalid patterns are cached as `None`.
static PATTERN_CACHE: LazyLock<RwLock<HashMap<String, Option<Regex>>>> =
    LazyLock::new(|| RwLock::new(HashMap::default()));

const PATTERN_CACHE_CAPACITY: usize = 256;

/// Result of evaluating one rule against one input
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome<'a> {
    pub matched: bool,
    /// Actions to apply, in order. Empty unless `matched`.
    pub actions: Vec<&'a Action>,
}

/// Evaluate a whole rule. Inactive rules never match.
pub fn evaluate_rule<'a>(rule: &'a RuleDocument, input: &HashMap<String, Value>) -> RuleOutcome<'a> {
    let matched = rule.is_active && evaluate_chain(&rule.conditions, input);
    let actions = if matched {
        rule.actions.iter().collect()
    } else {
        Vec::new()
    };

    RuleOutcome { matched, actions }
}

/// Fold the chain as `(((c0) OP1 c1) OP2 c2) ...`.
///
/// The first element's logic is ignored, a later element without logic
/// combines with AND, and an empty chain never matches.
pub fn evaluate_chain(chain: &ConditionChain, input: &HashMap<String, Value>) -> bool {
    let mut conditions = chain.iter();

    let first = match conditions.next() {
        Some(condition) => condition_matches(condition, input),
        None => return false,
    };

    conditions.fold(first, |acc, condition| {
        let logic = condition.logic.unwrap_or(Logic::And);
        logic.apply(acc, condition_matches(condition, input))
    })
}

/// Test a single condition against the input record
pub fn condition_matches(condition: &Condition, input: &HashMap<String, Value>) -> bool {
    let actual = match input.get(&condition.field) {
        Some(value) if !value.is_null() => value,
        // A missing field only satisfies the negative operators
        _ => {
            return matches!(
                condition.operator,
                Operator::NotEquals | Operator::NotContains
            )
        }
    };

    let expected = condition.value.as_str();

    match condition.operator {
        Operator::Equals => eq(actual, expected),
        Operator::NotEquals => !eq(actual, expected),
        Operator::GreaterThan => compare(actual, expected) == Some(Ordering::Greater),
        Operator::LessThan => compare(actual, expected) == Some(Ordering::Less),
        Operator::Contains => actual.as_text().contains(expected),
        Operator::NotContains => !actual.as_text().contains(expected),
        Operator::Regex => regex_matches(actual, expected),
        Operator::InList => in_list(actual, expected),
    }
}

#[inline]
fn eq(actual: &Value, expected: &str) -> bool {
    match (actual.as_number(), Value::from(expected).as_number()) {
        (Some(a), Some(b)) => a == b,
        _ => actual.as_text() == expected,
    }
}

/// Numeric ordering when both sides are numbers, lexicographic when the
/// input is a string, otherwise incomparable.
#[inline]
fn compare(actual: &Value, expected: &str) -> Option<Ordering> {
    match (actual.as_number(), Value::from(expected).as_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => match actual {
            Value::String(s) => Some(s.as_str().cmp(expected)),
            _ => None,
        },
    }
}

fn regex_matches(actual: &Value, pattern: &str) -> bool {
    compiled(pattern).is_some_and(|re| re.is_match(&actual.as_text()))
}

fn compiled(pattern: &str) -> Option<Regex> {
    if let Some(cached) = PATTERN_CACHE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(pattern)
    {
        return cached.clone();
    }

    let compiled = match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "Invalid regex in condition, treating as no match");
            None
        }
    };

    let mut cache = PATTERN_CACHE.write().unwrap_or_else(PoisonError::into_inner);
    if cache.len() >= PATTERN_CACHE_CAPACITY {
        cache.clear();
    }
    cache.insert(pattern.to_string(), compiled.clone());
    compiled
}

fn in_list(actual: &Value, list: &str) -> bool {
    let candidates: Vec<&str> = list
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect();

    match actual {
        Value::Array(items) => items.iter().any(|item| {
            let text = item.as_text();
            candidates.iter().any(|c| *c == text)
        }),
        other => {
            let text = other.as_text();
            candidates.iter().any(|c| *c == text)
        }
    }
}
