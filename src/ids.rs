// src/ids.rs
//! Identifiers for conditions and actions
//!
//! Ids only need to be unique inside one rule document. They are built from
//! a random UUID so that two elements added within the same millisecond
//! still get distinct ids.

use uuid::Uuid;

const CONDITION_PREFIX: &str = "cond";
const ACTION_PREFIX: &str = "action";

/// Fresh id for a condition, e.g. `cond_5f0c…`
pub fn condition_id() -> String {
    prefixed(CONDITION_PREFIX)
}

/// Fresh id for an action, e.g. `action_9a41…`
pub fn action_id() -> String {
    prefixed(ACTION_PREFIX)
}

fn prefixed(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}
