// src/runtime/mod.rs
//! Values and local evaluation of rules against sample input

pub mod evaluator;
pub mod value;

pub use evaluator::{evaluate_chain, evaluate_rule, RuleOutcome};
pub use value::Value;
