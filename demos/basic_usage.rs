// demos/basic_usage.rs
//! Offline editing session against the in-memory rule store

use ahash::HashMap;
use fraud_rule_editor::harness::sample_tests;
use fraud_rule_editor::{
    evaluator, ActionKind, ConditionPatch, InMemoryTransport, Logic, Notice, Operator,
    RuleDocument, RuleEditor, RuleTestHarness, RuleType, Severity, Store, Value,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    println!("=== Fraud Rule Editor - Basic Usage ===\n");

    let transport = Arc::new(InMemoryTransport::new());
    let store = Store::new(transport.clone(), Duration::from_secs(30));
    let harness = RuleTestHarness::new(transport.clone());

    // Build a rule the way the editor UI does
    let mut editor = RuleEditor::create("Suspicious US click flood", RuleType::RateLimit);
    editor.append_condition("country", Operator::Equals, "US");
    let rate = editor
        .append_condition("click_rate", Operator::GreaterThan, "100")
        .id
        .clone();
    let ip = editor
        .append_condition("ip_address", Operator::Contains, "10.0.")
        .id
        .clone();
    editor.update_condition(&ip, ConditionPatch::logic(Logic::Or));
    editor.add_action(ActionKind::Flag);
    editor.add_action(ActionKind::notify("Click flood detected", Severity::High));

    // Drag the IP check to the top
    let first = editor.document().conditions.first().map(|c| c.id.clone());
    editor.drag_condition(&ip, first.as_deref());

    println!("Conditions:");
    for condition in &editor.document().conditions {
        println!(
            "  {:>4} {} {:?} {:?}",
            condition.logic.map(|l| format!("{:?}", l)).unwrap_or_default(),
            condition.field,
            condition.operator,
            condition.value
        );
    }
    println!();

    // Local preview
    let mut input = HashMap::default();
    input.insert("country".to_string(), Value::from("US"));
    input.insert("click_rate".to_string(), Value::from(240));
    input.insert("ip_address".to_string(), Value::from("172.16.0.4"));

    let outcome = evaluator::evaluate_rule(editor.document(), &input);
    println!("Preview matched: {}", outcome.matched);
    for action in &outcome.actions {
        println!("  - {:?}", action.kind);
    }
    println!();

    // Remote test run
    match harness.run(editor.document(), &sample_tests()).await {
        Ok(report) => {
            println!("Test run: {} passed, {} failed", report.passed(), report.failed());
            for result in &report.results {
                let mark = if result.success { "✓" } else { "✗" };
                println!("  {} {}", mark, result.description);
            }
        }
        Err(err) => println!("{}", err.notice().message),
    }
    println!();

    // Save, edit, save again
    match store.save(editor.document()).await {
        Ok(stored) => {
            println!("{} (id {})", Notice::saved("rule").message, stored.id);
            editor.mark_saved(stored);
        }
        Err(err) => {
            println!("{}", err.notice().message);
            return;
        }
    }

    editor.update_condition(&rate, ConditionPatch::value("150"));
    editor.set_priority(80);
    match store.save(editor.document()).await {
        Ok(stored) => editor.mark_saved(stored),
        Err(err) => println!("{}", err.notice().message),
    }

    // Invalid documents never reach the server
    editor.set_name("");
    if let Err(err) = store.save(editor.document()).await {
        println!("Rejected locally: {}", err.notice().message);
    }
    println!();

    match store.list::<RuleDocument>().await {
        Ok(rules) => {
            println!("Stored rules:");
            for rule in rules {
                println!(
                    "  {} {:?} priority={} conditions={} actions={}",
                    rule.id,
                    rule.name,
                    rule.priority,
                    rule.conditions.len(),
                    rule.actions.len()
                );
            }
        }
        Err(err) => println!("{}", err.notice().message),
    }

    println!("\nRequests sent:");
    for request in transport.requests().await {
        println!("  {} {}", request.method, request.path);
    }
}
