// demos/http_client.rs
//! Talk to a running platform API
//!
//! Configure with `FRAUD_RULES_API__BASE_URL` (default http://localhost:3000)
//! and optionally `FRAUD_RULES_API__AUTH_TOKEN`, or pass a config file path
//! as the first argument.

use fraud_rule_editor::telemetry;
use fraud_rule_editor::{
    ActionKind, EditorConfig, HttpTransport, Notice, Operator, PostbackProfile, RuleDocument,
    RuleEditor, RuleTestHarness, RuleType, Store,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => EditorConfig::from_file(path)?,
        None => EditorConfig::from_env()?,
    };
    telemetry::init_tracing(&config.logging);

    tracing::info!(base_url = %config.api.base_url, "Connecting to platform API");

    let transport = Arc::new(HttpTransport::new(&config.api)?);
    let store = Store::new(transport.clone(), config.cache.stale_after());
    let harness = RuleTestHarness::new(transport);

    match store.list::<RuleDocument>().await {
        Ok(rules) => {
            println!("{} rule(s) on the server", rules.len());
            for rule in &rules {
                println!("  {} {} (priority {}, active {})", rule.id, rule.name, rule.priority, rule.is_active);
            }
        }
        Err(err) => println!("{}", err.notice().message),
    }

    match store.list::<PostbackProfile>().await {
        Ok(profiles) => println!("{} postback profile(s) on the server", profiles.len()),
        Err(err) => println!("{}", err.notice().message),
    }

    let mut editor = RuleEditor::create("Known bad subnet", RuleType::IpBlock);
    editor.append_condition("ip_address", Operator::Contains, "192.168.");
    editor.add_action(ActionKind::Block);

    let tests = fraud_rule_editor::harness::sample_tests();
    match harness.run(editor.document(), &tests).await {
        Ok(report) => println!("Test run: {} passed, {} failed", report.passed(), report.failed()),
        Err(err) => println!("{}", err.notice().message),
    }

    match store.save(editor.document()).await {
        Ok(stored) => {
            println!("{} (id {})", Notice::saved("rule").message, stored.id);
            editor.mark_saved(stored);
        }
        Err(err) => println!("{}", err.notice().message),
    }

    Ok(())
}
