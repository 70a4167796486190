// benches/rule_evaluation.rs
//! Benchmarks for chain evaluation and reordering
//!
//! Run with: cargo bench

use ahash::HashMap;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fraud_rule_editor::reorder::move_item;
use fraud_rule_editor::{evaluator, ActionKind, Operator, RuleDocument, RuleType, Value};

fn input() -> HashMap<String, Value> {
    let mut input = HashMap::default();
    input.insert("ip_address".to_string(), Value::from("192.168.1.1"));
    input.insert("country".to_string(), Value::from("US"));
    input.insert("click_rate".to_string(), Value::from(150));
    input.insert("user_agent".to_string(), Value::from("Mozilla/5.0 (X11; Linux x86_64)"));
    input
}

fn rule_with(len: usize) -> RuleDocument {
    let mut rule = RuleDocument::new("bench", RuleType::Behavioral);
    for i in 0..len {
        match i % 4 {
            0 => rule.conditions.append("click_rate", Operator::GreaterThan, (i * 10).to_string()),
            1 => rule.conditions.append("country", Operator::InList, "US, CA, GB"),
            2 => rule.conditions.append("ip_address", Operator::Contains, "192.168."),
            _ => rule.conditions.append("referrer", Operator::NotEquals, "partner.example.com"),
        };
    }
    rule.actions.append(ActionKind::Flag);
    rule
}

fn benchmark_single_condition(c: &mut Criterion) {
    let rule = rule_with(1);
    let input = input();

    c.bench_function("single_condition", |b| {
        b.iter(|| evaluator::evaluate_rule(black_box(&rule), black_box(&input)))
    });
}

fn benchmark_chain_lengths(c: &mut Criterion) {
    let input = input();
    let mut group = c.benchmark_group("chain_length");

    for len in [10, 100, 500] {
        let rule = rule_with(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &rule, |b, rule| {
            b.iter(|| evaluator::evaluate_chain(black_box(&rule.conditions), black_box(&input)))
        });
    }

    group.finish();
}

fn benchmark_regex_condition(c: &mut Criterion) {
    let mut rule = RuleDocument::new("bot", RuleType::UserAgentBlock);
    rule.conditions
        .append("user_agent", Operator::Regex, r"(?i)(bot|crawler|spider|headless)");
    let input = input();

    c.bench_function("regex_condition", |b| {
        b.iter(|| evaluator::evaluate_rule(black_box(&rule), black_box(&input)))
    });
}

fn benchmark_reorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("reorder");

    for len in [10, 100, 1000] {
        let items: Vec<usize> = (0..len).collect();
        group.bench_with_input(BenchmarkId::from_parameter(len), &items, |b, items| {
            b.iter(|| {
                let mut items = items.clone();
                let last = items.len() - 1;
                move_item(&mut items, black_box(0), black_box(last));
                items
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_condition,
    benchmark_chain_lengths,
    benchmark_regex_condition,
    benchmark_reorder
);
criterion_main!(benches);
