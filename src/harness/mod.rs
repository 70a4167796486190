// src/harness/mod.rs
//! Rule test harness
//!
//! Sends a rule together with literal input records to the rule store's
//! test endpoint and reports pass/fail per case. Matching happens on the
//! server; the harness only compares what comes back.

use crate::client::pending::PendingSet;
use crate::client::{ApiRequest, Transport, RULE_TEST_PATH};
use crate::rule::RuleDocument;
use crate::runtime::evaluator;
use crate::runtime::value::Value;
use crate::{EditorError, Operation};
use ahash::HashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// One simulated event with the expected verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTest {
    pub input: HashMap<String, Value>,
    pub expected_match: bool,
    pub description: String,
}

impl RuleTest {
    pub fn new(description: impl Into<String>, expected_match: bool) -> Self {
        Self {
            input: HashMap::default(),
            expected_match,
            description: description.into(),
        }
    }

    pub fn with_input(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input.insert(field.into(), value.into());
        self
    }
}

/// Cases the editor sends when the user presses "Test Rule"
pub fn sample_tests() -> Vec<RuleTest> {
    vec![
        RuleTest::new("Suspicious traffic should match", true)
            .with_input("ip_address", "192.168.1.1")
            .with_input("country", "US")
            .with_input("click_rate", 150),
        RuleTest::new("Normal traffic should not match", false)
            .with_input("ip_address", "10.0.0.1")
            .with_input("country", "CA")
            .with_input("click_rate", 5),
    ]
}

/// Body of the test endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
    pub rule: RuleDocument,
    pub test_cases: Vec<RuleTest>,
}

/// Verdict for one test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub description: String,
    pub expected: bool,
    pub actual: bool,
    pub success: bool,
}

impl TestCaseResult {
    /// Whether `success` agrees with `expected == actual`
    pub fn is_consistent(&self) -> bool {
        self.success == (self.expected == self.actual)
    }
}

/// Results of one test run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestReport {
    pub results: Vec<TestCaseResult>,
}

impl TestReport {
    /// Evaluate the cases locally instead of asking the server
    pub fn local(rule: &RuleDocument, tests: &[RuleTest]) -> Self {
        let results = tests
            .iter()
            .map(|test| {
                let actual = evaluator::evaluate_rule(rule, &test.input).matched;
                TestCaseResult {
                    description: test.description.clone(),
                    expected: test.expected_match,
                    actual,
                    success: actual == test.expected_match,
                }
            })
            .collect();

        Self { results }
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        !self.results.is_empty() && self.failed() == 0
    }
}

/// Thin client for the remote rule test endpoint
pub struct RuleTestHarness<T: Transport> {
    transport: Arc<T>,
    pending: PendingSet,
}

impl<T: Transport> RuleTestHarness<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            pending: PendingSet::new(),
        }
    }

    /// Whether a test run is in flight
    pub fn is_pending(&self) -> bool {
        self.pending.is_pending(Operation::Test, RULE_TEST_PATH)
    }

    /// Run `tests` against `rule` on the server.
    ///
    /// No retries and no partial results: any failure fails the whole run.
    pub async fn run(&self, rule: &RuleDocument, tests: &[RuleTest]) -> Result<TestReport, EditorError> {
        if tests.is_empty() {
            return Err(EditorError::EmptyTestSuite);
        }

        let _guard = self.pending.try_begin(Operation::Test, RULE_TEST_PATH)?;

        let body = TestRequest {
            rule: rule.clone(),
            test_cases: tests.to_vec(),
        };
        let api_error = |source: crate::ApiError| EditorError::Api {
            op: Operation::Test,
            resource: "rule",
            source,
        };

        let body = serde_json::to_value(&body).map_err(|e| api_error(e.into()))?;
        debug!(rule_id = %rule.id, cases = tests.len(), "Testing rule");

        let response = self
            .transport
            .send(ApiRequest::test_rule(body))
            .await
            .map_err(|e| {
                warn!(rule_id = %rule.id, error = %e, "Rule test request failed");
                api_error(e)
            })?;

        let results: Vec<TestCaseResult> =
            serde_json::from_value(response).map_err(|e| api_error(e.into()))?;

        for result in results.iter().filter(|r| !r.is_consistent()) {
            warn!(
                description = %result.description,
                expected = result.expected,
                actual = result.actual,
                success = result.success,
                "Test result verdict disagrees with expected/actual"
            );
        }

        Ok(TestReport { results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;
    use crate::client::gated::GatedTransport;
    use crate::client::InMemoryTransport;
    use crate::rule::condition::Operator;
    use crate::rule::RuleType;
    use crate::ApiError;
    use reqwest::Method;

    fn ip_rule() -> RuleDocument {
        let mut rule = RuleDocument::new("Private range", RuleType::IpBlock);
        rule.conditions.append("ip_address", Operator::Contains, "192.168.");
        rule.actions.append(ActionKind::Block);
        rule
    }

    #[test]
    fn test_request_wire_shape() {
        let request = TestRequest {
            rule: ip_rule(),
            test_cases: vec![RuleTest::new("t1", true).with_input("ip_address", "192.168.1.1")],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["testCases"][0]["expectedMatch"], true);
        assert_eq!(json["testCases"][0]["input"]["ip_address"], "192.168.1.1");
        assert_eq!(json["rule"]["type"], "ip_block");
    }

    #[test]
    fn test_local_report() {
        let report = TestReport::local(&ip_rule(), &sample_tests());
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.passed(), 2);
        assert!(report.all_passed());
        assert!(report.results.iter().all(TestCaseResult::is_consistent));
    }

    #[test]
    fn test_report_counts() {
        let report = TestReport {
            results: vec![
                TestCaseResult {
                    description: "a".into(),
                    expected: true,
                    actual: true,
                    success: true,
                },
                TestCaseResult {
                    description: "b".into(),
                    expected: false,
                    actual: true,
                    success: false,
                },
            ],
        };
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.all_passed());
        assert!(!TestReport::default().all_passed());
    }

    #[tokio::test]
    async fn test_empty_suite_sends_nothing() {
        let transport = Arc::new(InMemoryTransport::new());
        let harness = RuleTestHarness::new(transport.clone());

        let result = harness.run(&ip_rule(), &[]).await;
        assert!(matches!(result, Err(EditorError::EmptyTestSuite)));
        assert!(transport.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.fail_next(500).await;
        let harness = RuleTestHarness::new(transport);

        let err = harness.run(&ip_rule(), &sample_tests()).await.unwrap_err();
        assert!(matches!(
            err,
            EditorError::Api {
                op: Operation::Test,
                source: ApiError::Status { status: 500, .. },
                ..
            }
        ));
        assert_eq!(err.notice().message, "Failed to test rule");
        assert!(!harness.is_pending());
    }

    #[tokio::test]
    async fn test_second_run_while_pending_is_busy() {
        let transport = Arc::new(GatedTransport::holding(Method::POST));
        let harness = RuleTestHarness::new(transport.clone());
        let tests = sample_tests();
        let rule = ip_rule();

        let (first, second) = tokio::join!(harness.run(&rule, &tests), async {
            transport.held().await;
            assert!(harness.is_pending());
            let second = harness.run(&ip_rule(), &tests).await;
            transport.release();
            second
        });

        assert!(first.unwrap().all_passed());
        assert!(matches!(second, Err(EditorError::Busy { op: Operation::Test })));
        assert!(!harness.is_pending());
        assert_eq!(transport.inner.requests().await.len(), 1);
    }
}
