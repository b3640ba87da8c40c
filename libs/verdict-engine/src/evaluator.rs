/// Case Evaluator - Language-Agnostic Verdict Logic
///
/// **Core Responsibility:**
/// Turn raw per-case outcomes from an executor into `CaseResult`s and an
/// aggregate `RunResult`.
///
/// **Critical Properties:**
/// - Knows nothing about V8 isolates
/// - Knows nothing about interpreter processes
/// - Pure function: (test cases, raw outcomes, comparison mode) → verdict
///
/// **Comparison Modes:**
/// - `Structural`: both sides decoded as JSON and compared element-wise.
///   Object key order is ignored, numbers compare by value (`5 == 5.0`).
///   Falls back to trimmed text equality when either side is not JSON.
/// - `QuoteStripped`: trim, drop one leading and one trailing quote
///   character from each side, then exact string equality.

use crate::error::ExecutionFault;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use verdict_common::types::{CaseResult, RunResult, TestCase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    #[default]
    Structural,
    QuoteStripped,
}

/// Raw outcome of one test case, produced by an executor
#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    /// The function returned; both values are serialized in the interchange form
    Returned { actual: String, expected: String },
    /// Decoding the literals or invoking the function raised
    Raised(String),
}

/// Strip surrounding whitespace plus one leading and one trailing quote
fn strip_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix(|c: char| c == '"' || c == '\'')
        .unwrap_or(trimmed);
    trimmed
        .strip_suffix(|c: char| c == '"' || c == '\'')
        .unwrap_or(trimmed)
}

/// Recursive equality on decoded values, lenient on numeric representation
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x == y {
                return true;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| structurally_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| structurally_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Compare a produced value against the expected one.
///
/// Returns the pass flag and the text to report as `actual`.
pub fn compare(actual: &str, expected: &str, mode: ComparisonMode) -> (bool, String) {
    match mode {
        ComparisonMode::Structural => {
            let pass = match (
                serde_json::from_str::<Value>(actual),
                serde_json::from_str::<Value>(expected),
            ) {
                (Ok(a), Ok(e)) => structurally_equal(&a, &e),
                _ => actual.trim() == expected.trim(),
            };
            (pass, actual.to_string())
        }
        ComparisonMode::QuoteStripped => {
            let actual_clean = strip_quotes(actual);
            let expected_clean = strip_quotes(expected);
            (actual_clean == expected_clean, actual_clean.to_string())
        }
    }
}

/// Evaluate a single test case outcome
pub fn evaluate_case(
    index: usize,
    test_case: &TestCase,
    outcome: &CaseOutcome,
    mode: ComparisonMode,
) -> CaseResult {
    let (pass, actual) = match outcome {
        CaseOutcome::Returned { actual, expected } => compare(actual, expected, mode),
        CaseOutcome::Raised(message) => (false, format!("Error: {}", message)),
    };

    CaseResult {
        input: test_case.input.clone(),
        expected: test_case.expected.clone(),
        actual,
        pass,
        description: test_case.label(index),
    }
}

/// Aggregate per-case outcomes into the final run result.
///
/// `outcomes` must line up with `test_cases`; a missing outcome is reported
/// as a failed case rather than silently dropped.
pub fn aggregate_results(
    test_cases: &[TestCase],
    outcomes: Vec<CaseOutcome>,
    mode: ComparisonMode,
) -> RunResult {
    let mut outcomes = outcomes.into_iter();
    let mut results = Vec::with_capacity(test_cases.len());

    for (idx, test_case) in test_cases.iter().enumerate() {
        let outcome = outcomes
            .next()
            .unwrap_or_else(|| CaseOutcome::Raised("no outcome reported for this case".to_string()));
        let result = evaluate_case(idx, test_case, &outcome, mode);

        debug!(
            test_num = idx + 1,
            pass = result.pass,
            expected = %result.expected,
            actual = %result.actual,
            "Case evaluated"
        );

        results.push(result);
    }

    let run = RunResult::from_cases(results);
    info!(passed = run.passed, failed = run.failed, total = run.total, "Evaluation complete");
    run
}

/// Convert a whole-run fault into its result shape
pub fn from_fault(test_cases: &[TestCase], fault: &ExecutionFault) -> RunResult {
    match fault {
        ExecutionFault::Timeout { limit_ms } => RunResult::timed_out(test_cases, *limit_ms),
        other => RunResult::harness_failure(test_cases.len(), other.to_string()),
    }
}
