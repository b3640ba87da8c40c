//! Isolated Script Executor - JavaScript in a Fresh V8 Isolate
//!
//! **Core Responsibility:**
//! Run one submission against all of its test cases inside a brand new
//! isolate, and return a `RunResult` no matter how the run ends.
//!
//! **Run Lifecycle:**
//! 1. Guardrails and program assembly (`harness`)
//! 2. Wait for an isolate permit
//! 3. Launch the isolate thread (`unit`)
//! 4. Race the posted message against the wall-clock budget
//! 5. Convert the message (or the fault) into a verdict
//!
//! **Timeout Semantics:**
//! The budget covers permit wait and execution. When it elapses the pending
//! future is dropped; dropping the `IsolatedUnit` terminates the isolate, so a
//! CPU-bound loop is killed instead of being abandoned.

pub mod harness;
mod unit;

use crate::error::ExecutionFault;
use crate::evaluator::{aggregate_results, from_fault, CaseOutcome, ComparisonMode};
use harness::{HarnessProgram, PostedMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use unit::IsolatedUnit;
use verdict_common::config::EngineSettings;
use verdict_common::types::{RunResult, TestCase};

pub struct ScriptExecutor {
    permits: Arc<Semaphore>,
    heap_limit_bytes: usize,
}

impl ScriptExecutor {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(settings.max_concurrent_isolates.max(1))),
            heap_limit_bytes: settings.isolate_heap_bytes(),
        }
    }

    #[tracing::instrument(
        skip(self, source_code, test_cases),
        fields(function = %function_name, cases = test_cases.len(), timeout_ms = timeout.as_millis() as u64)
    )]
    pub async fn run(
        &self,
        source_code: &str,
        function_name: &str,
        test_cases: &[TestCase],
        timeout: Duration,
        mode: ComparisonMode,
    ) -> RunResult {
        match self.execute(source_code, function_name, test_cases, timeout).await {
            Ok(outcomes) => aggregate_results(test_cases, outcomes, mode),
            Err(fault) => {
                warn!(error = %fault, "Isolated run failed");
                from_fault(test_cases, &fault)
            }
        }
    }

    async fn execute(
        &self,
        source_code: &str,
        function_name: &str,
        test_cases: &[TestCase],
        timeout: Duration,
    ) -> Result<Vec<CaseOutcome>, ExecutionFault> {
        let program = HarnessProgram::build(source_code, function_name, test_cases)?;

        let run = async {
            let _permit = self
                .permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| ExecutionFault::boundary("Isolate pool is closed"))?;

            let mut unit = IsolatedUnit::launch(program, self.heap_limit_bytes)?;
            unit.outcome().await
        };

        let message = match tokio::time::timeout(timeout, run).await {
            Ok(message) => message?,
            Err(_) => {
                let limit_ms = timeout.as_millis() as u64;
                info!(limit_ms, "Isolated run exceeded its budget, isolate terminated");
                return Err(ExecutionFault::Timeout { limit_ms });
            }
        };

        into_outcomes(message)
    }
}

/// Map the harness message onto per-case outcomes
fn into_outcomes(message: PostedMessage) -> Result<Vec<CaseOutcome>, ExecutionFault> {
    if !message.success {
        let error = message.error.unwrap_or_else(|| "Unknown error".to_string());
        return Err(ExecutionFault::harness(error));
    }

    Ok(message
        .results
        .into_iter()
        .map(|case| match case.error {
            Some(error) => CaseOutcome::Raised(error),
            None => CaseOutcome::Returned {
                actual: case.actual.unwrap_or_else(|| "undefined".to_string()),
                expected: case.expected.unwrap_or_default(),
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_outcomes() {
        let message = PostedMessage::parse(
            r#"{"success":true,"results":[{"actual":"5","expected":"5"},{"error":"boom"},{"expected":"1"}]}"#,
        )
        .unwrap();

        let outcomes = into_outcomes(message).unwrap();
        assert_eq!(
            outcomes,
            vec![
                CaseOutcome::Returned { actual: "5".to_string(), expected: "5".to_string() },
                CaseOutcome::Raised("boom".to_string()),
                CaseOutcome::Returned { actual: "undefined".to_string(), expected: "1".to_string() },
            ]
        );
    }

    #[test]
    fn test_into_outcomes_top_level_error() {
        let message = PostedMessage::parse(r#"{"success":false,"error":"x is not defined"}"#).unwrap();
        let fault = into_outcomes(message).unwrap_err();
        assert_eq!(fault.to_string(), "x is not defined");
    }

    #[tokio::test]
    async fn test_invalid_function_name_is_harness_failure() {
        let executor = ScriptExecutor::new(&EngineSettings::default());
        let cases = vec![TestCase::new("1", "1")];
        let result = executor
            .run("function f(x) { return x; }", "f; fetch", &cases, Duration::from_secs(1), ComparisonMode::Structural)
            .await;

        assert!(result.is_harness_failure());
        assert_eq!(result.total, 1);
        assert!(result.error.unwrap().contains("Invalid function name"));
    }
}
