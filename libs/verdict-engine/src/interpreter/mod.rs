//! Secondary Runtime Executor - Python on a Lazily Provisioned Interpreter
//!
//! **Core Responsibility:**
//! Provision one interpreter per process on first use, then evaluate each
//! test case as its own program against it.
//!
//! **Provisioning:**
//! - Single-flight: concurrent first calls share one provisioning attempt
//! - Bounded by a load timeout; a timed-out or failed attempt leaves the
//!   cache empty so a later call retries
//! - Once provisioned, the interpreter lives for the rest of the process
//!
//! **Per-Case Isolation:**
//! Each case runs in a fresh namespace, so definitions from one case are not
//! visible to the next. There is no cancellation once a case started.

pub mod harness;
pub mod provision;

use crate::error::ExecutionFault;
use crate::evaluator::{aggregate_results, from_fault, CaseOutcome, ComparisonMode};
use crate::isolate::harness::check_request;
pub use provision::{Interpreter, ProcessProvisioner, RuntimeProvisioner};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use verdict_common::config::EngineSettings;
use verdict_common::types::{RunResult, TestCase};

pub struct RuntimeExecutor {
    provisioner: Arc<dyn RuntimeProvisioner>,
    interpreter: OnceCell<Arc<dyn Interpreter>>,
    load_timeout: Duration,
}

impl RuntimeExecutor {
    pub fn new(settings: &EngineSettings) -> Self {
        Self::with_provisioner(
            Arc::new(ProcessProvisioner::new(settings.python_candidates.clone())),
            settings.runtime_load_timeout(),
        )
    }

    pub fn with_provisioner(provisioner: Arc<dyn RuntimeProvisioner>, load_timeout: Duration) -> Self {
        Self {
            provisioner,
            interpreter: OnceCell::new(),
            load_timeout,
        }
    }

    pub fn is_provisioned(&self) -> bool {
        self.interpreter.initialized()
    }

    /// Cached interpreter, provisioning it within `limit` if needed
    async fn interpreter(&self, limit: Duration) -> Result<Arc<dyn Interpreter>, ExecutionFault> {
        if let Some(interpreter) = self.interpreter.get() {
            return Ok(interpreter.clone());
        }

        let provision = self.interpreter.get_or_try_init(|| async {
            info!("Provisioning Python runtime");
            self.provisioner
                .provision()
                .await
                .map_err(|e| ExecutionFault::Provisioning(format!("{:#}", e)))
        });

        match tokio::time::timeout(limit, provision).await {
            Ok(Ok(interpreter)) => Ok(interpreter.clone()),
            Ok(Err(fault)) => Err(fault),
            Err(_) => Err(ExecutionFault::Provisioning(format!(
                "Python runtime load timeout after {} ms",
                limit.as_millis()
            ))),
        }
    }

    /// Evaluate every case sequentially. `load_timeout` overrides the
    /// provisioning budget only.
    #[tracing::instrument(
        skip(self, source_code, test_cases),
        fields(function = %function_name, cases = test_cases.len())
    )]
    pub async fn run(
        &self,
        source_code: &str,
        function_name: &str,
        test_cases: &[TestCase],
        load_timeout: Option<Duration>,
        mode: ComparisonMode,
    ) -> RunResult {
        match self
            .execute(source_code, function_name, test_cases, load_timeout)
            .await
        {
            Ok(outcomes) => aggregate_results(test_cases, outcomes, mode),
            Err(fault) => {
                warn!(error = %fault, "Python run failed");
                from_fault(test_cases, &fault)
            }
        }
    }

    async fn execute(
        &self,
        source_code: &str,
        function_name: &str,
        test_cases: &[TestCase],
        load_timeout: Option<Duration>,
    ) -> Result<Vec<CaseOutcome>, ExecutionFault> {
        check_request(source_code, function_name, test_cases, harness::is_identifier)?;

        let interpreter = self
            .interpreter(load_timeout.unwrap_or(self.load_timeout))
            .await?;

        let mut outcomes = Vec::with_capacity(test_cases.len());
        for (idx, test_case) in test_cases.iter().enumerate() {
            let program = harness::case_program(source_code, function_name, &test_case.input);
            let outcome = match interpreter.run(&program).await {
                Ok(actual) => CaseOutcome::Returned {
                    actual,
                    expected: test_case.expected.clone(),
                },
                Err(e) => {
                    debug!(test_num = idx + 1, error = %e, "Case raised");
                    CaseOutcome::Raised(e.to_string())
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}
