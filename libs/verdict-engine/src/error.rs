use thiserror::Error;

/// Whole-run failure raised inside an executor.
///
/// Never crosses the dispatcher boundary: executors convert it into a
/// `RunResult` (see `evaluator::from_fault`).
#[derive(Debug, Error)]
pub enum ExecutionFault {
    /// Submission failed to parse/load, or a guardrail rejected the request
    #[error("{0}")]
    Harness(String),

    #[error("Execution timed out after {limit_ms} ms")]
    Timeout { limit_ms: u64 },

    /// The isolated unit itself failed (thread spawn, isolate crash, missing message)
    #[error("{0}")]
    Boundary(String),

    #[error("{0}")]
    Provisioning(String),
}

impl ExecutionFault {
    pub fn harness(message: impl Into<String>) -> Self {
        ExecutionFault::Harness(message.into())
    }

    pub fn boundary(message: impl Into<String>) -> Self {
        ExecutionFault::Boundary(message.into())
    }
}
