pub mod config;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod interpreter;
pub mod isolate;


pub use config::{LanguageConfig, LanguageConfigManager};
pub use dispatcher::Dispatcher;
pub use evaluator::ComparisonMode;
pub use verdict_common::types::{CaseResult, ExecutionRequest, Language, RunResult, TestCase};

/// Evaluate with the process-wide [`Dispatcher`]
pub async fn evaluate(
    source_code: &str,
    language: Option<&str>,
    test_cases: &[TestCase],
    function_name: &str,
    timeout_ms: Option<u64>,
) -> RunResult {
    Dispatcher::shared()
        .evaluate(source_code, language, test_cases, function_name, timeout_ms)
        .await
}
