use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Per-case `actual` text used when the whole run exceeded its wall-clock budget
pub const TIMEOUT_CASE_MESSAGE: &str =
    "Timeout — execution exceeded the limit (possible infinite loop)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    JavaScript,
    Python,
}

/// Canonical name or built-in alias, case-insensitive
impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "python" | "py" | "python3" => Ok(Language::Python),
            _ => Err(format!("Unsupported language: {}", s.trim())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::JavaScript => write!(f, "javascript"),
            Language::Python => write!(f, "python"),
        }
    }
}

/// A declarative test case.
///
/// `input` and `expected` are literal expressions in the target language's
/// syntax. They are handed to the executor untouched; a malformed literal
/// surfaces as a per-case runtime error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected: expected.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Human-readable label, falling back to the 1-based ordinal
    pub fn label(&self, index: usize) -> String {
        match &self.description {
            Some(d) if !d.trim().is_empty() => d.clone(),
            _ => format!("Test {}", index + 1),
        }
    }
}

/// One evaluation request. Created per run and discarded afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub id: Uuid,
    #[serde(default)]
    pub language: Option<String>,
    pub source_code: String,
    pub function_name: String,
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ExecutionRequest {
    pub fn new(
        source_code: impl Into<String>,
        function_name: impl Into<String>,
        test_cases: Vec<TestCase>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            language: None,
            source_code: source_code.into(),
            function_name: function_name.into(),
            test_cases,
            timeout_ms: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Outcome of a single test case, produced exactly once per case in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub input: String,
    pub expected: String,
    /// Serialized return value or a human-readable error message
    pub actual: String,
    pub pass: bool,
    pub description: String,
}

/// Aggregate outcome of one evaluation call.
///
/// **Invariants:**
/// - `passed + failed == total == test_cases.len()`
/// - `error` set and `timeout` unset: harness-level failure (compile error,
///   runtime provisioning failure, isolation boundary fault), `results` empty
/// - `timeout` set: the run exceeded its budget; every case is marked failed
///   with [`TIMEOUT_CASE_MESSAGE`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
    pub results: Vec<CaseResult>,
    pub error: Option<String>,
    /// Serialized only when set
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timeout: bool,
}

impl RunResult {
    pub fn from_cases(results: Vec<CaseResult>) -> Self {
        let passed = results.iter().filter(|r| r.pass).count();
        Self {
            passed,
            failed: results.len() - passed,
            total: results.len(),
            results,
            error: None,
            timeout: false,
        }
    }

    /// Whole-run failure: nothing was evaluated, every case counts as failed
    pub fn harness_failure(case_count: usize, error: impl Into<String>) -> Self {
        Self {
            passed: 0,
            failed: case_count,
            total: case_count,
            results: Vec::new(),
            error: Some(error.into()),
            timeout: false,
        }
    }

    pub fn timed_out(test_cases: &[TestCase], limit_ms: u64) -> Self {
        let results = test_cases
            .iter()
            .enumerate()
            .map(|(idx, tc)| CaseResult {
                input: tc.input.clone(),
                expected: tc.expected.clone(),
                actual: TIMEOUT_CASE_MESSAGE.to_string(),
                pass: false,
                description: tc.label(idx),
            })
            .collect::<Vec<_>>();

        Self {
            passed: 0,
            failed: results.len(),
            total: results.len(),
            results,
            error: Some(format!("Execution timed out after {} ms", limit_ms)),
            timeout: true,
        }
    }

    pub fn is_harness_failure(&self) -> bool {
        self.error.is_some() && !self.timeout
    }

    pub fn is_timeout(&self) -> bool {
        self.timeout
    }

    pub fn all_passed(&self) -> bool {
        self.error.is_none() && self.passed == self.total
    }

    /// Fraction of passed cases, 0.0 for an empty run
    pub fn score(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(pass: bool) -> CaseResult {
        CaseResult {
            input: "1".to_string(),
            expected: "1".to_string(),
            actual: "1".to_string(),
            pass,
            description: "Test 1".to_string(),
        }
    }

    #[test]
    fn test_language_aliases() {
        assert_eq!("PY".parse::<Language>(), Ok(Language::Python));
        assert_eq!("python".parse::<Language>(), Ok(Language::Python));
        assert_eq!(" JavaScript ".parse::<Language>(), Ok(Language::JavaScript));
        assert_eq!("js".parse::<Language>(), Ok(Language::JavaScript));
        assert_eq!("cobol".parse::<Language>(), Err("Unsupported language: cobol".to_string()));
        assert_eq!(Language::Python.to_string(), "python");
    }

    #[test]
    fn test_label_defaults_to_ordinal() {
        let tc = TestCase::new("2, 3", "5");
        assert_eq!(tc.label(0), "Test 1");
        assert_eq!(tc.label(4), "Test 5");

        let tc = tc.with_description("adds small numbers");
        assert_eq!(tc.label(0), "adds small numbers");
    }

    #[test]
    fn test_from_cases_counts() {
        let result = RunResult::from_cases(vec![case(true), case(false), case(true)]);
        assert_eq!(result.passed, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.total, 3);
        assert!(result.error.is_none());
        assert!(!result.all_passed());
        assert!((result.score() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_harness_failure_has_no_results() {
        let result = RunResult::harness_failure(4, "SyntaxError: Unexpected token");
        assert_eq!(result.passed, 0);
        assert_eq!(result.failed, 4);
        assert_eq!(result.total, 4);
        assert!(result.results.is_empty());
        assert!(result.is_harness_failure());
        assert!(!result.is_timeout());
    }

    #[test]
    fn test_timed_out_marks_every_case() {
        let cases = vec![TestCase::new("1", "1"), TestCase::new("2", "2")];
        let result = RunResult::timed_out(&cases, 200);

        assert_eq!(result.total, 2);
        assert_eq!(result.failed, 2);
        assert_eq!(result.error.as_deref(), Some("Execution timed out after 200 ms"));
        assert!(result.is_timeout());
        for r in &result.results {
            assert!(!r.pass);
            assert!(r.actual.contains("Timeout"));
        }
        assert_eq!(result.results[1].description, "Test 2");
    }

    #[test]
    fn test_timed_out_without_cases_is_still_a_timeout() {
        let result = RunResult::timed_out(&[], 50);

        assert!(result.results.is_empty());
        assert!(result.is_timeout());
        assert!(!result.is_harness_failure());
        assert!(!result.all_passed());
    }

    #[test]
    fn test_wire_shape() {
        let result = RunResult::from_cases(vec![case(true)]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["passed"], 1);
        assert_eq!(json["total"], 1);
        assert!(json["error"].is_null());
        assert_eq!(json["results"][0]["pass"], true);
        assert!(json.get("timeout").is_none());

        let json = serde_json::to_value(RunResult::timed_out(&[TestCase::new("1", "1")], 10)).unwrap();
        assert_eq!(json["timeout"], true);
        let back: RunResult = serde_json::from_value(json).unwrap();
        assert!(back.is_timeout());

        let tc: TestCase = serde_json::from_str(r#"{"input": "2, 3", "expected": "5"}"#).unwrap();
        assert!(tc.description.is_none());
    }
}
