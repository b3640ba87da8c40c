// Command implementations for the Verdict CLI
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;
use verdict_common::config::EngineSettings;
use verdict_engine::{ComparisonMode, Dispatcher, LanguageConfigManager, RunResult, TestCase};

/// Test file contents: either a bare list of cases or a suite with defaults
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TestsFile {
    Suite {
        #[serde(default)]
        function_name: Option<String>,
        #[serde(default)]
        language: Option<String>,
        test_cases: Vec<TestCase>,
    },
    Cases(Vec<TestCase>),
}

/// Normalized view of a tests file
#[derive(Debug)]
pub struct TestSuite {
    pub function_name: Option<String>,
    pub language: Option<String>,
    pub test_cases: Vec<TestCase>,
}

impl From<TestsFile> for TestSuite {
    fn from(file: TestsFile) -> Self {
        match file {
            TestsFile::Suite {
                function_name,
                language,
                test_cases,
            } => TestSuite {
                function_name,
                language,
                test_cases,
            },
            TestsFile::Cases(test_cases) => TestSuite {
                function_name: None,
                language: None,
                test_cases,
            },
        }
    }
}

pub fn load_tests(path: &Path) -> Result<TestSuite> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read tests file {}", path.display()))?;
    let file: TestsFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse tests file {}", path.display()))?;
    Ok(file.into())
}

/// Language implied by the source file extension
pub fn infer_language(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("py") => "python",
        _ => "javascript",
    }
}

fn comparison_name(mode: ComparisonMode) -> &'static str {
    match mode {
        ComparisonMode::Structural => "structural",
        ComparisonMode::QuoteStripped => "quote_stripped",
    }
}

/// Human-readable report of one run
pub fn render_summary(result: &RunResult) -> String {
    let mut lines = vec![format!("{}/{} test cases passed", result.passed, result.total)];

    if let Some(error) = &result.error {
        lines.push(format!("Error: {}", error));
    }

    for case in &result.results {
        let mark = if case.pass { "✓" } else { "✗" };
        lines.push(format!(
            "{} {}: Input({}) → Expected({}) Got({})",
            mark, case.description, case.input, case.expected, case.actual
        ));
    }

    lines.join("\n")
}

pub struct RunOptions<'a> {
    pub source: &'a Path,
    pub tests: &'a Path,
    pub function: Option<&'a str>,
    pub language: Option<&'a str>,
    pub timeout_ms: Option<u64>,
    pub json: bool,
}

/// Run a source file against a tests file. Returns whether every case passed.
pub async fn run_tests(options: RunOptions<'_>) -> Result<bool> {
    let source_code = fs::read_to_string(options.source)
        .with_context(|| format!("Failed to read source file {}", options.source.display()))?;
    let suite = load_tests(options.tests)?;

    let language = options
        .language
        .map(str::to_string)
        .or(suite.language)
        .unwrap_or_else(|| infer_language(options.source).to_string());
    let function_name = options
        .function
        .map(str::to_string)
        .or(suite.function_name)
        .unwrap_or_default();

    debug!(%language, function = %function_name, cases = suite.test_cases.len(), "Running tests file");

    let languages = LanguageConfigManager::load_or_builtin(None)?;
    let dispatcher = Dispatcher::new(EngineSettings::from_env(), languages);

    let result = dispatcher
        .evaluate(
            &source_code,
            Some(&language),
            &suite.test_cases,
            &function_name,
            options.timeout_ms,
        )
        .await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render_summary(&result));
    }

    Ok(result.all_passed())
}

/// List all configured languages
pub fn list_languages(config: Option<&Path>) -> Result<()> {
    let manager = LanguageConfigManager::load_or_builtin(config)?;
    let languages = manager.list_languages();

    println!("📋 Configured Languages:\n");
    println!("{:<12} {:<24} {:<16}", "Name", "Aliases", "Comparison");
    println!("{}", "─".repeat(52));

    for lang in &languages {
        println!(
            "{:<12} {:<24} {:<16}",
            lang.name,
            lang.aliases.join(", "),
            comparison_name(lang.comparison)
        );
    }

    println!("\n✅ Total: {} language(s)", languages.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_engine::CaseResult;

    #[test]
    fn test_infer_language() {
        assert_eq!(infer_language(Path::new("demos/two_sum.py")), "python");
        assert_eq!(infer_language(Path::new("solution.PY")), "python");
        assert_eq!(infer_language(Path::new("demos/two_sum.js")), "javascript");
        assert_eq!(infer_language(Path::new("solution")), "javascript");
    }

    #[test]
    fn test_tests_file_shapes() {
        let bare: TestSuite = serde_json::from_str::<TestsFile>(r#"[{"input": "1", "expected": "1"}]"#)
            .unwrap()
            .into();
        assert_eq!(bare.test_cases.len(), 1);
        assert!(bare.function_name.is_none());

        let suite: TestSuite = serde_json::from_str::<TestsFile>(
            r#"{"function_name": "twoSum", "test_cases": [{"input": "[2,7], 9", "expected": "[0,1]"}]}"#,
        )
        .unwrap()
        .into();
        assert_eq!(suite.function_name.as_deref(), Some("twoSum"));
        assert_eq!(suite.test_cases[0].expected, "[0,1]");
    }

    #[test]
    fn test_render_summary() {
        let result = RunResult::from_cases(vec![
            CaseResult {
                input: "2, 3".to_string(),
                expected: "5".to_string(),
                actual: "5".to_string(),
                pass: true,
                description: "Test 1".to_string(),
            },
            CaseResult {
                input: "2, 3".to_string(),
                expected: "6".to_string(),
                actual: "5".to_string(),
                pass: false,
                description: "Test 2".to_string(),
            },
        ]);

        let text = render_summary(&result);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "1/2 test cases passed");
        assert_eq!(lines[1], "✓ Test 1: Input(2, 3) → Expected(5) Got(5)");
        assert_eq!(lines[2], "✗ Test 2: Input(2, 3) → Expected(6) Got(5)");
    }

    #[test]
    fn test_render_summary_harness_error() {
        let result = RunResult::harness_failure(3, "SyntaxError: Unexpected token");
        assert_eq!(
            render_summary(&result),
            "0/3 test cases passed\nError: SyntaxError: Unexpected token"
        );
    }

    #[test]
    fn test_demo_suite_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/two_sum.tests.json");
        let suite = load_tests(&path).unwrap();
        assert_eq!(suite.function_name.as_deref(), Some("twoSum"));
        assert!(!suite.test_cases.is_empty());
    }
}
