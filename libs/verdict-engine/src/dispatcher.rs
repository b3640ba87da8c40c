/// Language Dispatcher - Single Entry Point for Evaluations
///
/// **Core Responsibility:**
/// Resolve the language identifier, pick the executor, and return its
/// `RunResult`. Every failure has already been turned into result data by
/// the executors, so this layer never returns an error.
///
/// **Routing:**
/// - javascript / js / node (and anything unknown or absent) → isolated script executor
/// - python / py / python3 → secondary runtime executor
use crate::config::LanguageConfigManager;
use crate::interpreter::RuntimeExecutor;
use crate::isolate::ScriptExecutor;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use verdict_common::config::EngineSettings;
use verdict_common::types::{ExecutionRequest, Language, RunResult, TestCase};

pub struct Dispatcher {
    settings: EngineSettings,
    languages: LanguageConfigManager,
    script: ScriptExecutor,
    runtime: Arc<RuntimeExecutor>,
}

static SHARED: OnceLock<Dispatcher> = OnceLock::new();

impl Dispatcher {
    pub fn new(settings: EngineSettings, languages: LanguageConfigManager) -> Self {
        let runtime = Arc::new(RuntimeExecutor::new(&settings));
        Self::with_runtime(settings, languages, runtime)
    }

    /// Build around an existing secondary executor
    pub fn with_runtime(
        settings: EngineSettings,
        languages: LanguageConfigManager,
        runtime: Arc<RuntimeExecutor>,
    ) -> Self {
        Self {
            script: ScriptExecutor::new(&settings),
            settings,
            languages,
            runtime,
        }
    }

    /// Process-wide dispatcher: settings from the environment, languages from
    /// `config/languages.json` when present, else the built-in table
    pub fn shared() -> &'static Dispatcher {
        SHARED.get_or_init(|| {
            let languages = match LanguageConfigManager::load_or_builtin(None) {
                Ok(languages) => languages,
                Err(e) => {
                    warn!(error = %format!("{:#}", e), "Falling back to built-in language table");
                    LanguageConfigManager::builtin()
                }
            };
            Dispatcher::new(EngineSettings::from_env(), languages)
        })
    }

    pub fn languages(&self) -> &LanguageConfigManager {
        &self.languages
    }

    pub fn runtime(&self) -> &Arc<RuntimeExecutor> {
        &self.runtime
    }

    /// Evaluate `source_code` against `test_cases`.
    ///
    /// For JavaScript `timeout_ms` bounds the whole run; for Python it bounds
    /// interpreter provisioning only.
    pub async fn evaluate(
        &self,
        source_code: &str,
        language: Option<&str>,
        test_cases: &[TestCase],
        function_name: &str,
        timeout_ms: Option<u64>,
    ) -> RunResult {
        let resolved = self.languages.resolve(language);
        let function_name = if function_name.trim().is_empty() {
            self.settings.default_function_name.as_str()
        } else {
            function_name.trim()
        };
        let mode = resolved.config.comparison;
        let start = Instant::now();

        let result = match resolved.language {
            Language::JavaScript => {
                let timeout = timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| self.settings.script_timeout());
                self.script
                    .run(source_code, function_name, test_cases, timeout, mode)
                    .await
            }
            Language::Python => {
                self.runtime
                    .run(
                        source_code,
                        function_name,
                        test_cases,
                        timeout_ms.map(Duration::from_millis),
                        mode,
                    )
                    .await
            }
        };

        info!(
            language = %resolved.language,
            passed = result.passed,
            total = result.total,
            error = result.error.is_some(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Evaluation finished"
        );

        result
    }

    pub async fn run(&self, request: &ExecutionRequest) -> RunResult {
        info!(request_id = %request.id, cases = request.test_cases.len(), "Running request");
        self.evaluate(
            &request.source_code,
            request.language.as_deref(),
            &request.test_cases,
            &request.function_name,
            request.timeout_ms,
        )
        .await
    }
}
