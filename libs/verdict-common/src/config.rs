// Engine settings shared by the API, CLI and engine
// Defaults mirror the interactive-practice budgets; every field can be
// overridden from the environment.

use std::env;
use std::time::Duration;

pub const DEFAULT_SCRIPT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_RUNTIME_LOAD_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_MAX_CONCURRENT_ISOLATES: usize = 8;
pub const DEFAULT_ISOLATE_HEAP_MB: usize = 256;
pub const DEFAULT_FUNCTION_NAME: &str = "solution";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Wall-clock budget for one isolated script run
    pub script_timeout_ms: u64,
    /// Budget for locating and starting the secondary interpreter
    pub runtime_load_timeout_ms: u64,
    pub max_concurrent_isolates: usize,
    /// V8 heap ceiling per isolate
    pub isolate_heap_mb: usize,
    /// Interpreter executables tried in order on first use
    pub python_candidates: Vec<String>,
    pub default_function_name: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            script_timeout_ms: DEFAULT_SCRIPT_TIMEOUT_MS,
            runtime_load_timeout_ms: DEFAULT_RUNTIME_LOAD_TIMEOUT_MS,
            max_concurrent_isolates: DEFAULT_MAX_CONCURRENT_ISOLATES,
            isolate_heap_mb: DEFAULT_ISOLATE_HEAP_MB,
            python_candidates: vec!["python3".to_string(), "python".to_string()],
            default_function_name: DEFAULT_FUNCTION_NAME.to_string(),
        }
    }
}

impl EngineSettings {
    /// Defaults overridden by `VERDICT_*` environment variables.
    /// Unparseable or zero values are ignored rather than rejected.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(ms) = lookup("VERDICT_SCRIPT_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            settings.script_timeout_ms = ms;
        }
        if let Some(ms) = lookup("VERDICT_RUNTIME_LOAD_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            settings.runtime_load_timeout_ms = ms;
        }
        if let Some(n) = lookup("VERDICT_MAX_CONCURRENT_ISOLATES")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            settings.max_concurrent_isolates = n;
        }
        if let Some(mb) = lookup("VERDICT_ISOLATE_HEAP_MB")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|mb| *mb > 0)
        {
            settings.isolate_heap_mb = mb;
        }
        if let Some(raw) = lookup("VERDICT_PYTHON") {
            let candidates: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !candidates.is_empty() {
                settings.python_candidates = candidates;
            }
        }
        if let Some(name) = lookup("VERDICT_DEFAULT_FUNCTION").filter(|v| !v.trim().is_empty()) {
            settings.default_function_name = name.trim().to_string();
        }

        settings
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }

    pub fn runtime_load_timeout(&self) -> Duration {
        Duration::from_millis(self.runtime_load_timeout_ms)
    }

    /// Heap ceiling in bytes, saturating at `usize::MAX`
    pub fn isolate_heap_bytes(&self) -> usize {
        self.isolate_heap_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::from_lookup(|_| None);
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.script_timeout(), Duration::from_secs(10));
        assert_eq!(settings.runtime_load_timeout(), Duration::from_secs(15));
        assert_eq!(settings.default_function_name, "solution");
    }

    #[test]
    fn test_env_overrides() {
        let settings = EngineSettings::from_lookup(lookup_from(&[
            ("VERDICT_SCRIPT_TIMEOUT_MS", "2500"),
            ("VERDICT_RUNTIME_LOAD_TIMEOUT_MS", " 40000 "),
            ("VERDICT_MAX_CONCURRENT_ISOLATES", "2"),
            ("VERDICT_ISOLATE_HEAP_MB", "64"),
            ("VERDICT_PYTHON", "/opt/py/bin/python3, python3"),
            ("VERDICT_DEFAULT_FUNCTION", "main"),
        ]));

        assert_eq!(settings.script_timeout_ms, 2500);
        assert_eq!(settings.runtime_load_timeout_ms, 40000);
        assert_eq!(settings.max_concurrent_isolates, 2);
        assert_eq!(settings.isolate_heap_bytes(), 64 * 1024 * 1024);
        assert_eq!(settings.python_candidates, vec!["/opt/py/bin/python3", "python3"]);
        assert_eq!(settings.default_function_name, "main");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let settings = EngineSettings::from_lookup(lookup_from(&[
            ("VERDICT_SCRIPT_TIMEOUT_MS", "soon"),
            ("VERDICT_MAX_CONCURRENT_ISOLATES", "0"),
            ("VERDICT_PYTHON", " , "),
        ]));

        assert_eq!(settings.script_timeout_ms, DEFAULT_SCRIPT_TIMEOUT_MS);
        assert_eq!(settings.max_concurrent_isolates, DEFAULT_MAX_CONCURRENT_ISOLATES);
        assert_eq!(settings.python_candidates, vec!["python3", "python"]);
    }

    #[test]
    fn test_zero_values_fall_back() {
        let settings = EngineSettings::from_lookup(lookup_from(&[
            ("VERDICT_SCRIPT_TIMEOUT_MS", "0"),
            ("VERDICT_RUNTIME_LOAD_TIMEOUT_MS", "0"),
            ("VERDICT_ISOLATE_HEAP_MB", "0"),
        ]));

        assert_eq!(settings.script_timeout_ms, DEFAULT_SCRIPT_TIMEOUT_MS);
        assert_eq!(settings.runtime_load_timeout_ms, DEFAULT_RUNTIME_LOAD_TIMEOUT_MS);
        assert_eq!(settings.isolate_heap_mb, DEFAULT_ISOLATE_HEAP_MB);
    }

    #[test]
    fn test_huge_heap_saturates() {
        let huge = usize::MAX.to_string();
        let settings = EngineSettings::from_lookup(lookup_from(&[("VERDICT_ISOLATE_HEAP_MB", huge.as_str())]));

        assert_eq!(settings.isolate_heap_mb, usize::MAX);
        assert_eq!(settings.isolate_heap_bytes(), usize::MAX);
    }
}
