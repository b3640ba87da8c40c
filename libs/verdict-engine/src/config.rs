// Language configuration management for the Verdict engine
use crate::evaluator::ComparisonMode;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use verdict_common::types::Language;

pub const DEFAULT_CONFIG_PATH: &str = "config/languages.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub comparison: ComparisonMode,
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageConfig>,
}

/// Resolved language plus its settings
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLanguage {
    pub language: Language,
    pub config: LanguageConfig,
}

/// Language configuration manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: Vec<ResolvedLanguage>,
    /// lower-cased name or alias -> index into `configs`
    identifiers: HashMap<String, usize>,
    fallback: usize,
}

impl LanguageConfigManager {
    /// Built-in table used when no config file is available
    pub fn builtin() -> Self {
        let configs = vec![
            ResolvedLanguage {
                language: Language::JavaScript,
                config: LanguageConfig {
                    name: "javascript".to_string(),
                    aliases: vec!["js".to_string(), "node".to_string()],
                    comparison: ComparisonMode::Structural,
                },
            },
            ResolvedLanguage {
                language: Language::Python,
                config: LanguageConfig {
                    name: "python".to_string(),
                    aliases: vec!["py".to_string(), "python3".to_string()],
                    comparison: ComparisonMode::QuoteStripped,
                },
            },
        ];

        let mut identifiers = HashMap::new();
        for (index, resolved) in configs.iter().enumerate() {
            identifiers.insert(resolved.config.name.clone(), index);
            for alias in &resolved.config.aliases {
                identifiers.insert(alias.clone(), index);
            }
        }

        Self {
            configs,
            identifiers,
            fallback: 0,
        }
    }

    /// Load language configurations from languages.json
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Language config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::from_json(&content)
            .with_context(|| format!("Invalid language config {}", config_path.display()))
    }

    /// Load with default path (config/languages.json)
    pub fn load_default() -> Result<Self> {
        Self::load(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load `path` if given, else the default path, else the built-in table
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load_default(),
            None => Ok(Self::builtin()),
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let languages_json: LanguagesJson =
            serde_json::from_str(content).context("Failed to parse languages.json")?;
        Self::from_configs(languages_json.languages)
    }

    fn from_configs(languages: Vec<LanguageConfig>) -> Result<Self> {
        let mut configs = Vec::with_capacity(languages.len());
        let mut identifiers = HashMap::new();

        for config in languages {
            let language = config
                .name
                .parse::<Language>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Unknown language '{}' in languages.json", config.name))?;
            if configs.iter().any(|c: &ResolvedLanguage| c.language == language) {
                bail!("Language '{}' configured twice", config.name);
            }

            let index = configs.len();
            for id in std::iter::once(&config.name).chain(config.aliases.iter()) {
                let key = id.trim().to_lowercase();
                if let Some(previous) = identifiers.insert(key.clone(), index) {
                    if previous != index {
                        bail!("Identifier '{}' maps to more than one language", key);
                    }
                }
            }
            configs.push(ResolvedLanguage { language, config });
        }

        let fallback = configs
            .iter()
            .position(|c| c.language == Language::JavaScript)
            .context("languages.json must configure javascript")?;

        Ok(Self {
            configs,
            identifiers,
            fallback,
        })
    }

    /// Resolve an identifier case-insensitively. Absent or unknown
    /// identifiers resolve to JavaScript.
    pub fn resolve(&self, identifier: Option<&str>) -> &ResolvedLanguage {
        let index = identifier
            .map(|id| id.trim().to_lowercase())
            .and_then(|key| self.identifiers.get(&key).copied())
            .unwrap_or(self.fallback);
        &self.configs[index]
    }

    /// List all supported languages in configuration order
    pub fn list_languages(&self) -> Vec<&LanguageConfig> {
        self.configs.iter().map(|c| &c.config).collect()
    }
}

impl Default for LanguageConfigManager {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_resolution() {
        let manager = LanguageConfigManager::builtin();

        assert_eq!(manager.resolve(Some("PY")).language, Language::Python);
        assert_eq!(manager.resolve(Some("python")).language, Language::Python);
        assert_eq!(manager.resolve(Some(" Python3 ")).language, Language::Python);
        assert_eq!(manager.resolve(Some("node")).language, Language::JavaScript);
        assert_eq!(manager.resolve(Some("cobol")).language, Language::JavaScript);
        assert_eq!(manager.resolve(None).language, Language::JavaScript);
    }

    #[test]
    fn test_builtin_comparison_modes() {
        let manager = LanguageConfigManager::builtin();
        assert_eq!(manager.resolve(Some("js")).config.comparison, ComparisonMode::Structural);
        assert_eq!(manager.resolve(Some("py")).config.comparison, ComparisonMode::QuoteStripped);
        assert_eq!(manager.list_languages().len(), 2);
    }

    #[test]
    fn test_from_json_overrides_comparison() {
        let manager = LanguageConfigManager::from_json(
            r#"{"languages": [
                {"name": "javascript", "aliases": ["js"]},
                {"name": "python", "aliases": ["py"], "comparison": "structural"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(manager.resolve(Some("py")).config.comparison, ComparisonMode::Structural);
        assert_eq!(manager.resolve(Some("js")).config.comparison, ComparisonMode::Structural);
        // alias not configured here
        assert_eq!(manager.resolve(Some("python3")).language, Language::JavaScript);
        assert_eq!(manager.list_languages().len(), 2);
    }

    #[test]
    fn test_from_json_rejects_bad_tables() {
        assert!(LanguageConfigManager::from_json(r#"{"languages": [{"name": "cobol"}]}"#).is_err());
        assert!(LanguageConfigManager::from_json(r#"{"languages": [{"name": "python"}]}"#).is_err());
        assert!(LanguageConfigManager::from_json(
            r#"{"languages": [{"name": "javascript", "aliases": ["x"]}, {"name": "python", "aliases": ["x"]}]}"#
        )
        .is_err());
        assert!(LanguageConfigManager::from_json("not json").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = LanguageConfigManager::load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_load_repository_config() {
        // config/languages.json lives at the workspace root
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/languages.json");
        let manager = LanguageConfigManager::load(&path).unwrap();
        assert_eq!(manager.resolve(Some("py")).language, Language::Python);
        assert_eq!(manager.resolve(Some("py")).config.comparison, ComparisonMode::QuoteStripped);
    }
}
