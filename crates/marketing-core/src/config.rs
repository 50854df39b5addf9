use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{MarketingError, SecretValue, require_env};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "MARKETING_CONFIG";

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub orchestrator: OrchestratorConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Resolve both collaborator secrets (from environment only).
    pub fn credentials(&self) -> Result<Credentials, MarketingError> {
        Ok(Credentials {
            model: require_env(&self.llm.api_key_env)?,
            search: require_env(&self.search.api_key_env)?,
        })
    }
}

/// Secrets for the hosted model and search services.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub model: SecretValue,
    pub search: SecretValue,
}

/// Loads and validates configuration.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a provided path or discoverable defaults.
    ///
    /// Resolution order:
    /// 1. Explicit `path` argument.
    /// 2. `MARKETING_CONFIG` environment variable.
    /// 3. `config.toml` in the current working directory.
    ///
    /// Only the fallback file may be absent; built-in defaults apply then.
    pub fn load(path: Option<PathBuf>) -> Result<Config, MarketingError> {
        let config = match resolve_path(path) {
            Resolved::Required(candidate) => Self::read(&candidate)?,
            Resolved::Fallback(candidate) if candidate.exists() => Self::read(&candidate)?,
            Resolved::Fallback(_) => Config::default(),
        };

        Self::validate(&config)?;
        Ok(config)
    }

    /// Parse a configuration document without touching the environment.
    pub fn parse(raw: &str) -> Result<Config, MarketingError> {
        toml::from_str(raw).map_err(|err| MarketingError::InvalidConfiguration(err.to_string()))
    }

    fn read(path: &Path) -> Result<Config, MarketingError> {
        let raw = fs::read_to_string(path)
            .map_err(|err| MarketingError::config_io(path.to_path_buf(), err))?;
        Self::parse(&raw)
    }

    fn validate(config: &Config) -> Result<(), MarketingError> {
        if config.llm.api_key_env.trim().is_empty() {
            return Err(MarketingError::InvalidConfiguration(
                "llm.api_key_env must reference an environment variable".into(),
            ));
        }
        if config.search.api_key_env.trim().is_empty() {
            return Err(MarketingError::InvalidConfiguration(
                "search.api_key_env must reference an environment variable".into(),
            ));
        }
        if config.search.num_results == 0 {
            return Err(MarketingError::InvalidConfiguration(
                "search.num_results must be at least 1".into(),
            ));
        }

        // Both secrets must exist at load time; a missing key is fatal at startup.
        config.credentials()?;
        Ok(())
    }
}

enum Resolved {
    Required(PathBuf),
    Fallback(PathBuf),
}

fn resolve_path(path: Option<PathBuf>) -> Resolved {
    if let Some(path) = path {
        return Resolved::Required(path);
    }

    if let Ok(from_env) = env::var(CONFIG_PATH_ENV) {
        if !from_env.trim().is_empty() {
            return Resolved::Required(PathBuf::from(from_env));
        }
    }

    Resolved::Fallback(Path::new(DEFAULT_CONFIG_PATH).to_path_buf())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub api_base: String,
    pub api_key_env: String,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_ms: 60_000,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key_env: String,
    pub num_results: usize,
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://google.serper.dev/search".to_string(),
            api_key_env: "SERPER_API_KEY".to_string(),
            num_results: 5,
            timeout_ms: 15_000,
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// How an agent obtains the outputs of the agents it may read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// Wait for every selected dependency to complete before starting.
    #[default]
    AwaitDependencies,
    /// Read whatever is already recorded when the agent starts.
    Snapshot,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub context_mode: ContextMode,
    pub timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            context_mode: ContextMode::AwaitDependencies,
            timeout_ms: 300_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ConfigLoader::parse("").unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.search.num_results, 5);
        assert_eq!(
            config.orchestrator.context_mode,
            ContextMode::AwaitDependencies
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parses_partial_sections() {
        let config = ConfigLoader::parse(
            r#"
            [search]
            num_results = 3

            [orchestrator]
            context_mode = "snapshot"
            "#,
        )
        .unwrap();
        assert_eq!(config.search.num_results, 3);
        assert_eq!(config.search.api_key_env, "SERPER_API_KEY");
        assert_eq!(config.orchestrator.context_mode, ContextMode::Snapshot);
        assert_eq!(config.orchestrator.timeout_ms, 300_000);
    }

    #[test]
    fn load_requires_both_credentials() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[llm]\napi_key_env = \"MARKETING_CFG_TEST_MODEL\"\n[search]\napi_key_env = \"MARKETING_CFG_TEST_SEARCH\""
        )
        .unwrap();

        unsafe {
            std::env::set_var("MARKETING_CFG_TEST_MODEL", "model-key");
            std::env::remove_var("MARKETING_CFG_TEST_SEARCH");
        }
        let err = ConfigLoader::load(Some(file.path().to_path_buf())).unwrap_err();
        assert!(
            matches!(err, MarketingError::MissingSecret(ref var) if var == "MARKETING_CFG_TEST_SEARCH")
        );

        unsafe {
            std::env::set_var("MARKETING_CFG_TEST_SEARCH", "search-key");
        }
        let config = ConfigLoader::load(Some(file.path().to_path_buf())).unwrap();
        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.model.expose(), "model-key");
        assert_eq!(credentials.search.expose(), "search-key");
    }

    #[test]
    fn explicit_path_must_exist() {
        let err = ConfigLoader::load(Some(PathBuf::from("/nonexistent/marketing.toml")))
            .unwrap_err();
        assert!(matches!(err, MarketingError::ConfigIo { .. }));
    }

    #[test]
    fn example_file_matches_defaults() {
        let config = ConfigLoader::parse(include_str!("../../../config.example.toml")).unwrap();
        let defaults = Config::default();
        assert_eq!(config.llm.model, defaults.llm.model);
        assert_eq!(config.search.endpoint, defaults.search.endpoint);
        assert_eq!(config.orchestrator.timeout_ms, defaults.orchestrator.timeout_ms);
    }

    #[test]
    fn rejects_zero_results() {
        let mut config = Config::default();
        config.search.num_results = 0;
        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, MarketingError::InvalidConfiguration(_)));
    }
}
