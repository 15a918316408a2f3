//! Configuration management for iaris
//!
//! A single TOML file drives the corpus location, retrieval parameters,
//! prompt template, generation mode and model endpoints. Values can be
//! overridden per profile and through `IARIS_<SECTION>__<KEY>` variables.

use crate::error::{IarisError, Result};
use crate::llm::{LlmError, OpenAiSettings};
use crate::rag::{
    GenerationMode, PipelineSettings, PromptTemplate, DEFAULT_HISTORY_WINDOW, DEFAULT_RETRIEVER_K,
};
use crate::retrieval::{IndexSettings, TopicFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub corpus: CorpusConfig,
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Holds saved chat sessions
    pub data_dir: PathBuf,
}

/// Location of the pre-chunked corpus export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub chunks_file: PathBuf,
}

/// Retrieval and context settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub retriever_k: usize,
    /// Raw conversation turns included in the context
    pub history_window: usize,
    #[serde(default)]
    pub topic_filter: TopicFilter,
    pub hnsw_ef_search: usize,
}

/// Prompt template location; the built-in template is used when unset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub mode: GenerationMode,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub base_url: String,
    /// Environment variable holding the API key; empty for unauthenticated servers
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    pub vector_dim: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_m: usize,
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retriever_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_window: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_mode: Option<GenerationMode>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IarisError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| IarisError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| IarisError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| IarisError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| IarisError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(k) = overrides.retriever_k {
            self.retrieval.retriever_k = k;
        }
        if let Some(window) = overrides.history_window {
            self.retrieval.history_window = window;
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(mode) = overrides.generation_mode {
            self.generation.mode = mode;
        }

        tracing::debug!("Applied profile '{}'", profile);
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: IARIS_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    /// Apply `IARIS_`-prefixed overrides from any key/value source
    pub fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("IARIS_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "RETRIEVAL__RETRIEVER_K" => {
                self.retrieval.retriever_k = parse_number(path, value)?;
            }
            "RETRIEVAL__HISTORY_WINDOW" => {
                self.retrieval.history_window = parse_number(path, value)?;
            }
            "LLM__MODEL" => {
                self.llm.model = value.to_string();
            }
            "LLM__BASE_URL" => {
                self.llm.base_url = value.to_string();
            }
            "GENERATION__MODE" => {
                self.generation.mode =
                    value
                        .parse()
                        .map_err(|message| IarisError::InvalidConfigValue {
                            path: path.to_string(),
                            message,
                        })?;
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Read the configured prompt template, or the built-in one
    pub fn load_prompt_template(&self) -> Result<PromptTemplate> {
        let Some(file) = &self.prompt.template_file else {
            return Ok(PromptTemplate::default());
        };

        let path = expand_path(file);
        let text = std::fs::read_to_string(&path).map_err(|e| IarisError::Io {
            source: e,
            context: format!("Failed to read prompt template: {:?}", path),
        })?;

        Ok(PromptTemplate::new(text)?)
    }

    /// Pipeline-wide settings, including the loaded prompt template
    pub fn pipeline_settings(&self) -> Result<PipelineSettings> {
        let topic_filter = if self.retrieval.topic_filter.is_empty() {
            None
        } else {
            Some(self.retrieval.topic_filter.clone())
        };

        Ok(PipelineSettings {
            retriever_k: self.retrieval.retriever_k,
            history_window: self.retrieval.history_window,
            topic_filter,
            prompt_template: self.load_prompt_template()?,
            generation_mode: self.generation.mode,
        })
    }

    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            hnsw_ef_construction: self.indexing.hnsw_ef_construction,
            hnsw_m: self.indexing.hnsw_m,
            hnsw_ef_search: self.retrieval.hnsw_ef_search,
            batch_size: self.embedding.batch_size,
        }
    }

    /// Model client settings; reads the API key from the environment
    pub fn openai_settings(&self) -> std::result::Result<OpenAiSettings, LlmError> {
        Ok(OpenAiSettings {
            base_url: self.llm.base_url.clone(),
            model: self.llm.model.clone(),
            api_key: OpenAiSettings::api_key_from_env(&self.llm.api_key_env)?,
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
            timeout: Duration::from_secs(self.llm.timeout_secs),
        })
    }

    pub fn chunks_file(&self) -> PathBuf {
        expand_path(&self.corpus.chunks_file)
    }

    pub fn sessions_dir(&self) -> PathBuf {
        expand_path(&self.storage.data_dir).join("sessions")
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| IarisError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("iaris").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| IarisError::Config("Cannot determine home directory".to_string()))?;

        Ok(home_dir.join(".iaris"))
    }
}

fn parse_number(path: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| IarisError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}' as a number", value),
        })
}

/// Expand a leading `~` to the home directory
pub fn expand_path(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("~/.iaris");

        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: data_dir.clone(),
            },
            corpus: CorpusConfig {
                chunks_file: data_dir.join("corpus.jsonl"),
            },
            retrieval: RetrievalConfig {
                retriever_k: DEFAULT_RETRIEVER_K,
                history_window: DEFAULT_HISTORY_WINDOW,
                topic_filter: TopicFilter::new(),
                hnsw_ef_search: 64,
            },
            prompt: PromptConfig::default(),
            generation: GenerationConfig::default(),
            llm: LlmConfig {
                provider: "openai".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                model: "gpt-4o-mini".to_string(),
                temperature: 0.7,
                timeout_secs: 120,
                max_tokens: None,
            },
            embedding: EmbeddingConfig {
                model: "multilingual-e5-small".to_string(),
                batch_size: 32,
            },
            indexing: IndexingConfig {
                vector_dim: 384,
                hnsw_ef_construction: 200,
                hnsw_m: 16,
            },
            profiles: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.retrieval.topic_filter.insert("stakeholders");
        config.generation.mode = GenerationMode::Dual;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.generation.mode, GenerationMode::Dual);
        assert!(loaded.retrieval.topic_filter.allows(Some("stakeholders")));
        assert_eq!(loaded.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/nonexistent/iaris/config.toml"));
        assert!(matches!(result, Err(IarisError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_optional_sections_default() {
        let content = r#"
[_meta]
schema_version = "1.0.0"

[storage]
data_dir = "~/.iaris"

[corpus]
chunks_file = "~/.iaris/corpus.jsonl"

[retrieval]
retriever_k = 4
history_window = 6
hnsw_ef_search = 64

[llm]
provider = "openai"
base_url = "https://api.openai.com/v1"
api_key_env = "OPENAI_API_KEY"
model = "gpt-4o-mini"
temperature = 0.7
timeout_secs = 120

[embedding]
model = "multilingual-e5-small"
batch_size = 32

[indexing]
vector_dim = 384
hnsw_ef_construction = 200
hnsw_m = 16
"#;

        let config: Config = toml::from_str(content).unwrap();
        assert!(config.retrieval.topic_filter.is_empty());
        assert!(config.profiles.is_empty());
        assert_eq!(config.generation.mode, GenerationMode::SingleStream);
        assert!(config.prompt.template_file.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(vars(&[
            ("IARIS_RETRIEVAL__RETRIEVER_K", "7"),
            ("IARIS_LLM__MODEL", "gpt-4o"),
            ("IARIS_LLM__BASE_URL", "http://localhost:1234/v1"),
            ("IARIS_GENERATION__MODE", "dual"),
            ("UNRELATED", "x"),
        ]));

        assert_eq!(config.retrieval.retriever_k, 7);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.base_url, "http://localhost:1234/v1");
        assert_eq!(config.generation.mode, GenerationMode::Dual);
    }

    #[test]
    fn test_invalid_env_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(vars(&[
            ("IARIS_RETRIEVAL__RETRIEVER_K", "muitos"),
            ("IARIS_GENERATION__MODE", "both"),
        ]));

        assert_eq!(config.retrieval.retriever_k, 4);
        assert_eq!(config.generation.mode, GenerationMode::SingleStream);
    }

    #[test]
    fn test_apply_profile() {
        let mut config = Config::default();
        config.profiles.insert(
            "profundo".to_string(),
            ProfileOverrides {
                retriever_k: Some(10),
                llm_model: Some("gpt-4o".to_string()),
                ..Default::default()
            },
        );

        config.apply_profile("profundo").unwrap();
        assert_eq!(config.retrieval.retriever_k, 10);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.retrieval.history_window, 6);

        assert!(config.apply_profile("inexistente").is_err());
    }

    #[test]
    fn test_prompt_template_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "Pergunta: {{question}}\nDocumentos: {{context}}").unwrap();

        let mut config = Config::default();
        assert_eq!(config.load_prompt_template().unwrap(), PromptTemplate::default());

        config.prompt.template_file = Some(file.path().to_path_buf());
        let template = config.load_prompt_template().unwrap();
        assert_eq!(template.render("q", "c"), "Pergunta: q\nDocumentos: c");
    }

    #[test]
    fn test_invalid_prompt_template_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "Só a pergunta: {{question}}").unwrap();

        let mut config = Config::default();
        config.prompt.template_file = Some(file.path().to_path_buf());
        assert!(matches!(
            config.load_prompt_template(),
            Err(IarisError::Template(_))
        ));
    }

    #[test]
    fn test_pipeline_settings_empty_filter_is_none() {
        let config = Config::default();
        let settings = config.pipeline_settings().unwrap();
        assert!(settings.topic_filter.is_none());
        assert_eq!(settings.retriever_k, 4);
    }

    #[test]
    fn test_expand_path() {
        let plain = Path::new("/tmp/corpus.jsonl");
        assert_eq!(expand_path(plain), plain);

        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_path(Path::new("~/.iaris/corpus.jsonl")),
                home.join(".iaris/corpus.jsonl")
            );
        }
    }
}
