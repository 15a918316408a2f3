use crate::config::Config;
use crate::embedding::model_dimension;
use crate::error::{IarisError, Result, ValidationError};

/// Providers served by the OpenAI-compatible client
const VALID_PROVIDERS: [&str; 3] = ["openai", "ollama", "lmstudio"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_paths(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_indexing(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(IarisError::ConfigValidation { errors })
        }
    }

    /// Check that the API key variable is set.
    ///
    /// Kept out of [`validate`](Self::validate) so commands that never call
    /// the model work without a key.
    pub fn validate_credentials(config: &Config) -> Result<()> {
        let env_var = &config.llm.api_key_env;
        if env_var.is_empty() {
            return Ok(());
        }

        let message = match std::env::var(env_var) {
            Ok(key) if !key.is_empty() => return Ok(()),
            Ok(_) => format!("Environment variable {} is empty", env_var),
            Err(_) => format!("Environment variable {} is not set", env_var),
        };

        Err(IarisError::ConfigValidation {
            errors: vec![ValidationError::new("llm.api_key_env", message)],
        })
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_paths(config: &Config, errors: &mut Vec<ValidationError>) {
        // Existence is checked when the files are opened; `~` is expanded there
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }

        if config.corpus.chunks_file.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "corpus.chunks_file",
                "Corpus file path cannot be empty",
            ));
        }

        if let Some(file) = &config.prompt.template_file {
            if file.as_os_str().is_empty() {
                errors.push(ValidationError::new(
                    "prompt.template_file",
                    "Template file path cannot be empty when set",
                ));
            }
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.retriever_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.retriever_k",
                "retriever_k must be at least 1",
            ));
        }

        if config.retrieval.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "retrieval.hnsw_ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }

        if config.retrieval.topic_filter.iter().any(|t| t.trim().is_empty()) {
            errors.push(ValidationError::new(
                "retrieval.topic_filter",
                "Topic names cannot be empty",
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.llm.provider;
        if !VALID_PROVIDERS.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "llm.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    VALID_PROVIDERS, provider
                ),
            ));
        }

        let url = &config.llm.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::new(
                "llm.base_url",
                format!("Base URL must start with http:// or https://, got '{}'", url),
            ));
        }

        if config.llm.model.trim().is_empty() {
            errors.push(ValidationError::new("llm.model", "Model name cannot be empty"));
        }

        let temp = config.llm.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        if config.llm.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "llm.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }

        if config.llm.max_tokens == Some(0) {
            errors.push(ValidationError::new(
                "llm.max_tokens",
                "max_tokens must be greater than 0 when set",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        match model_dimension(&config.embedding.model) {
            None => errors.push(ValidationError::new(
                "embedding.model",
                format!("Unsupported embedding model: '{}'", config.embedding.model),
            )),
            Some(dim) if dim != config.indexing.vector_dim => {
                errors.push(ValidationError::new(
                    "indexing.vector_dim",
                    format!(
                        "Model '{}' produces {} dimensions, vector_dim is {}",
                        config.embedding.model, dim, config.indexing.vector_dim
                    ),
                ))
            }
            Some(_) => {}
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.indexing.vector_dim == 0 {
            errors.push(ValidationError::new(
                "indexing.vector_dim",
                "Vector dimension must be greater than 0",
            ));
        }

        if config.indexing.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if config.indexing.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }
    }
}
