/// Embedding provider trait and FastEmbed implementation
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitializationError(String),

    #[error("Embedding generation failed: {0}")]
    GenerationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for embedding providers
///
/// Queries and passages are embedded through separate entry points because
/// some models (the E5 family) expect different input prefixes for each.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a search query
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed corpus passages, one vector per input in the same order
    fn embed_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

struct ModelSpec {
    name: &'static str,
    model: EmbeddingModel,
    dimension: usize,
    size_mb: usize,
    query_prefix: &'static str,
    passage_prefix: &'static str,
}

fn supported_models() -> [ModelSpec; 4] {
    [
        ModelSpec {
            name: "multilingual-e5-small",
            model: EmbeddingModel::MultilingualE5Small,
            dimension: 384,
            size_mb: 470,
            query_prefix: "query: ",
            passage_prefix: "passage: ",
        },
        ModelSpec {
            name: "all-MiniLM-L6-v2",
            model: EmbeddingModel::AllMiniLML6V2,
            dimension: 384,
            size_mb: 90,
            query_prefix: "",
            passage_prefix: "",
        },
        ModelSpec {
            name: "bge-small-en-v1.5",
            model: EmbeddingModel::BGESmallENV15,
            dimension: 384,
            size_mb: 130,
            query_prefix: "",
            passage_prefix: "",
        },
        ModelSpec {
            name: "bge-base-en-v1.5",
            model: EmbeddingModel::BGEBaseENV15,
            dimension: 768,
            size_mb: 440,
            query_prefix: "",
            passage_prefix: "",
        },
    ]
}

/// Names accepted by [`FastEmbedProvider::new`]
pub fn supported_model_names() -> Vec<&'static str> {
    supported_models().iter().map(|spec| spec.name).collect()
}

/// Output dimension of a supported model, if the name is known
pub fn model_dimension(model_name: &str) -> Option<usize> {
    supported_models()
        .into_iter()
        .find(|spec| spec.name.eq_ignore_ascii_case(model_name))
        .map(|spec| spec.dimension)
}

/// FastEmbed provider for local embedding generation
///
/// Models are downloaded on first use to the fastembed cache directory.
/// The corpus is mostly Portuguese, so the default is `multilingual-e5-small`.
pub struct FastEmbedProvider {
    model: Arc<TextEmbedding>,
    model_name: String,
    dimension: usize,
    query_prefix: &'static str,
    passage_prefix: &'static str,
}

impl FastEmbedProvider {
    pub const DEFAULT_MODEL: &'static str = "multilingual-e5-small";

    /// Create a new FastEmbed provider with the specified model
    pub fn new(model_name: &str) -> Result<Self, EmbeddingError> {
        let spec = supported_models()
            .into_iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(model_name))
            .ok_or_else(|| {
                EmbeddingError::InitializationError(format!(
                    "Unsupported model: {}. Supported: {}",
                    model_name,
                    supported_model_names().join(", ")
                ))
            })?;

        tracing::info!(
            "Initializing embedding model: {} ({}D, ~{}MB download if not cached)",
            spec.name,
            spec.dimension,
            spec.size_mb
        );

        let init_options = InitOptions::new(spec.model).with_show_download_progress(true);

        let model = TextEmbedding::try_new(init_options)
            .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: spec.name.to_string(),
            dimension: spec.dimension,
            query_prefix: spec.query_prefix,
            passage_prefix: spec.passage_prefix,
        })
    }

    /// Create provider with the default model
    pub fn with_default_model() -> Result<Self, EmbeddingError> {
        Self::new(Self::DEFAULT_MODEL)
    }

    fn embed_prefixed(
        &self,
        prefix: &str,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let inputs: Vec<String> = texts.iter().map(|t| format!("{prefix}{t}")).collect();

        let embeddings = self
            .model
            .embed(inputs, None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::GenerationError(format!(
                "Embedding count mismatch: expected {}, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_prefixed(self.query_prefix, &[text.to_string()])?
            .pop()
            .ok_or_else(|| EmbeddingError::GenerationError("No embeddings generated".to_string()))
    }

    fn embed_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_prefixed(self.passage_prefix, texts)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
