//! Language model boundary.
//!
//! The pipeline talks to the model only through [`LanguageModelClient`].
//! [`OpenAiClient`] is the default adapter for OpenAI-compatible
//! `/chat/completions` endpoints.

mod openai;
mod sse;

pub use openai::{OpenAiClient, OpenAiSettings};

use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Transport(err.to_string())
    }
}

/// Lazy, finite sequence of generated text fragments
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Text generation service used by the answer generator.
///
/// Implementations are shared across invocations and must not keep
/// per-request state.
#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    /// Generate the complete answer for `prompt`
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Start a streaming generation for `prompt`.
    ///
    /// Errors opening the stream are returned here; errors while reading it
    /// arrive as stream items. Dropping the stream releases the underlying
    /// connection.
    async fn stream(&self, prompt: &str) -> Result<TokenStream, LlmError>;
}
