//! Retrieval-augmented answering.
//!
//! One invocation runs four stages in order:
//!
//! 1. retrieval through a [`VectorIndex`](crate::retrieval::VectorIndex)
//! 2. context assembly ([`ContextAssembler`])
//! 3. generation through a [`LanguageModelClient`](crate::llm::LanguageModelClient)
//!    ([`AnswerGenerator`])
//! 4. source collection ([`SourceCollector`])
//!
//! [`RagPipeline`] wires them together and returns a [`RagResponse`].

mod context;
mod generator;
mod pipeline;
mod sources;
mod template;

pub use context::{ContextAssembler, DEFAULT_HISTORY_WINDOW};
pub use generator::{AnswerGenerator, AnswerStream};
pub use pipeline::{PipelineSettings, RagPipeline};
pub use sources::SourceCollector;
pub use template::{PromptTemplate, TemplateError, DEFAULT_TEMPLATE};

use crate::llm::LlmError;
use crate::retrieval::{RetrievalError, TopicFilter};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default number of chunks retrieved per query
pub const DEFAULT_RETRIEVER_K: usize = 4;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Generation failed: {0}")]
    Generation(#[from] LlmError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

/// One message of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// How the generator obtains the complete answer and the stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// One streaming call; the text is the concatenation of the fragments and
    /// the stream replays them
    #[default]
    SingleStream,
    /// A complete call followed by a separate streaming call with the same
    /// prompt. The two outputs can differ unless the model is deterministic.
    Dual,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMode::SingleStream => write!(f, "single_stream"),
            GenerationMode::Dual => write!(f, "dual"),
        }
    }
}

impl std::str::FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_stream" => Ok(GenerationMode::SingleStream),
            "dual" => Ok(GenerationMode::Dual),
            other => Err(format!(
                "unknown generation mode '{}', expected 'single_stream' or 'dual'",
                other
            )),
        }
    }
}

/// Inputs of a single pipeline invocation.
///
/// The history is borrowed; the pipeline never appends to it.
#[derive(Debug, Clone)]
pub struct QueryRequest<'h> {
    pub query: String,
    pub retriever_k: usize,
    pub topic_filter: Option<TopicFilter>,
    pub prompt_template: PromptTemplate,
    pub history: &'h [ConversationTurn],
    pub history_window: usize,
}

impl<'h> QueryRequest<'h> {
    /// Request with default k, history window and template
    pub fn new(query: impl Into<String>, history: &'h [ConversationTurn]) -> Self {
        Self {
            query: query.into(),
            retriever_k: DEFAULT_RETRIEVER_K,
            topic_filter: None,
            prompt_template: PromptTemplate::default(),
            history,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_retriever_k(mut self, k: usize) -> Self {
        self.retriever_k = k;
        self
    }

    pub fn with_topic_filter(mut self, filter: TopicFilter) -> Self {
        self.topic_filter = Some(filter);
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.prompt_template = template;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }
}

/// Result of a successful invocation.
///
/// `sources` has one entry per retrieved chunk, in retrieval order.
#[derive(Debug)]
pub struct RagResponse {
    pub query: String,
    pub answer_text: String,
    pub answer_stream: AnswerStream,
    pub sources: Vec<String>,
}
