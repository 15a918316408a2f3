//! Retrieval: the vector index boundary consumed by the RAG pipeline.
//!
//! The pipeline only sees the [`VectorIndex`] trait. [`SemanticIndex`] is the
//! default adapter, combining a local embedding model with an HNSW graph over
//! a pre-chunked corpus export.

mod corpus;
mod semantic;

pub use corpus::{corpus_topics, load_chunks};
pub use semantic::{IndexSettings, SemanticIndex};

use crate::embedding::{EmbeddingError, HnswIndexError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector search failed: {0}")]
    Index(#[from] HnswIndexError),

    #[error("Retrieval worker failed: {0}")]
    Worker(String),

    #[error("Index unavailable: {0}")]
    Unavailable(String),
}

/// A retrievable span of source text with its citation metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text as produced by the indexer
    pub text: String,

    /// Source document identifier (usually the original file path)
    pub source: String,

    /// Page number inside the source document, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Subject tag assigned at indexing time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page: None,
            subject: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Set of subject tags a search is restricted to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicFilter(BTreeSet<String>);

impl TopicFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, topic: impl Into<String>) {
        self.0.insert(topic.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether a chunk carrying `subject` passes the filter.
    ///
    /// Chunks without a subject never pass a non-empty filter.
    pub fn allows(&self, subject: Option<&str>) -> bool {
        match subject {
            Some(subject) => self.0.contains(subject),
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TopicFilter {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Nearest-neighbour lookup over embedded chunks.
///
/// Results are ordered by decreasing similarity. Asking for more chunks than
/// the corpus holds returns what exists rather than an error. A non-empty
/// `filter` restricts results to chunks whose subject is in the set.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&TopicFilter>,
    ) -> Result<Vec<Chunk>, RetrievalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_filter_allows() {
        let filter: TopicFilter = ["teoria_da_mudanca", "stakeholders"].into_iter().collect();

        assert!(filter.allows(Some("stakeholders")));
        assert!(!filter.allows(Some("relatorios")));
        assert!(!filter.allows(None));
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn test_chunk_deserializes_without_optional_fields() {
        let chunk: Chunk =
            serde_json::from_str(r#"{"text": "A", "source": "doc1.txt"}"#).unwrap();

        assert_eq!(chunk, Chunk::new("A", "doc1.txt"));
    }

    #[test]
    fn test_chunk_builder() {
        let chunk = Chunk::new("A", "doc1").with_page(2).with_subject("metricas");
        assert_eq!(chunk.page, Some(2));
        assert_eq!(chunk.subject.as_deref(), Some("metricas"));
    }
}
