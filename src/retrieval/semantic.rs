//! Default vector index adapter: local embeddings + HNSW over the corpus export

use crate::embedding::{BatchIndexer, BatchItem, BatchResult, EmbeddingProvider, HnswIndex};
use crate::retrieval::{corpus_topics, Chunk, RetrievalError, TopicFilter, VectorIndex};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Parameters used to build the HNSW graph and search it
#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub hnsw_ef_construction: usize,
    pub hnsw_m: usize,
    pub hnsw_ef_search: usize,
    pub batch_size: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            hnsw_ef_construction: 200,
            hnsw_m: 16,
            hnsw_ef_search: 64,
            batch_size: 32,
        }
    }
}

/// Semantic search over a fixed set of chunks.
///
/// Graph ids are positions in `chunks`; chunks whose embedding failed are
/// kept in the store but never appear in results.
pub struct SemanticIndex {
    provider: Arc<dyn EmbeddingProvider>,
    graph: HnswIndex,
    chunks: Vec<Chunk>,
    ef_search: usize,
}

impl SemanticIndex {
    /// Embed `chunks` and build the graph
    pub fn build(
        provider: Arc<dyn EmbeddingProvider>,
        chunks: Vec<Chunk>,
        settings: &IndexSettings,
    ) -> Result<(Self, BatchResult), RetrievalError> {
        let mut graph = HnswIndex::new(
            provider.dimension(),
            chunks.len(),
            settings.hnsw_ef_construction,
            settings.hnsw_m,
        )?;

        let items: Vec<BatchItem> = chunks
            .iter()
            .enumerate()
            .map(|(id, chunk)| BatchItem {
                id,
                text: chunk.text.clone(),
            })
            .collect();

        let result = BatchIndexer::new(Arc::clone(&provider), settings.batch_size)
            .index(items, &mut graph)
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;

        let index = Self {
            provider,
            graph,
            chunks,
            ef_search: settings.hnsw_ef_search.max(1),
        };

        Ok((index, result))
    }

    /// Number of searchable chunks
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Distinct subject tags present in the corpus, sorted
    pub fn topics(&self) -> BTreeSet<String> {
        corpus_topics(&self.chunks)
    }
}

#[async_trait]
impl VectorIndex for SemanticIndex {
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&TopicFilter>,
    ) -> Result<Vec<Chunk>, RetrievalError> {
        if self.graph.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let provider = Arc::clone(&self.provider);
        let text = query.to_string();
        let embedding = tokio::task::spawn_blocking(move || provider.embed_query(&text))
            .await
            .map_err(|e| RetrievalError::Worker(e.to_string()))??;

        // With a filter the whole graph is ranked so filtered-out neighbours
        // cannot starve the result.
        let filter = filter.filter(|f| !f.is_empty());
        let fetch = match filter {
            Some(_) => self.graph.len(),
            None => k,
        };

        let neighbors = self.graph.search(&embedding, fetch, self.ef_search)?;

        let chunks: Vec<Chunk> = neighbors
            .into_iter()
            .filter_map(|n| self.chunks.get(n.id))
            .filter(|chunk| filter.map_or(true, |f| f.allows(chunk.subject.as_deref())))
            .take(k)
            .cloned()
            .collect();

        tracing::debug!(
            "Semantic search returned {} of {} requested chunks",
            chunks.len(),
            k
        );

        Ok(chunks)
    }
}
