mod batch;
mod hnsw_index;
/// Embedding & indexing
///
/// - EmbeddingProvider trait for abstraction over embedding backends
/// - FastEmbedProvider for local embedding (multilingual-e5-small, 384-dim)
/// - HnswIndex for approximate nearest-neighbour search
/// - BatchIndexer for embedding a corpus export in batches
mod provider;

pub use batch::{BatchIndexer, BatchItem, BatchResult};
pub use hnsw_index::{HnswIndex, HnswIndexError, Neighbor};
pub use provider::{
    model_dimension, supported_model_names, EmbeddingError, EmbeddingProvider, FastEmbedProvider,
};
