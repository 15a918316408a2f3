/// Batch embedding of corpus passages into the HNSW graph
use super::{EmbeddingProvider, HnswIndex};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Item to be embedded (graph id with its passage text)
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub id: usize,
    pub text: String,
}

/// Result of batch indexing
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub processed: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

/// Embeds passages in fixed-size batches and inserts them into an index.
///
/// A failed batch is logged and counted, and indexing continues with the
/// next one, so one bad passage does not take the whole corpus down.
pub struct BatchIndexer {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl BatchIndexer {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed `items` and insert them into `index`
    pub fn index(&self, items: Vec<BatchItem>, index: &mut HnswIndex) -> Result<BatchResult> {
        let start = std::time::Instant::now();
        let total = items.len();

        info!("Indexing {} passages in batches of {}", total, self.batch_size);

        let (items, empty): (Vec<BatchItem>, Vec<BatchItem>) =
            items.into_iter().partition(|item| !item.text.trim().is_empty());

        if !empty.is_empty() {
            warn!("Skipping {} passages with empty text", empty.len());
        }

        let mut processed = 0;
        let mut failed = empty.len();

        for batch in items.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|item| item.text.clone()).collect();

            let embeddings = match self.provider.embed_passages(&texts) {
                Ok(embeddings) => embeddings,
                Err(e) => {
                    warn!("Failed to embed batch of {}: {}", batch.len(), e);
                    failed += batch.len();
                    continue;
                }
            };

            for (item, embedding) in batch.iter().zip(embeddings.iter()) {
                match index.insert(item.id, embedding) {
                    Ok(()) => processed += 1,
                    Err(e) => {
                        warn!("Failed to insert passage {}: {}", item.id, e);
                        failed += 1;
                    }
                }
            }

            debug!("Indexed batch of {} passages", batch.len());
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Indexing complete: {} processed, {} failed, {}ms",
            processed, failed, duration_ms
        );

        Ok(BatchResult {
            processed,
            failed,
            duration_ms,
        })
    }
}
