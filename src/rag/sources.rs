use crate::retrieval::Chunk;

/// Turns retrieved chunks into citation strings, one per chunk and in the
/// same order. Repeated sources are not merged.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceCollector;

impl SourceCollector {
    pub fn collect(&self, chunks: &[Chunk]) -> Vec<String> {
        chunks
            .iter()
            .map(|chunk| match chunk.page {
                Some(page) => format!("{}\n\nPage {}", chunk.source, page),
                None => chunk.source.clone(),
            })
            .collect()
    }
}
