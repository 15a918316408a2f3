//! Retrieval integration: corpus export → batch embedding → HNSW → filtered search
//!
//! Uses a keyword-count embedder so the tests run without downloading a model.

use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use iaris::embedding::{EmbeddingError, EmbeddingProvider};
use iaris::retrieval::{load_chunks, IndexSettings, SemanticIndex, TopicFilter, VectorIndex};

const VOCABULARY: [&str; 4] = ["impacto", "stakeholders", "relatorio", "mudanca"];

/// One dimension per vocabulary word plus a small constant so no vector is zero
struct KeywordEmbedder;

impl KeywordEmbedder {
    fn embed(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        VOCABULARY
            .iter()
            .map(|word| lower.matches(word).count() as f32 + 0.1)
            .collect()
    }
}

impl EmbeddingProvider for KeywordEmbedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(Self::embed(text))
    }

    fn embed_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| Self::embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }

    fn model_name(&self) -> &str {
        "keyword-count"
    }
}

fn write_corpus() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let lines = [
        r#"{"text": "Mapeamento de stakeholders e engajamento de stakeholders", "source": "data/stakeholders/guia.pdf", "page": 4, "subject": "stakeholders"}"#,
        r#"{"text": "Como escrever o relatorio de sustentabilidade", "source": "data/relatorios/gri.pdf", "page": 12, "subject": "relatorios"}"#,
        r#"{"text": "Teoria da mudanca aplicada a negocios de impacto", "source": "data/teoria/tm.pdf", "page": 1, "subject": "teoria_da_mudanca"}"#,
        r#"{"text": "Indicadores de impacto e relatorio para stakeholders", "source": "data/relatorios/indicadores.pdf", "subject": "relatorios"}"#,
        r#"{"text": "Anotacoes gerais sobre impacto", "source": "data/notas.txt"}"#,
    ];
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

fn build_index() -> SemanticIndex {
    let corpus = write_corpus();
    let chunks = load_chunks(corpus.path()).unwrap();

    let (index, result) =
        SemanticIndex::build(Arc::new(KeywordEmbedder), chunks, &IndexSettings::default())
            .unwrap();

    assert_eq!(result.processed, 5);
    assert_eq!(result.failed, 0);
    index
}

#[tokio::test]
async fn test_search_orders_by_similarity() {
    let index = build_index();

    let chunks = index.search("stakeholders", 2, None).await.unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].source, "data/stakeholders/guia.pdf");
    assert_eq!(chunks[0].page, Some(4));
}

#[tokio::test]
async fn test_k_larger_than_corpus_returns_everything() {
    let index = build_index();

    let chunks = index.search("impacto", 50, None).await.unwrap();
    assert_eq!(chunks.len(), 5);
}

#[tokio::test]
async fn test_topic_filter_restricts_subjects() {
    let index = build_index();
    let filter: TopicFilter = ["relatorios"].into_iter().collect();

    let chunks = index.search("stakeholders", 4, Some(&filter)).await.unwrap();

    assert_eq!(chunks.len(), 2);
    assert!(chunks
        .iter()
        .all(|c| c.subject.as_deref() == Some("relatorios")));
    // the stakeholder-heavy passage ranks first among the allowed ones
    assert_eq!(chunks[0].source, "data/relatorios/indicadores.pdf");
}

#[tokio::test]
async fn test_empty_filter_means_no_filter() {
    let index = build_index();

    let chunks = index
        .search("impacto", 5, Some(&TopicFilter::new()))
        .await
        .unwrap();
    assert_eq!(chunks.len(), 5);
}

#[tokio::test]
async fn test_filter_without_matches() {
    let index = build_index();
    let filter: TopicFilter = ["inexistente"].into_iter().collect();

    let chunks = index.search("impacto", 3, Some(&filter)).await.unwrap();
    assert!(chunks.is_empty());
}

#[test]
fn test_topics_listing() {
    let index = build_index();

    let topics: Vec<String> = index.topics().into_iter().collect();
    assert_eq!(
        topics,
        vec!["relatorios", "stakeholders", "teoria_da_mudanca"]
    );
}

#[tokio::test]
async fn test_empty_corpus_returns_no_chunks() {
    let (index, _) = SemanticIndex::build(
        Arc::new(KeywordEmbedder),
        Vec::new(),
        &IndexSettings::default(),
    )
    .unwrap();

    assert!(index.is_empty());
    assert!(index.search("impacto", 4, None).await.unwrap().is_empty());
}
