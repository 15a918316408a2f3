/// Embedding integration: real multilingual model over a small Portuguese corpus
///
/// Downloads the embedding model on first run.
use std::sync::Arc;
use iaris::config::Config;
use iaris::embedding::{EmbeddingProvider, FastEmbedProvider};
use iaris::retrieval::{Chunk, SemanticIndex, TopicFilter, VectorIndex};

fn corpus() -> Vec<Chunk> {
    vec![
        Chunk::new(
            "A Teoria da Mudança descreve como as atividades de um programa levam aos \
             resultados e impactos de longo prazo desejados.",
            "data/teoria/guia_tm.pdf",
        )
        .with_page(3)
        .with_subject("teoria_da_mudanca"),
        Chunk::new(
            "O relatório de sustentabilidade segundo a GRI apresenta os temas materiais \
             e os indicadores ambientais, sociais e de governança da organização.",
            "data/relatorios/gri.pdf",
        )
        .with_page(12)
        .with_subject("relatorios"),
        Chunk::new(
            "O mapeamento de stakeholders identifica os grupos afetados pela organização \
             e define estratégias de engajamento para cada um deles.",
            "data/stakeholders/mapa.pdf",
        )
        .with_page(5)
        .with_subject("stakeholders"),
        Chunk::new(
            "Indicadores de impacto social devem ser monitorados periodicamente para \
             medir a evolução dos beneficiários.",
            "data/mensuracao/indicadores.pdf",
        )
        .with_subject("mensuracao"),
    ]
}

#[tokio::test]
#[ignore] // Requires model download (~470MB) - run with: cargo test -- --ignored
async fn test_multilingual_semantic_search() {
    println!("\n=== Embedding Integration Test: Semantic Search ===\n");

    let config = Config::default();
    let provider = Arc::new(
        FastEmbedProvider::new(&config.embedding.model)
            .expect("Failed to initialize embedding provider"),
    );
    assert_eq!(provider.dimension(), config.indexing.vector_dim);

    println!(
        "✓ Embedding provider initialized: {} ({}D)",
        provider.model_name(),
        provider.dimension()
    );

    let (index, result) =
        SemanticIndex::build(provider, corpus(), &config.index_settings()).unwrap();
    assert_eq!(result.processed, 4);
    println!("✓ Indexed {} chunks in {} ms", result.processed, result.duration_ms);

    let chunks = index
        .search("Como identificar e engajar as partes interessadas?", 1, None)
        .await
        .unwrap();
    assert_eq!(chunks[0].source, "data/stakeholders/mapa.pdf");
    println!("✓ Stakeholder question matched {}", chunks[0].source);

    let chunks = index
        .search("Como montar uma teoria da mudança?", 2, None)
        .await
        .unwrap();
    assert_eq!(chunks[0].subject.as_deref(), Some("teoria_da_mudanca"));

    let filter: TopicFilter = ["relatorios"].into_iter().collect();
    let chunks = index
        .search("Como montar uma teoria da mudança?", 2, Some(&filter))
        .await
        .unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].source, "data/relatorios/gri.pdf");
    println!("✓ Topic filter restricted results to relatorios");
}
