//! End-to-end invocation: query → retrieve → assemble → generate → cite

use super::{
    AnswerGenerator, AnswerStream, ContextAssembler, ConversationTurn, GenerationMode,
    PromptTemplate, QueryRequest, RagError, RagResponse, SourceCollector, DEFAULT_HISTORY_WINDOW,
    DEFAULT_RETRIEVER_K,
};
use crate::llm::LanguageModelClient;
use crate::retrieval::{Chunk, TopicFilter, VectorIndex};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Pipeline-wide settings used by [`RagPipeline::run_rag`]
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub retriever_k: usize,
    pub history_window: usize,
    pub topic_filter: Option<TopicFilter>,
    pub prompt_template: PromptTemplate,
    pub generation_mode: GenerationMode,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            retriever_k: DEFAULT_RETRIEVER_K,
            history_window: DEFAULT_HISTORY_WINDOW,
            topic_filter: None,
            prompt_template: PromptTemplate::default(),
            generation_mode: GenerationMode::default(),
        }
    }
}

struct Retrieved {
    query: String,
    chunks: Vec<Chunk>,
}

struct Assembled {
    query: String,
    chunks: Vec<Chunk>,
    context: String,
}

struct Generated {
    query: String,
    chunks: Vec<Chunk>,
    answer_text: String,
    answer_stream: AnswerStream,
}

/// Retrieval-augmented answering over a vector index and a language model.
///
/// Invocations are independent: nothing is cached or retried, and the
/// conversation history passed in is never modified.
pub struct RagPipeline {
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LanguageModelClient>,
    settings: PipelineSettings,
    assembler: ContextAssembler,
    collector: SourceCollector,
}

impl RagPipeline {
    pub fn new(index: Arc<dyn VectorIndex>, llm: Arc<dyn LanguageModelClient>) -> Self {
        Self {
            index,
            llm,
            settings: PipelineSettings::default(),
            assembler: ContextAssembler,
            collector: SourceCollector,
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Answer `query` with the pipeline-wide settings
    pub async fn run_rag(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<RagResponse, RagError> {
        let request = QueryRequest {
            query: query.to_string(),
            retriever_k: self.settings.retriever_k,
            topic_filter: self.settings.topic_filter.clone(),
            prompt_template: self.settings.prompt_template.clone(),
            history,
            history_window: self.settings.history_window,
        };
        self.run(request).await
    }

    /// Run one invocation.
    ///
    /// The request is validated before the index or the model is called.
    pub async fn run(&self, request: QueryRequest<'_>) -> Result<RagResponse, RagError> {
        validate(&request)?;

        let query_id = Uuid::new_v4();
        let span = tracing::info_span!("rag", %query_id);

        async move {
            let result = self.execute(request).await;
            if let Err(e) = &result {
                tracing::warn!("RAG invocation failed: {}", e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, request: QueryRequest<'_>) -> Result<RagResponse, RagError> {
        let retrieved = self.retrieve(&request).await?;
        let assembled = self.assemble(retrieved, &request);
        let generated = self.generate(assembled, &request).await?;
        Ok(self.cite(generated))
    }

    async fn retrieve(&self, request: &QueryRequest<'_>) -> Result<Retrieved, RagError> {
        let chunks = self
            .index
            .search(
                &request.query,
                request.retriever_k,
                request.topic_filter.as_ref(),
            )
            .await?;

        tracing::debug!(
            "Retrieved {} chunks (k = {})",
            chunks.len(),
            request.retriever_k
        );

        Ok(Retrieved {
            query: request.query.clone(),
            chunks,
        })
    }

    fn assemble(&self, retrieved: Retrieved, request: &QueryRequest<'_>) -> Assembled {
        let context =
            self.assembler
                .assemble(&retrieved.chunks, request.history, request.history_window);

        tracing::debug!(
            "Assembled context of {} chars from {} history turns",
            context.len(),
            request.history.len().min(request.history_window)
        );

        Assembled {
            query: retrieved.query,
            chunks: retrieved.chunks,
            context,
        }
    }

    async fn generate(
        &self,
        assembled: Assembled,
        request: &QueryRequest<'_>,
    ) -> Result<Generated, RagError> {
        let generator = AnswerGenerator::new(Arc::clone(&self.llm), self.settings.generation_mode);
        let (answer_text, answer_stream) = generator
            .generate(
                &assembled.query,
                &assembled.context,
                &request.prompt_template,
            )
            .await?;

        tracing::debug!("Generated answer of {} chars", answer_text.len());

        Ok(Generated {
            query: assembled.query,
            chunks: assembled.chunks,
            answer_text,
            answer_stream,
        })
    }

    fn cite(&self, generated: Generated) -> RagResponse {
        let sources = self.collector.collect(&generated.chunks);

        RagResponse {
            query: generated.query,
            answer_text: generated.answer_text,
            answer_stream: generated.answer_stream,
            sources,
        }
    }
}

fn validate(request: &QueryRequest<'_>) -> Result<(), RagError> {
    if request.retriever_k < 1 {
        return Err(RagError::InvalidRequest(
            "retriever_k must be at least 1".to_string(),
        ));
    }
    if request.query.trim().is_empty() {
        return Err(RagError::InvalidRequest("query is empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let ok = QueryRequest::new("Como medir impacto?", &[]);
        assert!(validate(&ok).is_ok());

        let zero_k = QueryRequest::new("Q", &[]).with_retriever_k(0);
        assert!(matches!(
            validate(&zero_k),
            Err(RagError::InvalidRequest(_))
        ));

        let blank = QueryRequest::new("  \n", &[]);
        assert!(matches!(validate(&blank), Err(RagError::InvalidRequest(_))));
    }

    #[test]
    fn test_default_settings() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.retriever_k, 4);
        assert_eq!(settings.history_window, 6);
        assert_eq!(settings.generation_mode, GenerationMode::SingleStream);
    }
}
