use super::{GenerationMode, PromptTemplate};
use crate::llm::{LanguageModelClient, LlmError, TokenStream};
use futures_util::{stream, Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Answer fragments in generation order.
///
/// Finite and consumed once. In dual mode each poll may wait on the network;
/// dropping the stream early closes the model connection.
pub struct AnswerStream {
    inner: TokenStream,
}

impl AnswerStream {
    pub fn new(inner: TokenStream) -> Self {
        Self { inner }
    }

    /// Stream that yields the given fragments without touching the network
    pub fn replay(fragments: Vec<String>) -> Self {
        Self::new(Box::pin(stream::iter(fragments.into_iter().map(Ok))))
    }

    /// Drain the stream into one string, stopping at the first error
    pub async fn collect_text(mut self) -> Result<String, LlmError> {
        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }
}

impl Stream for AnswerStream {
    type Item = Result<String, LlmError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for AnswerStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnswerStream").finish_non_exhaustive()
    }
}

/// Renders the prompt and obtains the answer from the language model
pub struct AnswerGenerator {
    llm: Arc<dyn LanguageModelClient>,
    mode: GenerationMode,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LanguageModelClient>, mode: GenerationMode) -> Self {
        Self { llm, mode }
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    /// Produce the complete answer and a stream of it.
    ///
    /// In [`GenerationMode::Dual`] the complete call runs first and the stream
    /// is opened afterwards with the identical prompt; a failure of either
    /// call fails the whole generation.
    pub async fn generate(
        &self,
        query: &str,
        context: &str,
        template: &PromptTemplate,
    ) -> Result<(String, AnswerStream), LlmError> {
        let prompt = template.render(query, context);
        tracing::debug!(mode = %self.mode, "Rendered prompt ({} chars)", prompt.len());

        match self.mode {
            GenerationMode::SingleStream => {
                let mut tokens = self.llm.stream(&prompt).await?;
                let mut fragments = Vec::new();
                while let Some(fragment) = tokens.next().await {
                    fragments.push(fragment?);
                }

                let text = fragments.concat();
                Ok((text, AnswerStream::replay(fragments)))
            }
            GenerationMode::Dual => {
                let text = self.llm.complete(&prompt).await?;
                let tokens = self.llm.stream(&prompt).await?;
                Ok((text, AnswerStream::new(tokens)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call and answers with fixed fragments
    #[derive(Default)]
    struct ScriptedModel {
        calls: Mutex<Vec<(&'static str, String)>>,
        fail_stream_midway: bool,
    }

    #[async_trait]
    impl LanguageModelClient for ScriptedModel {
        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(("complete", prompt.to_string()));
            Ok("resposta completa".to_string())
        }

        async fn stream(&self, prompt: &str) -> Result<TokenStream, LlmError> {
            self.calls.lock().unwrap().push(("stream", prompt.to_string()));
            let mut items = vec![Ok("res".to_string()), Ok("posta".to_string())];
            if self.fail_stream_midway {
                items.push(Err(LlmError::Transport("reset".to_string())));
            }
            Ok(Box::pin(stream::iter(items)))
        }
    }

    fn template() -> PromptTemplate {
        PromptTemplate::new("Q={question} C={context}").unwrap()
    }

    #[tokio::test]
    async fn test_single_stream_text_matches_replay() {
        let model = Arc::new(ScriptedModel::default());
        let generator = AnswerGenerator::new(model.clone(), GenerationMode::SingleStream);

        let (text, stream) = generator.generate("q", "ctx", &template()).await.unwrap();
        assert_eq!(text, "resposta");
        assert_eq!(stream.collect_text().await.unwrap(), text);

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("stream", "Q=q C=ctx".to_string()));
    }

    #[tokio::test]
    async fn test_single_stream_fails_on_broken_stream() {
        let model = Arc::new(ScriptedModel {
            fail_stream_midway: true,
            ..Default::default()
        });
        let generator = AnswerGenerator::new(model, GenerationMode::SingleStream);

        let result = generator.generate("q", "ctx", &template()).await;
        assert!(matches!(result, Err(LlmError::Transport(_))));
    }

    #[tokio::test]
    async fn test_dual_calls_complete_then_stream_with_same_prompt() {
        let model = Arc::new(ScriptedModel::default());
        let generator = AnswerGenerator::new(model.clone(), GenerationMode::Dual);

        let (text, stream) = generator.generate("q", "ctx", &template()).await.unwrap();
        assert_eq!(text, "resposta completa");
        assert_eq!(stream.collect_text().await.unwrap(), "resposta");

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "complete");
        assert_eq!(calls[1].0, "stream");
        assert_eq!(calls[0].1, calls[1].1);
    }

    #[tokio::test]
    async fn test_dual_stream_errors_surface_to_consumer() {
        let model = Arc::new(ScriptedModel {
            fail_stream_midway: true,
            ..Default::default()
        });
        let generator = AnswerGenerator::new(model, GenerationMode::Dual);

        let (_, stream) = generator.generate("q", "ctx", &template()).await.unwrap();
        assert!(matches!(
            stream.collect_text().await,
            Err(LlmError::Transport(_))
        ));
    }
}
