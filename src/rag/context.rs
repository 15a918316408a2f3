use super::ConversationTurn;
use crate::retrieval::Chunk;

/// Raw turns kept in the context by default (three user/assistant exchanges)
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

/// Builds the context text handed to the prompt template.
///
/// Layout: the last `history_window` turns as `Role: content` lines, a blank
/// line, then the chunk texts separated by blank lines in retrieval order.
/// The separating blank line only appears when both parts are present.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn assemble(
        &self,
        chunks: &[Chunk],
        history: &[ConversationTurn],
        history_window: usize,
    ) -> String {
        let start = history.len().saturating_sub(history_window);
        let history_text = history[start..]
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.content))
            .collect::<Vec<_>>()
            .join("\n");

        let chunk_text = chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        match (history_text.is_empty(), chunk_text.is_empty()) {
            (true, _) => chunk_text,
            (false, true) => history_text,
            (false, false) => format!("{history_text}\n\n{chunk_text}"),
        }
    }
}
