//! Server-sent event decoding for streamed chat completions

use super::{LlmError, TokenStream};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt::Display;

#[derive(Debug, PartialEq)]
pub(crate) enum SseEvent {
    Delta(String),
    Done,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    content: Option<String>,
}

/// Splits a byte stream into SSE lines, buffering partial lines (and partial
/// UTF-8 sequences) across network chunks.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>, LlmError> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line))? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Flush a trailing line that arrived without a newline
    pub(crate) fn finish(&mut self) -> Result<Option<SseEvent>, LlmError> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&String::from_utf8_lossy(&rest))
    }
}

fn parse_line(line: &str) -> Result<Option<SseEvent>, LlmError> {
    let line = line.trim();

    // comments, `event:` and `id:` fields carry nothing we use
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };

    let data = data.trim();
    if data == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| LlmError::MalformedResponse(format!("stream event: {e}")))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map(SseEvent::Delta))
}

struct DecodeState<S> {
    body: S,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, LlmError>>,
    finished: bool,
}

/// Turn a response body into a [`TokenStream`] of content fragments.
///
/// The returned stream owns `body`; dropping it closes the connection.
pub(crate) fn decode_stream<S, B, E>(body: S) -> TokenStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    let state = DecodeState {
        body,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures_util::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }

            match st.body.next().await {
                Some(Ok(bytes)) => match st.decoder.feed(bytes.as_ref()) {
                    Ok(events) => st.queue(events),
                    Err(e) => st.fail(e),
                },
                Some(Err(e)) => st.fail(LlmError::Transport(e.to_string())),
                None => {
                    st.finished = true;
                    match st.decoder.finish() {
                        Ok(Some(SseEvent::Delta(text))) => st.pending.push_back(Ok(text)),
                        Ok(_) => {}
                        Err(e) => st.pending.push_back(Err(e)),
                    }
                }
            }
        }
    }))
}

impl<S> DecodeState<S> {
    fn queue(&mut self, events: Vec<SseEvent>) {
        for event in events {
            match event {
                SseEvent::Delta(text) => self.pending.push_back(Ok(text)),
                SseEvent::Done => {
                    self.finished = true;
                    break;
                }
            }
        }
    }

    fn fail(&mut self, err: LlmError) {
        self.pending.push_back(Err(err));
        self.finished = true;
    }
}
