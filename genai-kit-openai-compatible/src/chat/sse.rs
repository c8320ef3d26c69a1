//! SSE decoding and tool-call accumulation for streaming responses.

use super::api_types::{ChatStreamChunk, StreamChoice};
use genai_kit_provider::error::{ErrorKind, GenAiError};
use genai_kit_provider::response::Usage;
use genai_kit_provider::stream::Event;
use serde_json::Value;
use std::collections::BTreeMap;

/// Accumulates one streamed tool call across chunks.
#[derive(Debug, Default)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Decodes an SSE byte stream into normalized events.
///
/// Lines are buffered until complete; blank lines and comments are skipped,
/// `data: [DONE]` terminates, and malformed JSON chunks are skipped silently
/// (providers occasionally emit keep-alives and partial lines). Tool-call
/// argument fragments accumulate per chunk `index` and surface as a single
/// `ToolCall` event once complete and valid.
pub(crate) struct StreamDecoder {
    provider: String,
    buffer: Vec<u8>,
    tool_calls: BTreeMap<u64, PendingToolCall>,
    usage: Usage,
    finished: bool,
}

impl StreamDecoder {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            buffer: Vec::new(),
            tool_calls: BTreeMap::new(),
            usage: Usage::default(),
            finished: false,
        }
    }

    /// Feeds raw bytes, returning any events they complete.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<Event> {
        let mut events = Vec::new();
        self.buffer.extend_from_slice(bytes);

        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if self.finished {
                continue;
            }
            let line = String::from_utf8_lossy(&line);
            self.handle_line(line.trim(), &mut events);
        }

        events
    }

    /// Signals end of input; flushes pending state if `[DONE]` never came.
    pub fn end(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.finished {
            self.finish(&mut events);
        }
        events
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<Event>) {
        if line.is_empty() || line.starts_with(':') {
            return;
        }
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim_start();

        if data == "[DONE]" {
            self.finish(events);
            return;
        }

        // Malformed chunks (keep-alives, partial lines) are skipped.
        if let Ok(chunk) = serde_json::from_str::<ChatStreamChunk>(data) {
            self.handle_chunk(chunk, events);
        }
    }

    fn handle_chunk(&mut self, chunk: ChatStreamChunk, events: &mut Vec<Event>) {
        if let Some(usage) = &chunk.usage {
            self.usage = usage.to_usage();
        }

        let Some(choice) = chunk.choices.first() else {
            return;
        };

        if let Some(content) = &choice.delta.content {
            if !content.is_empty() {
                events.push(Event::text_delta(content.clone()));
            }
        }

        self.accumulate_tool_calls(choice);

        if choice.finish_reason.is_some() {
            self.flush_tool_calls(events);
        }
    }

    fn accumulate_tool_calls(&mut self, choice: &StreamChoice) {
        let Some(tool_calls) = &choice.delta.tool_calls else {
            return;
        };
        for fragment in tool_calls {
            let index = fragment.index.unwrap_or(0);
            let pending = self.tool_calls.entry(index).or_default();
            if let Some(id) = &fragment.id {
                if !id.is_empty() {
                    pending.id = id.clone();
                }
            }
            if let Some(function) = &fragment.function {
                if let Some(name) = &function.name {
                    if !name.is_empty() {
                        pending.name = name.clone();
                    }
                }
                if let Some(arguments) = &function.arguments {
                    pending.arguments.push_str(arguments);
                }
            }
        }
    }

    /// Emits accumulated tool calls in index order. Arguments must parse as
    /// JSON; an invalid accumulation terminates the stream with an error.
    fn flush_tool_calls(&mut self, events: &mut Vec<Event>) {
        let pending = std::mem::take(&mut self.tool_calls);
        for (_, call) in pending {
            if call.id.is_empty() && call.name.is_empty() {
                continue;
            }
            let input: Result<Value, _> = if call.arguments.trim().is_empty() {
                Ok(Value::Object(serde_json::Map::new()))
            } else {
                serde_json::from_str(&call.arguments)
            };
            match input {
                Ok(input) => events.push(Event::tool_call(call.id, call.name, input)),
                Err(e) => {
                    events.push(Event::error(
                        GenAiError::new(
                            ErrorKind::Internal,
                            format!("tool call arguments are not valid JSON: {e}"),
                        )
                        .with_provider(&self.provider),
                    ));
                    self.finished = true;
                    return;
                }
            }
        }
    }

    fn finish(&mut self, events: &mut Vec<Event>) {
        self.flush_tool_calls(events);
        if !self.finished {
            events.push(Event::finish(self.usage));
            self.finished = true;
        }
    }
}
