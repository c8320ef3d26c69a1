use crate::error::GenAiError;
use crate::response::usage::Usage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The action a safety system took on flagged content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyAction {
    /// Content was flagged but passed through.
    Flag,
    /// Content was rewritten.
    Redact,
    /// Content was blocked.
    Block,
}

/// A discrete element of a streaming response in the normalized schema.
///
/// Every stream begins with [`Event::Start`] and ends with exactly one of
/// [`Event::Finish`] or [`Event::Error`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// The stream opened.
    Start,

    /// An incremental text fragment.
    #[serde(rename_all = "camelCase")]
    TextDelta {
        /// The text fragment.
        text_delta: String,
    },

    /// A complete tool call. Emitted only once the input has fully
    /// accumulated and parsed as JSON.
    #[serde(rename_all = "camelCase")]
    ToolCall {
        /// Provider-assigned call id.
        tool_id: String,
        /// Name of the tool.
        tool_name: String,
        /// Parsed JSON arguments.
        tool_input: Value,
    },

    /// The result of a tool execution.
    #[serde(rename_all = "camelCase")]
    ToolResult {
        /// The originating call id.
        tool_id: String,
        /// Name of the tool.
        tool_name: String,
        /// The result payload.
        result: Value,
    },

    /// A safety signal from the provider or a middleware layer.
    Safety {
        /// Provider-defined category of the finding.
        category: String,
        /// Action taken.
        action: SafetyAction,
        /// Confidence score in `[0, 1]`.
        score: f64,
    },

    /// A source citation.
    Citation {
        /// The cited source.
        source: String,
        /// Byte span of the cited region in the generated text, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        span: Option<(usize, usize)>,
    },

    /// The stream completed successfully.
    Finish {
        /// Token usage for the call.
        usage: Usage,
    },

    /// The stream terminated with an error.
    Error {
        /// The terminating error.
        error: GenAiError,
    },
}

impl Event {
    /// Creates a text-delta event.
    pub fn text_delta(text: impl Into<String>) -> Self {
        Self::TextDelta {
            text_delta: text.into(),
        }
    }

    /// Creates a tool-call event.
    pub fn tool_call(
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_input: Value,
    ) -> Self {
        Self::ToolCall {
            tool_id: tool_id.into(),
            tool_name: tool_name.into(),
            tool_input,
        }
    }

    /// Creates a finish event.
    pub fn finish(usage: Usage) -> Self {
        Self::Finish { usage }
    }

    /// Creates an error event.
    pub fn error(error: GenAiError) -> Self {
        Self::Error { error }
    }

    /// Whether this event terminates the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish { .. } | Self::Error { .. })
    }

    /// The delta text, if this is a text-delta event.
    pub fn delta(&self) -> Option<&str> {
        match self {
            Self::TextDelta { text_delta } => Some(text_delta),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events() {
        assert!(Event::finish(Usage::default()).is_terminal());
        assert!(
            Event::error(GenAiError::new(
                crate::error::ErrorKind::Internal,
                "boom"
            ))
            .is_terminal()
        );
        assert!(!Event::Start.is_terminal());
        assert!(!Event::text_delta("x").is_terminal());
    }

    #[test]
    fn test_text_delta_serde_shape() {
        let json = serde_json::to_value(Event::text_delta("hi")).unwrap();
        assert_eq!(json["type"], "textDelta");
        assert_eq!(json["textDelta"], "hi");
    }

    #[test]
    fn test_tool_call_serde_shape() {
        let event = Event::tool_call("c1", "get_weather", serde_json::json!({"location": "Tokyo"}));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "toolCall");
        assert_eq!(json["toolId"], "c1");
        assert_eq!(json["toolName"], "get_weather");
        assert_eq!(json["toolInput"]["location"], "Tokyo");
    }
}
