//! The normalized multimodal conversation model.

/// Binary content references.
pub mod blob_ref;
/// Message part variants.
pub mod part;

pub use blob_ref::BlobRef;
pub use part::{ImageDetail, Part};

use crate::response::step::ToolCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
    /// Tool execution results fed back to the model.
    Tool,
}

/// One turn of a conversation.
///
/// Invariant: a message carries at least one part. Tool-role messages carry a
/// single text part containing the JSON-serialized tool result, with
/// `tool_call_id` set to the id of the call they answer. Assistant messages
/// that requested tool invocations carry the call manifest in `tool_calls`
/// so the conversation round-trips through an adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Author of the message.
    pub role: Role,
    /// Optional participant name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Ordered content parts.
    pub parts: Vec<Part>,
    /// Tool calls requested by an assistant turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Correlating call id for tool-role messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn text_message(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            name: None,
            parts: vec![Part::text(text)],
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Creates a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::text_message(Role::System, text)
    }

    /// Creates a user message with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self::text_message(Role::User, text)
    }

    /// Creates a user message from arbitrary parts.
    pub fn user_parts(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            name: None,
            parts,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Creates an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text_message(Role::Assistant, text)
    }

    /// Creates a tool-result message answering the given call.
    ///
    /// The payload is JSON-serialized into the message's single text part.
    pub fn tool(call_id: impl Into<String>, payload: &Value) -> Self {
        Self {
            role: Role::Tool,
            name: None,
            parts: vec![Part::text(payload.to_string())],
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    /// Attaches a participant name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches an assistant tool-call manifest.
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Concatenation of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}
