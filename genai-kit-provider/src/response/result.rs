use super::step::Step;
use super::usage::Usage;
use crate::error::{ErrorKind, GenAiError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The final outcome of a text generation call.
///
/// Invariants: `text` equals the text of the last step, and `usage` is the
/// sum across all steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextResult {
    /// Final assistant text.
    pub text: String,
    /// The complete step trace, in inference order.
    pub steps: Vec<Step>,
    /// Token usage summed across all steps.
    pub usage: Usage,
    /// Adapter-specific raw payload of the last response, when captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl TextResult {
    /// Builds a result from a step trace and accumulated usage.
    ///
    /// The final text is taken from the last step.
    pub fn from_steps(steps: Vec<Step>, usage: Usage, raw: Option<Value>) -> Self {
        let text = steps.last().map(|s| s.text.clone()).unwrap_or_default();
        Self {
            text,
            steps,
            usage,
            raw,
        }
    }

    /// All tool calls across every step, in emission order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &super::step::ToolCall> {
        self.steps.iter().flat_map(|s| s.tool_calls.iter())
    }
}

/// The final outcome of a structured-output call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectResult<T> {
    /// The generated value, already validated against the request schema.
    pub value: T,
    /// Token usage for the call.
    pub usage: Usage,
    /// Adapter-specific raw payload, when captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl ObjectResult<Value> {
    /// Deserializes the raw value into a concrete type.
    pub fn deserialize_into<T: DeserializeOwned>(self) -> Result<ObjectResult<T>, GenAiError> {
        let ObjectResult { value, usage, raw } = self;
        let value = serde_json::from_value(value).map_err(|e| {
            GenAiError::new(
                ErrorKind::Internal,
                format!("generated object does not match the expected type: {e}"),
            )
        })?;
        Ok(ObjectResult { value, usage, raw })
    }
}
