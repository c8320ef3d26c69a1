use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation requested by the model.
///
/// The `id` must be echoed back verbatim on the corresponding tool-result
/// message; every backend requires this correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Provider-assigned call id.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Parsed JSON arguments for the tool.
    pub input: Value,
}

impl ToolCall {
    /// Creates a tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// The outcome of executing one tool call.
///
/// Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecution {
    /// The originating call id.
    pub id: String,
    /// Name of the executed tool.
    pub name: String,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolExecution {
    /// A successful execution.
    pub fn succeeded(id: impl Into<String>, name: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            result: Some(result),
            error: None,
        }
    }

    /// A failed execution.
    pub fn failed(id: impl Into<String>, name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    /// Whether the execution failed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The payload to feed back to the model.
    ///
    /// Successful results pass through; failures become `{"error": <message>}`.
    pub fn payload(&self) -> Value {
        match (&self.result, &self.error) {
            (Some(result), _) => result.clone(),
            (None, Some(error)) => serde_json::json!({ "error": error }),
            (None, None) => Value::Null,
        }
    }
}

/// One model inference plus the fan-out execution of any tool calls it
/// emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// 1-based position of this step in the run.
    pub step_number: usize,
    /// Assistant text produced by the inference.
    pub text: String,
    /// Tool calls emitted by the model, in emission order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Execution outcomes, in the same order as `tool_calls`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolExecution>,
}

impl Step {
    /// Creates a step with no tool activity.
    pub fn new(step_number: usize, text: impl Into<String>) -> Self {
        Self {
            step_number,
            text: text.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    /// Whether the model emitted any tool calls in this step.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
