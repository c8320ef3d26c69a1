//! The tool handle contract.

use crate::message::Message;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-invocation context handed to a tool.
///
/// Tools receive the originating call id, the step number, and a read-only
/// snapshot of the conversation so far. The cancellation token is derived
/// from the request context; long-running tools should honor it.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Id of the tool call being executed.
    pub call_id: String,
    /// 1-based step number the call was emitted in.
    pub step_number: usize,
    /// Read-only snapshot of the conversation before this step's results.
    pub messages: Arc<Vec<Message>>,
    /// Cancellation token derived from the request context.
    pub cancellation: CancellationToken,
}

impl ToolContext {
    /// Creates a tool context.
    pub fn new(
        call_id: impl Into<String>,
        step_number: usize,
        messages: Arc<Vec<Message>>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            step_number,
            messages,
            cancellation,
        }
    }
}

/// A callable tool exposed to the model.
///
/// The schema is sent verbatim to the model; the model returns arguments as
/// JSON that the runner parses and passes to [`Tool::execute`]. Execution
/// failures are reported as plain messages, which the runner feeds back to
/// the model as an error payload rather than aborting the run.
///
/// Typed registration with derived schemas is available in the core crate;
/// this trait is the erased form the runner dispatches on.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's input.
    fn input_schema(&self) -> Value;

    /// Executes the tool with parsed JSON input.
    async fn execute(&self, input: Value, cx: ToolContext) -> Result<Value, String>;
}
