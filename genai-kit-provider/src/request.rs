//! The normalized request type consumed by every provider.

/// Tool selection strategies.
pub mod tool_choice;

pub use tool_choice::ToolChoice;

use crate::message::Message;
use crate::stop_condition::StopCondition;
use crate::tool::Tool;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A provider-agnostic generation request.
///
/// Requests are immutable value types assembled by the caller; middleware may
/// clone-and-modify (safety redaction, for example, produces a new request
/// with rewritten parts). Tool handles and the stop condition are shared
/// behind `Arc` so cloning stays cheap.
#[derive(Clone)]
pub struct Request {
    /// Model id; falls back to the provider's default when unset.
    pub model: Option<String>,
    /// The conversation so far.
    pub messages: Vec<Message>,
    /// Sampling temperature. `None` (or zero) means provider default;
    /// positive values are clamped to the provider-supported range.
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate.
    pub max_output_tokens: Option<u32>,
    /// Tools available to the model.
    pub tools: Vec<Arc<dyn Tool>>,
    /// How the model should select among the tools.
    pub tool_choice: ToolChoice,
    /// When set, the agentic runner drives a multi-step loop bounded by this
    /// condition. When unset, tool-calling responses are returned without
    /// automatic execution.
    pub stop_when: Option<Arc<dyn StopCondition>>,
    /// Advisory per-provider knobs, keyed by provider name. Unknown keys are
    /// ignored silently by adapters.
    pub provider_options: HashMap<String, HashMap<String, Value>>,
    /// Free-form caller metadata, passed through to observability hooks.
    pub metadata: HashMap<String, Value>,
    /// Cancellation token for the call. Cancelling aborts in-flight HTTP
    /// work and tool execution promptly.
    pub cancellation: Option<CancellationToken>,
}

impl Request {
    /// Creates a request from conversation messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: None,
            messages,
            temperature: None,
            max_output_tokens: None,
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
            stop_when: None,
            provider_options: HashMap::new(),
            metadata: HashMap::new(),
            cancellation: None,
        }
    }

    /// Creates a request from a single user message.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(vec![Message::user(text)])
    }

    /// Sets the model id.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the output token cap.
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Adds a tool.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Replaces the tool list.
    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the tool selection strategy.
    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    /// Sets the stop condition, enabling the multi-step runner.
    pub fn with_stop_when(mut self, condition: impl StopCondition + 'static) -> Self {
        self.stop_when = Some(Arc::new(condition));
        self
    }

    /// Sets the stop condition from a shared handle.
    pub fn with_stop_when_arc(mut self, condition: Arc<dyn StopCondition>) -> Self {
        self.stop_when = Some(condition);
        self
    }

    /// Sets an advisory option for the named provider.
    pub fn with_provider_option(
        mut self,
        provider: impl Into<String>,
        key: impl Into<String>,
        value: Value,
    ) -> Self {
        self.provider_options
            .entry(provider.into())
            .or_default()
            .insert(key.into(), value);
        self
    }

    /// Attaches caller metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Attaches a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Looks up a tool handle by name.
    pub fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// The request's cancellation token, or a never-cancelled one.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone().unwrap_or_default()
    }

    /// Advisory options for the named provider, if any.
    pub fn options_for(&self, provider: &str) -> Option<&HashMap<String, Value>> {
        self.provider_options.get(provider)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("model", &self.model)
            .field("messages", &self.messages)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("tool_choice", &self.tool_choice)
            .field("stop_when", &self.stop_when.as_ref().map(|_| "<condition>"))
            .field("provider_options", &self.provider_options)
            .field("metadata", &self.metadata)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolContext;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, input: Value, _cx: ToolContext) -> Result<Value, String> {
            Ok(input)
        }
    }

    #[test]
    fn test_builder_chain() {
        let request = Request::from_text("hi")
            .with_model("gpt-4o")
            .with_temperature(0.7)
            .with_max_output_tokens(128)
            .with_provider_option("openai", "seed", json!(42));

        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_output_tokens, Some(128));
        assert_eq!(
            request.options_for("openai").and_then(|o| o.get("seed")),
            Some(&json!(42))
        );
    }

    #[test]
    fn test_tool_lookup_by_name() {
        let request = Request::from_text("hi").with_tool(Arc::new(EchoTool));
        assert!(request.tool("echo").is_some());
        assert!(request.tool("missing").is_none());
    }

    #[test]
    fn test_clone_shares_tools() {
        let request = Request::from_text("hi").with_tool(Arc::new(EchoTool));
        let cloned = request.clone();
        assert_eq!(cloned.tools.len(), 1);
        assert_eq!(cloned.messages, request.messages);
    }

    #[test]
    fn test_cancellation_token_defaults_to_fresh() {
        let request = Request::from_text("hi");
        assert!(!request.cancellation_token().is_cancelled());
    }
}
