use async_trait::async_trait;
use futures::future::BoxFuture;
use genai_kit_provider::tool::{Tool, ToolContext};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

type Handler =
    Arc<dyn Fn(Value, ToolContext) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;

/// A tool built from a name, a schema, and an async closure.
///
/// The lightweight way to register a tool when deriving a typed input is
/// not worth it.
///
/// # Example
///
/// ```
/// use genai_kit_core::tool::FnTool;
/// use serde_json::{Value, json};
///
/// let tool = FnTool::new(
///     "get_weather",
///     "Get the current weather for a location",
///     json!({
///         "type": "object",
///         "properties": {"location": {"type": "string"}},
///         "required": ["location"]
///     }),
///     |input: Value, _cx| async move {
///         Ok(json!({"forecast": "sunny", "location": input["location"]}))
///     },
/// );
/// ```
pub struct FnTool {
    name: String,
    description: String,
    schema: Value,
    handler: Handler,
}

impl FnTool {
    /// Creates a tool from an async closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler: Arc::new(move |input, cx| Box::pin(handler(input, cx))),
        }
    }

    /// Erases this tool into a shareable handle.
    pub fn into_tool(self) -> Arc<dyn Tool> {
        Arc::new(self)
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, input: Value, cx: ToolContext) -> Result<Value, String> {
        (self.handler)(input, cx).await
    }
}
