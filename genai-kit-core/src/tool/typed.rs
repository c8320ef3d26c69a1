use async_trait::async_trait;
use genai_kit_provider::tool::{Tool, ToolContext};
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// A tool with compile-time checked input and output types.
///
/// The input schema is derived from the `Input` type via `schemars`, so the
/// schema sent to the model and the type your code receives cannot drift
/// apart. [`TypedTool::into_tool`] erases the types for registration on a
/// request.
///
/// # Example
///
/// ```
/// use genai_kit_core::tool::TypedTool;
/// use genai_kit_provider::tool::{Tool, ToolContext};
/// use schemars::JsonSchema;
/// use serde::{Deserialize, Serialize};
/// use async_trait::async_trait;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct WeatherInput {
///     location: String,
/// }
///
/// #[derive(Serialize)]
/// struct WeatherOutput {
///     forecast: String,
/// }
///
/// struct WeatherTool;
///
/// #[async_trait]
/// impl TypedTool for WeatherTool {
///     type Input = WeatherInput;
///     type Output = WeatherOutput;
///
///     fn name(&self) -> &str {
///         "get_weather"
///     }
///
///     fn description(&self) -> &str {
///         "Get the current weather for a location"
///     }
///
///     async fn execute(
///         &self,
///         input: Self::Input,
///         _cx: &ToolContext,
///     ) -> Result<Self::Output, String> {
///         Ok(WeatherOutput {
///             forecast: format!("Sunny in {}", input.location),
///         })
///     }
/// }
///
/// let tool = WeatherTool.into_tool();
/// assert_eq!(tool.name(), "get_weather");
/// ```
#[async_trait]
pub trait TypedTool: Send + Sync {
    /// The input type; its derived JSON Schema is sent to the model.
    type Input: DeserializeOwned + JsonSchema + Send + 'static;

    /// The output type, serialized into the tool-result payload.
    type Output: Serialize + Send + 'static;

    /// Name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// Executes the tool with a typed input.
    async fn execute(&self, input: Self::Input, cx: &ToolContext) -> Result<Self::Output, String>;

    /// Erases this tool into a shareable [`Tool`] handle.
    fn into_tool(self) -> Arc<dyn Tool>
    where
        Self: Sized + 'static,
    {
        Arc::new(TypedToolAdapter::new(self))
    }
}

struct TypedToolAdapter<T> {
    inner: T,
    schema: Value,
}

impl<T: TypedTool> TypedToolAdapter<T> {
    fn new(inner: T) -> Self {
        let root = schemars::schema_for!(T::Input);
        let schema = serde_json::to_value(root.schema)
            .expect("failed to convert schema to JSON value");
        Self { inner, schema }
    }
}

#[async_trait]
impl<T: TypedTool> Tool for TypedToolAdapter<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, input: Value, cx: ToolContext) -> Result<Value, String> {
        let typed: T::Input =
            serde_json::from_value(input).map_err(|e| format!("invalid tool input: {e}"))?;
        let output = self.inner.execute(typed, &cx).await?;
        serde_json::to_value(output).map_err(|e| format!("failed to serialize tool output: {e}"))
    }
}
