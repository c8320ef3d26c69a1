//! The provider contract.

use crate::error::GenAiError;
use crate::request::Request;
use crate::response::{ObjectResult, TextResult};
use crate::stream::{ObjectStream, TextStream};
use async_trait::async_trait;
use serde_json::Value;

/// The contract every model backend satisfies.
///
/// Four operations with identical signatures across all adapters. Middleware
/// layers (retry, rate limiting, safety) and the agentic runner implement
/// this same trait and wrap an inner provider, so a composed stack is
/// indistinguishable from a bare adapter to the caller.
///
/// # Contracts every implementation honors
///
/// - Cancelling the request's token aborts in-flight HTTP work promptly and
///   releases connection resources.
/// - Non-successful HTTP responses are read (bounded), mapped into the
///   [`GenAiError`] taxonomy, and returned after the connection is closed.
/// - With tools present and no `stop_when`, a tool-calling response is
///   returned as a single step without automatic execution; setting
///   `stop_when` hands control to the agentic runner.
/// - An unset (or zero) temperature means "provider default"; positive
///   values pass through clamped to the provider-supported range.
/// - `provider_options` entries for other providers are ignored; unknown
///   keys for this provider are ignored silently.
///
/// # Example
///
/// ```ignore
/// use genai_kit_provider::{Provider, Request};
///
/// let request = Request::from_text("What is the capital of France?")
///     .with_model("gpt-4o")
///     .with_temperature(0.7);
///
/// let result = provider.generate_text(request).await?;
/// println!("{}", result.text);
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name of the provider, for logging and option routing.
    fn name(&self) -> &str;

    /// Generates a complete text response.
    async fn generate_text(&self, request: Request) -> Result<TextResult, GenAiError>;

    /// Starts a streaming text response.
    ///
    /// The returned stream begins with `Start` and ends with `Finish` or
    /// `Error`. Closing it releases the underlying connection.
    async fn stream_text(&self, request: Request) -> Result<TextStream, GenAiError>;

    /// Generates a structured value conforming to `schema`.
    async fn generate_object(
        &self,
        request: Request,
        schema: Value,
    ) -> Result<ObjectResult<Value>, GenAiError>;

    /// Starts a streaming structured-output response.
    ///
    /// The stream's `final_value` parses the accumulated text as JSON and
    /// validates it against `schema`.
    async fn stream_object(
        &self,
        request: Request,
        schema: Value,
    ) -> Result<ObjectStream, GenAiError>;
}
