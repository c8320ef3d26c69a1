//! The chat-completion provider implementation.

use super::api_types::ChatCompletionResponse;
use super::convert::build_body;
use super::sse::StreamDecoder;
use crate::error::{map_error_response, parse_retry_after};
use crate::settings::OpenAiCompatibleSettings;
use async_trait::async_trait;
use futures_util::StreamExt;
use genai_kit_provider::error::{ErrorKind, GenAiError};
use genai_kit_provider::message::Message;
use genai_kit_provider::provider::Provider;
use genai_kit_provider::request::Request;
use genai_kit_provider::response::{ObjectResult, Step, TextResult, ToolCall, Usage};
use genai_kit_provider::schema::validate_against_schema;
use genai_kit_provider::stream::text_stream::DEFAULT_EVENT_CAPACITY;
use genai_kit_provider::stream::{Event, ObjectStream, TextStream};
use serde_json::{Value, json};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default overall timeout for unary calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Connect timeout for streaming calls, which have no overall timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A provider backed by an OpenAI-compatible chat-completion API.
///
/// # Example
///
/// ```ignore
/// use genai_kit_openai_compatible::{OpenAiCompatibleProvider, OpenAiCompatibleSettings};
///
/// let provider = OpenAiCompatibleProvider::new(
///     OpenAiCompatibleSettings::from_env("openai", "OPENAI", "https://api.openai.com/v1")?
///         .with_default_model("gpt-4o"),
/// )?;
/// ```
#[derive(Debug)]
pub struct OpenAiCompatibleProvider {
    settings: OpenAiCompatibleSettings,
    client: reqwest::Client,
    stream_client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Validates the settings and builds the HTTP clients.
    pub fn new(settings: OpenAiCompatibleSettings) -> Result<Self, GenAiError> {
        url::Url::parse(&settings.base_url).map_err(|e| {
            GenAiError::new(
                ErrorKind::InvalidRequest,
                format!("invalid base URL '{}': {e}", settings.base_url),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                GenAiError::new(ErrorKind::Internal, format!("failed to build client: {e}"))
            })?;
        let stream_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                GenAiError::new(ErrorKind::Internal, format!("failed to build client: {e}"))
            })?;

        Ok(Self {
            settings,
            client,
            stream_client,
        })
    }

    fn map_transport_error(&self, model: &str, error: reqwest::Error) -> GenAiError {
        let kind = if error.is_timeout() {
            ErrorKind::Timeout
        } else {
            ErrorKind::Network
        };
        GenAiError::new(kind, format!("request failed: {error}"))
            .with_provider(&self.settings.provider)
            .with_model(model)
    }

    /// Sends a request, honoring cancellation and mapping failures.
    async fn send(
        &self,
        client: &reqwest::Client,
        body: &Value,
        model: &str,
        cancellation: &CancellationToken,
    ) -> Result<reqwest::Response, GenAiError> {
        let mut request = client
            .post(self.settings.chat_completions_url())
            .header("Content-Type", "application/json");
        if let Some(api_key) = &self.settings.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }
        for (name, value) in &self.settings.headers {
            request = request.header(name, value);
        }

        let response = tokio::select! {
            _ = cancellation.cancelled() => return Err(GenAiError::cancelled()),
            response = request.json(body).send() => {
                response.map_err(|e| self.map_transport_error(model, e))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("(unreadable body: {e})"));
            return Err(map_error_response(
                &self.settings.provider,
                Some(model),
                status.as_u16(),
                retry_after,
                &body,
            ));
        }

        Ok(response)
    }

    async fn complete(
        &self,
        body: &Value,
        model: &str,
        cancellation: &CancellationToken,
    ) -> Result<Value, GenAiError> {
        let response = self.send(&self.client, body, model, cancellation).await?;
        let text = tokio::select! {
            _ = cancellation.cancelled() => return Err(GenAiError::cancelled()),
            text = response.text() => text.map_err(|e| self.map_transport_error(model, e))?,
        };
        serde_json::from_str(&text).map_err(|e| {
            GenAiError::new(
                ErrorKind::Internal,
                format!("response body is not valid JSON: {e}"),
            )
            .with_provider(&self.settings.provider)
            .with_model(model)
        })
    }

    fn parse_text_result(&self, raw: Value, model: &str) -> Result<TextResult, GenAiError> {
        let parsed: ChatCompletionResponse =
            serde_json::from_value(raw.clone()).map_err(|e| {
                GenAiError::new(
                    ErrorKind::Internal,
                    format!("unexpected response shape: {e}"),
                )
                .with_provider(&self.settings.provider)
                .with_model(model)
            })?;

        let choice = parsed.choices.first().ok_or_else(|| {
            GenAiError::new(ErrorKind::Internal, "response contained no choices")
                .with_provider(&self.settings.provider)
                .with_model(model)
        })?;

        let text = choice.message.content.clone().unwrap_or_default();
        let mut step = Step::new(1, text);

        if let Some(tool_calls) = &choice.message.tool_calls {
            for call in tool_calls {
                let input: Value = if call.function.arguments.trim().is_empty() {
                    Value::Object(serde_json::Map::new())
                } else {
                    serde_json::from_str(&call.function.arguments).map_err(|e| {
                        GenAiError::new(
                            ErrorKind::Internal,
                            format!("tool call arguments are not valid JSON: {e}"),
                        )
                        .with_provider(&self.settings.provider)
                        .with_model(model)
                    })?
                };
                step.tool_calls.push(ToolCall::new(
                    call.id.clone().unwrap_or_default(),
                    call.function.name.clone(),
                    input,
                ));
            }
        }

        let usage: Usage = parsed
            .usage
            .as_ref()
            .map(|u| u.to_usage())
            .unwrap_or_default();
        Ok(TextResult::from_steps(vec![step], usage, Some(raw)))
    }

    /// Opens a streaming call and spawns the decoder task feeding the
    /// bounded event queue.
    async fn open_stream(
        &self,
        request: &Request,
        response_format: Option<Value>,
    ) -> Result<TextStream, GenAiError> {
        let (body, model) = build_body(&self.settings, request, true, response_format)?;
        let parent = request.cancellation_token();
        let cancel = parent.child_token();

        let response = self
            .send(&self.stream_client, &body, &model, &cancel)
            .await?;

        let (mut sender, stream) = TextStream::channel(DEFAULT_EVENT_CAPACITY, cancel.clone());
        let provider = self.settings.provider.clone();

        tokio::spawn(async move {
            sender.send(Event::Start);
            let mut decoder = StreamDecoder::new(provider.clone());
            let mut bytes = response.bytes_stream();

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        // Dropping the response releases the connection.
                        return;
                    }
                    chunk = bytes.next() => match chunk {
                        Some(Ok(data)) => {
                            for event in decoder.push_bytes(&data) {
                                let terminal = event.is_terminal();
                                sender.send(event);
                                if terminal {
                                    return;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            sender.send(Event::error(
                                GenAiError::new(
                                    ErrorKind::Network,
                                    format!("stream read failed: {e}"),
                                )
                                .with_provider(&provider),
                            ));
                            return;
                        }
                        None => {
                            for event in decoder.end() {
                                sender.send(event);
                            }
                            return;
                        }
                    }
                }
            }
        });

        Ok(stream)
    }

    /// Prepends a system hint carrying the output schema.
    fn with_schema_hint(request: Request, schema: &Value) -> Request {
        let mut request = request;
        if !schema.is_null() {
            request.messages.insert(
                0,
                Message::system(format!(
                    "Respond with a single JSON object conforming to this JSON Schema:\n{schema}"
                )),
            );
        }
        request
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.settings.provider
    }

    async fn generate_text(&self, request: Request) -> Result<TextResult, GenAiError> {
        let (body, model) = build_body(&self.settings, &request, false, None)?;
        let raw = self
            .complete(&body, &model, &request.cancellation_token())
            .await?;
        self.parse_text_result(raw, &model)
    }

    async fn stream_text(&self, request: Request) -> Result<TextStream, GenAiError> {
        self.open_stream(&request, None).await
    }

    async fn generate_object(
        &self,
        request: Request,
        schema: Value,
    ) -> Result<ObjectResult<Value>, GenAiError> {
        let request = Self::with_schema_hint(request, &schema);
        let (body, model) = build_body(
            &self.settings,
            &request,
            false,
            Some(json!({"type": "json_object"})),
        )?;
        let raw = self
            .complete(&body, &model, &request.cancellation_token())
            .await?;
        let result = self.parse_text_result(raw.clone(), &model)?;

        let value: Value = serde_json::from_str(result.text.trim()).map_err(|e| {
            GenAiError::new(
                ErrorKind::Internal,
                format!("generated output is not valid JSON: {e}"),
            )
            .with_provider(&self.settings.provider)
            .with_model(&model)
        })?;
        if !schema.is_null() {
            validate_against_schema(&schema, &value)?;
        }

        Ok(ObjectResult {
            value,
            usage: result.usage,
            raw: Some(raw),
        })
    }

    async fn stream_object(
        &self,
        request: Request,
        schema: Value,
    ) -> Result<ObjectStream, GenAiError> {
        let request = Self::with_schema_hint(request, &schema);
        let stream = self
            .open_stream(&request, Some(json!({"type": "json_object"})))
            .await?;
        let schema = if schema.is_null() { None } else { Some(schema) };
        Ok(ObjectStream::new(stream, schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(
            OpenAiCompatibleSettings::new("openai", "https://api.openai.com/v1")
                .with_default_model("gpt-4o"),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        let err = OpenAiCompatibleProvider::new(OpenAiCompatibleSettings::new(
            "broken",
            "not a url",
        ))
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_parse_text_result_with_text() {
        let raw = json!({
            "id": "chatcmpl-1",
            "choices": [{
                "message": {"role": "assistant", "content": "Hello there"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 4, "completion_tokens": 3, "total_tokens": 7}
        });
        let result = provider().parse_text_result(raw, "gpt-4o").unwrap();
        assert_eq!(result.text, "Hello there");
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.usage, Usage::new(4, 3));
        assert!(result.raw.is_some());
    }

    #[test]
    fn test_parse_text_result_with_tool_calls() {
        let raw = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "c1",
                        "type": "function",
                        "function": {
                            "name": "get_weather",
                            "arguments": "{\"location\":\"Tokyo\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let result = provider().parse_text_result(raw, "gpt-4o").unwrap();
        let step = &result.steps[0];
        assert_eq!(step.tool_calls.len(), 1);
        assert_eq!(step.tool_calls[0].id, "c1");
        assert_eq!(step.tool_calls[0].input["location"], "Tokyo");
        // Single-shot semantics: calls are reported, never executed here.
        assert!(step.tool_results.is_empty());
    }

    #[test]
    fn test_parse_text_result_rejects_bad_tool_arguments() {
        let raw = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "c1",
                        "function": {"name": "t", "arguments": "{broken"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let err = provider().parse_text_result(raw, "gpt-4o").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_parse_text_result_no_choices() {
        let raw = json!({"choices": []});
        let err = provider().parse_text_result(raw, "gpt-4o").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_empty_tool_arguments_become_empty_object() {
        let raw = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "c1",
                        "function": {"name": "ping", "arguments": ""}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let result = provider().parse_text_result(raw, "gpt-4o").unwrap();
        assert_eq!(result.steps[0].tool_calls[0].input, json!({}));
    }

    #[test]
    fn test_schema_hint_prepended() {
        let schema = json!({"type": "object"});
        let request = OpenAiCompatibleProvider::with_schema_hint(
            Request::from_text("describe Tokyo"),
            &schema,
        );
        assert_eq!(request.messages.len(), 2);
        assert_eq!(
            request.messages[0].role,
            genai_kit_provider::message::Role::System
        );
        assert!(request.messages[0].text().contains("JSON Schema"));
    }

    #[test]
    fn test_null_schema_adds_no_hint() {
        let request =
            OpenAiCompatibleProvider::with_schema_hint(Request::from_text("x"), &Value::Null);
        assert_eq!(request.messages.len(), 1);
    }
}
