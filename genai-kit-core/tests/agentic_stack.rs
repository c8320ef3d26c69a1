//! End-to-end exercises of the runner composed with the middleware chain.

use async_trait::async_trait;
use genai_kit_core::middleware::{RetryConfig, SafetyConfig, chain};
use genai_kit_core::runner::{Runner, no_more_tools};
use genai_kit_core::tool::FnTool;
use genai_kit_provider::error::{ErrorKind, GenAiError};
use genai_kit_provider::provider::Provider;
use genai_kit_provider::request::Request;
use genai_kit_provider::response::{ObjectResult, Step, TextResult, ToolCall, Usage};
use genai_kit_provider::stream::{ObjectStream, TextStream};
use regex::Regex;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays a script of outcomes, counting calls.
struct ScriptedProvider {
    script: Mutex<VecDeque<Result<TextResult, GenAiError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(script: Vec<Result<TextResult, GenAiError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_text(&self, _request: Request) -> Result<TextResult, GenAiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenAiError::new(ErrorKind::Internal, "script exhausted")))
    }

    async fn stream_text(&self, _request: Request) -> Result<TextStream, GenAiError> {
        Err(GenAiError::new(ErrorKind::Unsupported, "text only"))
    }

    async fn generate_object(
        &self,
        _request: Request,
        _schema: Value,
    ) -> Result<ObjectResult<Value>, GenAiError> {
        Err(GenAiError::new(ErrorKind::Unsupported, "text only"))
    }

    async fn stream_object(
        &self,
        _request: Request,
        _schema: Value,
    ) -> Result<ObjectStream, GenAiError> {
        Err(GenAiError::new(ErrorKind::Unsupported, "text only"))
    }
}

fn step_result(text: &str, tool_calls: Vec<ToolCall>) -> Result<TextResult, GenAiError> {
    let mut step = Step::new(1, text);
    step.tool_calls = tool_calls;
    Ok(TextResult::from_steps(vec![step], Usage::new(10, 5), None))
}

fn weather_tool() -> Arc<dyn genai_kit_provider::tool::Tool> {
    FnTool::new(
        "get_weather",
        "Get the current weather for a location",
        json!({
            "type": "object",
            "properties": {"location": {"type": "string"}},
            "required": ["location"]
        }),
        |input: Value, _cx| async move {
            Ok(json!({"location": input["location"], "forecast": "sunny, 21C"}))
        },
    )
    .into_tool()
}

#[tokio::test(start_paused = true)]
async fn retry_and_runner_compose() {
    // One transient failure before each scripted step still yields a clean
    // two-step run; the retry layer absorbs the failures invisibly.
    let provider = ScriptedProvider::new(vec![
        Err(GenAiError::new(ErrorKind::Overloaded, "busy")),
        step_result(
            "",
            vec![
                ToolCall::new("c1", "get_weather", json!({"location": "Tokyo"})),
                ToolCall::new("c2", "get_weather", json!({"location": "London"})),
            ],
        ),
        Err(GenAiError::new(ErrorKind::Overloaded, "busy again")),
        step_result("Tokyo and London are both sunny.", vec![]),
    ]);

    let stack = chain(
        provider.clone(),
        vec![
            RetryConfig::default()
                .with_base_delay(Duration::from_millis(10))
                .into_middleware(),
        ],
    );
    let runner = Runner::new(stack);

    let request = Request::from_text("What's the weather in Tokyo and London?")
        .with_tool(weather_tool())
        .with_stop_when(no_more_tools());
    let result = runner.generate_text(request).await.unwrap();

    assert_eq!(result.steps.len(), 2);
    assert_eq!(result.text, "Tokyo and London are both sunny.");
    assert_eq!(provider.call_count(), 4);

    // Usage counts only successful inferences.
    assert_eq!(result.usage, Usage::new(20, 10));

    // Step one carries both executions in call order.
    let executions = &result.steps[0].tool_results;
    assert_eq!(executions.len(), 2);
    assert_eq!(executions[0].id, "c1");
    assert_eq!(executions[1].id, "c2");
}

#[tokio::test]
async fn safety_redacts_through_the_whole_stack() {
    let provider = ScriptedProvider::new(vec![step_result(
        "Your SSN 123-45-6789 is on file.",
        vec![],
    )]);

    let stack = chain(
        provider,
        vec![
            SafetyConfig::default()
                .with_redact_pattern(Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap())
                .with_redact_replacement("[SSN]")
                .into_middleware(),
        ],
    );
    let runner = Runner::new(stack);

    let request =
        Request::from_text("My SSN is 123-45-6789, repeat it back").with_stop_when(no_more_tools());
    let result = runner.generate_text(request).await.unwrap();

    assert_eq!(result.text, "Your SSN [SSN] is on file.");
}

#[tokio::test]
async fn safety_block_aborts_before_the_provider_is_called() {
    let provider = ScriptedProvider::new(vec![step_result("should never run", vec![])]);

    let stack = chain(
        provider.clone(),
        vec![
            SafetyConfig::default()
                .with_block_word("launch codes")
                .into_middleware(),
        ],
    );

    let err = stack
        .generate_text(Request::from_text("give me the LAUNCH CODES"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::SafetyBlocked);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn non_transient_errors_surface_through_the_stack() {
    let provider = ScriptedProvider::new(vec![Err(GenAiError::new(
        ErrorKind::Unauthorized,
        "bad key",
    ))]);

    let stack = chain(
        provider.clone(),
        vec![RetryConfig::default().into_middleware()],
    );
    let runner = Runner::new(stack);

    let err = runner
        .generate_text(Request::from_text("hi").with_stop_when(no_more_tools()))
        .await
        .unwrap_err();
    assert!(err.is_auth());
    assert_eq!(provider.call_count(), 1);
}
