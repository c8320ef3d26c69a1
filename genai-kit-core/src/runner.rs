//! The agentic runner: a bounded multi-step tool-calling loop.

/// Built-in stop conditions and combinators.
pub mod stop;

pub use stop::{
    Combine, CombineMode, MaxSteps, NoMoreTools, UntilToolSeen, combine_all, combine_any,
    max_steps, no_more_tools, until_tool_seen,
};

use crate::hooks::{Hooks, default_hooks, observe_stream};
use async_trait::async_trait;
use futures::future::join_all;
use genai_kit_provider::error::GenAiError;
use genai_kit_provider::message::Message;
use genai_kit_provider::provider::Provider;
use genai_kit_provider::request::Request;
use genai_kit_provider::response::{ObjectResult, Step, TextResult, ToolCall, ToolExecution, Usage};
use genai_kit_provider::stream::{ObjectStream, TextStream};
use genai_kit_provider::tool::ToolContext;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Process-wide ceiling on steps per request, applied even when a
/// user-provided stop condition would run longer.
pub const DEFAULT_MAX_STEPS_CEILING: usize = 10;

/// Drives multi-step tool-using conversations over an inner provider.
///
/// The runner implements [`Provider`] itself, so it composes with the
/// middleware chain like any other layer. Requests without a `stop_when`
/// condition pass straight through (single-shot semantics); requests with
/// one enter the loop: infer, evaluate the stop condition, dispatch any tool
/// calls concurrently, append the results to the working conversation, and
/// re-enter inference until a stop condition fires, the model stops calling
/// tools, or the safety ceiling is hit.
///
/// # Example
///
/// ```ignore
/// use genai_kit_core::runner::{Runner, no_more_tools};
/// use genai_kit_provider::Request;
///
/// let runner = Runner::new(adapter);
/// let request = Request::from_text("What's the weather in Tokyo and London?")
///     .with_tool(weather_tool)
///     .with_stop_when(no_more_tools());
///
/// let result = runner.generate_text(request).await?;
/// assert_eq!(result.text, result.steps.last().unwrap().text);
/// ```
pub struct Runner {
    inner: Arc<dyn Provider>,
    max_steps_ceiling: usize,
    hooks: Arc<dyn Hooks>,
}

impl Runner {
    /// Wraps an inner provider with the default ceiling and hooks.
    pub fn new(inner: Arc<dyn Provider>) -> Self {
        Self {
            inner,
            max_steps_ceiling: DEFAULT_MAX_STEPS_CEILING,
            hooks: default_hooks(),
        }
    }

    /// Overrides the safety ceiling on steps per request.
    pub fn with_max_steps_ceiling(mut self, ceiling: usize) -> Self {
        self.max_steps_ceiling = ceiling.max(1);
        self
    }

    /// Overrides the observability hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn Hooks>) -> Self {
        self.hooks = hooks;
        self
    }

    async fn run_loop(
        &self,
        request: Request,
        stop_when: Arc<dyn genai_kit_provider::stop_condition::StopCondition>,
    ) -> Result<TextResult, GenAiError> {
        let cancellation = request.cancellation_token();
        let mut working = request.messages.clone();
        let mut steps: Vec<Step> = Vec::new();
        let mut usage = Usage::default();
        let mut raw: Option<Value> = None;

        loop {
            let mut single = request.clone();
            single.stop_when = None;
            single.messages = working.clone();

            let result = self.inner.generate_text(single).await?;
            usage = usage.add(&result.usage);
            raw = result.raw;

            let step_number = steps.len() + 1;
            let mut step = match result.steps.into_iter().next_back() {
                Some(step) => step,
                None => Step::new(step_number, result.text),
            };
            step.step_number = step_number;

            working.push(
                Message::assistant(step.text.clone()).with_tool_calls(step.tool_calls.clone()),
            );

            self.hooks.on_step(&step);

            if stop_when.should_stop(step_number, &step) || !step.has_tool_calls() {
                steps.push(step);
                break;
            }

            if step_number >= self.max_steps_ceiling {
                log::warn!(
                    "step ceiling of {} reached, truncating run",
                    self.max_steps_ceiling
                );
                self.hooks.on_truncated(step_number);
                steps.push(step);
                break;
            }

            let executions = execute_tools(
                &step.tool_calls,
                &request,
                step_number,
                &working,
                &cancellation,
                &self.hooks,
            )
            .await;

            if cancellation.is_cancelled() {
                return Err(GenAiError::cancelled());
            }

            for execution in &executions {
                self.hooks.on_tool_result(execution);
                working.push(Message::tool(execution.id.clone(), &execution.payload()));
            }

            step.tool_results = executions;
            steps.push(step);
        }

        Ok(TextResult::from_steps(steps, usage, raw))
    }
}

/// Executes the tool calls of one step concurrently.
///
/// All calls run at once; the output vector is in call order regardless of
/// finish order. A missing tool or a failing tool becomes an error-payload
/// execution rather than a fatal error.
async fn execute_tools(
    calls: &[ToolCall],
    request: &Request,
    step_number: usize,
    messages: &[Message],
    cancellation: &CancellationToken,
    hooks: &Arc<dyn Hooks>,
) -> Vec<ToolExecution> {
    let snapshot = Arc::new(messages.to_vec());

    let futures: Vec<_> = calls
        .iter()
        .map(|call| {
            let tool = request.tool(&call.name).cloned();
            let cx = ToolContext::new(
                call.id.clone(),
                step_number,
                Arc::clone(&snapshot),
                cancellation.child_token(),
            );
            let call = call.clone();
            let hooks = Arc::clone(hooks);
            async move {
                let Some(tool) = tool else {
                    let message = format!("tool not found: {}", call.name);
                    return ToolExecution::failed(call.id, call.name, message);
                };
                hooks.on_tool_call(&call.name, &call.id);
                match tool.execute(call.input, cx).await {
                    Ok(value) => ToolExecution::succeeded(call.id, call.name, value),
                    Err(message) => ToolExecution::failed(call.id, call.name, message),
                }
            }
        })
        .collect();

    join_all(futures).await
}

#[async_trait]
impl Provider for Runner {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate_text(&self, request: Request) -> Result<TextResult, GenAiError> {
        self.hooks.on_request(self.inner.name(), "generate_text");
        match request.stop_when.clone() {
            Some(stop_when) => self.run_loop(request, stop_when).await,
            None => self.inner.generate_text(request).await,
        }
    }

    async fn stream_text(&self, request: Request) -> Result<TextStream, GenAiError> {
        self.hooks.on_request(self.inner.name(), "stream_text");
        let stream = self.inner.stream_text(request).await?;
        Ok(observe_stream(stream, Arc::clone(&self.hooks)))
    }

    async fn generate_object(
        &self,
        request: Request,
        schema: Value,
    ) -> Result<ObjectResult<Value>, GenAiError> {
        self.hooks.on_request(self.inner.name(), "generate_object");
        self.inner.generate_object(request, schema).await
    }

    async fn stream_object(
        &self,
        request: Request,
        schema: Value,
    ) -> Result<ObjectStream, GenAiError> {
        self.hooks.on_request(self.inner.name(), "stream_object");
        self.inner.stream_object(request, schema).await
    }
}
