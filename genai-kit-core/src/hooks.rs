//! Observability hooks for requests, steps, tools, and stream events.

use genai_kit_provider::response::{Step, ToolExecution};
use genai_kit_provider::stream::{Event, TextStream};
use genai_kit_provider::stream::text_stream::DEFAULT_EVENT_CAPACITY;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// Structured callbacks invoked at request, step, tool, and stream
/// boundaries.
///
/// All methods have no-op defaults; implementations override only what they
/// observe. Hooks must not block: they run inline on the calling task.
pub trait Hooks: Send + Sync {
    /// A request entered the runner or a wrapped provider.
    fn on_request(&self, _provider: &str, _operation: &str) {}

    /// A step completed (inference plus any tool fan-out).
    fn on_step(&self, _step: &Step) {}

    /// A tool is about to execute.
    fn on_tool_call(&self, _tool_name: &str, _call_id: &str) {}

    /// A tool finished executing.
    fn on_tool_result(&self, _execution: &ToolExecution) {}

    /// A stream event passed through an observed stream.
    fn on_stream_event(&self, _event: &Event) {}

    /// The runner hit its safety ceiling and truncated the loop.
    fn on_truncated(&self, _steps: usize) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl Hooks for NoopHooks {}

/// Hooks that emit debug-level log records.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHooks;

impl Hooks for LogHooks {
    fn on_request(&self, provider: &str, operation: &str) {
        log::debug!("request provider={provider} operation={operation}");
    }

    fn on_step(&self, step: &Step) {
        log::debug!(
            "step number={} tool_calls={}",
            step.step_number,
            step.tool_calls.len()
        );
    }

    fn on_tool_call(&self, tool_name: &str, call_id: &str) {
        log::debug!("tool call name={tool_name} id={call_id}");
    }

    fn on_tool_result(&self, execution: &ToolExecution) {
        log::debug!(
            "tool result name={} id={} error={}",
            execution.name,
            execution.id,
            execution.is_error()
        );
    }

    fn on_truncated(&self, steps: usize) {
        log::warn!("runner truncated after {steps} steps");
    }
}

static DEFAULT_HOOKS: OnceLock<Arc<dyn Hooks>> = OnceLock::new();

/// Installs the process-wide default hooks.
///
/// Returns `false` if a default was already installed.
pub fn set_default_hooks(hooks: Arc<dyn Hooks>) -> bool {
    DEFAULT_HOOKS.set(hooks).is_ok()
}

/// The process-wide default hooks (no-op unless installed).
pub fn default_hooks() -> Arc<dyn Hooks> {
    DEFAULT_HOOKS
        .get()
        .cloned()
        .unwrap_or_else(|| Arc::new(NoopHooks))
}

/// Forwards a stream through the given hooks.
///
/// Each event is reported via [`Hooks::on_stream_event`] before being
/// re-emitted. Closing the returned stream closes the inner one.
pub fn observe_stream(mut stream: TextStream, hooks: Arc<dyn Hooks>) -> TextStream {
    let cancel = CancellationToken::new();
    let (mut sender, observed) = TextStream::channel(DEFAULT_EVENT_CAPACITY, cancel.clone());

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    stream.close();
                    break;
                }
                event = stream.next() => match event {
                    Some(event) => {
                        hooks.on_stream_event(&event);
                        let terminal = event.is_terminal();
                        sender.send(event);
                        if terminal {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    });

    observed
}
