//! Core functionality for genai-kit: the agentic runner, the middleware
//! chain, and the prompt registry, all layered over the provider contract.
//!
//! # Architecture
//!
//! Everything in this crate wraps or feeds the four-operation
//! [`Provider`](genai_kit_provider::Provider) contract:
//!
//! - **Runner**: a bounded multi-step loop that interleaves inference with
//!   concurrent tool execution, driven by composable stop conditions
//! - **Middleware**: retry, rate limiting, and content safety as
//!   provider-to-provider transformations
//! - **Tools**: closure-backed and typed (schema-derived) tool registration
//! - **Prompts**: versioned templates with content-addressed fingerprints
//! - **Hooks**: structured observability callbacks with a process default
//!
//! # Example
//!
//! ```ignore
//! use genai_kit_core::middleware::{chain, RetryConfig, SafetyConfig};
//! use genai_kit_core::runner::{Runner, no_more_tools};
//! use genai_kit_provider::Request;
//! use std::sync::Arc;
//!
//! let provider = chain(adapter, vec![
//!     RetryConfig::default().into_middleware(),
//!     SafetyConfig::default().redact_email_addresses().into_middleware(),
//! ]);
//! let runner = Runner::new(provider);
//!
//! let request = Request::from_text("What's the weather in Tokyo and London?")
//!     .with_tool(weather_tool)
//!     .with_stop_when(no_more_tools());
//!
//! let result = runner.generate_text(request).await?;
//! println!("{} ({} steps)", result.text, result.steps.len());
//! ```

#![warn(missing_docs)]

/// Observability hooks.
pub mod hooks;
/// Composable middleware: retry, rate limit, safety.
pub mod middleware;
/// Typed structured-output helpers.
pub mod object;
/// Versioned prompt templates.
pub mod prompts;
/// The agentic runner and stop conditions.
pub mod runner;
/// Tool registration helpers.
pub mod tool;

pub use hooks::{Hooks, LogHooks, NoopHooks, default_hooks, set_default_hooks};
pub use middleware::{
    Middleware, RateLimitConfig, RateLimiter, Retry, RetryConfig, Safety, SafetyConfig, chain,
};
pub use object::{generate_object_as, schema_for};
pub use prompts::{PromptError, PromptRegistry, Template, TemplateId, TemplateSource};
pub use runner::{
    Runner, combine_all, combine_any, max_steps, no_more_tools, until_tool_seen,
};
pub use tool::{FnTool, TypedTool};
