//! Provider contract and normalized types for genai-kit.
//!
//! This crate defines the wire-independent surface every model backend
//! implements: the normalized conversation model, the request/response
//! shapes, the streaming event schema, the error taxonomy, and the
//! [`Provider`] trait with its four operations (`generate_text`,
//! `stream_text`, `generate_object`, `stream_object`).
//!
//! Adapters map these types to vendor HTTP APIs; the core crate layers the
//! agentic runner, middleware, and prompt tooling on top of the same
//! contract.
//!
//! # Module Organization
//!
//! - [`error`]: The closed error taxonomy with transient classification
//! - [`message`]: Roles, multimodal parts, and blob references
//! - [`request`]: The normalized request and tool-choice strategies
//! - [`response`]: Usage, steps, and text/object results
//! - [`stream`]: The event vocabulary and backpressured stream types
//! - [`tool`]: The erased tool handle contract
//! - [`stop_condition`]: The stop-condition predicate for multi-step runs
//! - [`provider`]: The four-operation provider contract
//! - [`schema`]: JSON Schema validation for structured outputs

#![warn(missing_docs)]

/// The error taxonomy shared by every provider.
pub mod error;
/// The normalized conversation model.
pub mod message;
/// The four-operation provider contract.
pub mod provider;
/// The normalized request type.
pub mod request;
/// Result types returned by the contract.
pub mod response;
/// JSON Schema validation helpers.
pub mod schema;
/// Stop conditions for multi-step runs.
pub mod stop_condition;
/// Streaming events and stream types.
pub mod stream;
/// The tool handle contract.
pub mod tool;

pub use error::{ErrorKind, GenAiError};
pub use message::{BlobRef, ImageDetail, Message, Part, Role};
pub use provider::Provider;
pub use request::{Request, ToolChoice};
pub use response::{ObjectResult, Step, TextResult, ToolCall, ToolExecution, Usage};
pub use stop_condition::StopCondition;
pub use stream::{
    DEFAULT_EVENT_CAPACITY, Event, EventSender, ObjectStream, SafetyAction, TextStream,
};
pub use tool::{Tool, ToolContext};
