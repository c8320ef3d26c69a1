//! Result types returned by the provider contract.

/// Text and object result types.
pub mod result;
/// Step, tool-call, and tool-execution records.
pub mod step;
/// Token usage accounting.
pub mod usage;

pub use result::{ObjectResult, TextResult};
pub use step::{Step, ToolCall, ToolExecution};
pub use usage::Usage;
