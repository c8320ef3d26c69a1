//! Normalized streaming: events, the bounded event queue, and stream types.

/// The normalized event vocabulary.
pub mod event;
/// Structured-output streaming.
pub mod object_stream;
/// Text streaming over a bounded event queue.
pub mod text_stream;

pub use event::{Event, SafetyAction};
pub use object_stream::ObjectStream;
pub use text_stream::{DEFAULT_EVENT_CAPACITY, EventSender, TextStream};
