//! Chat-completion support: request conversion, response parsing, and SSE
//! decoding.

pub(crate) mod api_types;
pub(crate) mod convert;
/// The provider implementation.
pub mod model;
pub(crate) mod sse;

pub use model::OpenAiCompatibleProvider;
