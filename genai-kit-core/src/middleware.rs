//! Composable middleware wrapping the provider contract.
//!
//! A middleware is a function from provider to provider. Layers are
//! transparent: a wrapped provider satisfies the same four-operation
//! contract, so retry, rate limiting, and safety can be stacked in any
//! order and combined with the agentic runner.

/// Token-bucket rate limiting.
pub mod rate_limit;
/// Retry with exponential backoff and jitter.
pub mod retry;
/// Content redaction and blocking.
pub mod safety;

pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use retry::{Retry, RetryConfig};
pub use safety::{Safety, SafetyConfig};

use genai_kit_provider::provider::Provider;
use std::sync::Arc;

/// A provider-to-provider transformation.
pub type Middleware = Box<dyn Fn(Arc<dyn Provider>) -> Arc<dyn Provider> + Send + Sync>;

/// Composes middlewares around a provider.
///
/// `chain(p, vec![m1, m2, m3])` produces `m1(m2(m3(p)))`: the first
/// middleware is the outermost layer and observes requests first and
/// responses last.
///
/// # Example
///
/// ```ignore
/// use genai_kit_core::middleware::{chain, RetryConfig, SafetyConfig};
///
/// let provider = chain(adapter, vec![
///     RetryConfig::default().into_middleware(),
///     SafetyConfig::default().into_middleware(),
/// ]);
/// ```
pub fn chain(provider: Arc<dyn Provider>, middlewares: Vec<Middleware>) -> Arc<dyn Provider> {
    middlewares
        .into_iter()
        .rev()
        .fold(provider, |inner, middleware| middleware(inner))
}
