use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The closed set of error kinds a provider can surface.
///
/// Every backend maps its vendor-specific error responses into this taxonomy,
/// so callers can dispatch on kind instead of matching message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request was malformed or contained invalid parameters.
    InvalidRequest,
    /// Authentication failed (missing or invalid credentials).
    Unauthorized,
    /// The credentials are valid but do not grant access to the resource.
    Forbidden,
    /// The requested model or resource does not exist.
    NotFound,
    /// The caller exceeded a rate limit.
    RateLimited,
    /// The prompt does not fit in the model's context window.
    ContextLengthExceeded,
    /// The request was blocked by a safety system before reaching the model.
    SafetyBlocked,
    /// The response was removed or truncated by the provider's content filter.
    ContentFiltered,
    /// The request timed out or was cancelled.
    Timeout,
    /// A network-level failure (DNS, connect, broken pipe).
    Network,
    /// The provider is temporarily unavailable.
    ProviderUnavailable,
    /// The provider is overloaded and shedding load.
    Overloaded,
    /// An internal provider error.
    Internal,
    /// The requested functionality is not supported by the provider or model.
    Unsupported,
    /// The account has no remaining quota or credit.
    InsufficientQuota,
}

impl ErrorKind {
    /// Stable snake_case name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::ContextLengthExceeded => "context_length_exceeded",
            Self::SafetyBlocked => "safety_blocked",
            Self::ContentFiltered => "content_filtered",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::Overloaded => "overloaded",
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
            Self::InsufficientQuota => "insufficient_quota",
        }
    }

    /// Whether errors of this kind are transient by default.
    fn default_temporary(self) -> bool {
        matches!(
            self,
            Self::RateLimited
                | Self::Overloaded
                | Self::Timeout
                | Self::Network
                | Self::ProviderUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned by a provider or by infrastructure wrapping one.
///
/// Carries the taxonomy [`ErrorKind`] plus whatever context the failing layer
/// had: the provider and model involved, the HTTP status, a server-suggested
/// retry delay, and the raw payload for debugging.
///
/// # Examples
///
/// ```
/// use genai_kit_provider::error::{ErrorKind, GenAiError};
/// use std::time::Duration;
///
/// let err = GenAiError::new(ErrorKind::RateLimited, "too many requests")
///     .with_provider("openai")
///     .with_status_code(429)
///     .with_retry_after(Duration::from_secs(2));
///
/// assert!(err.is_rate_limited());
/// assert!(err.is_transient());
/// assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
/// ```
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct GenAiError {
    /// The taxonomy kind.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Name of the provider that produced the error, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Model involved in the failing call, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// HTTP status code, if the error came from an HTTP response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Server-suggested delay before retrying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<Duration>,
    /// Whether the error is expected to clear on retry.
    pub temporary: bool,
    /// Raw provider payload, bounded by the adapter that captured it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl GenAiError {
    /// Creates an error of the given kind.
    ///
    /// The `temporary` flag is seeded from the kind: rate-limited, overloaded,
    /// timeout, network, and provider-unavailable errors start transient.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider: None,
            model: None,
            status_code: None,
            retry_after: None,
            temporary: kind.default_temporary(),
            raw: None,
        }
    }

    /// Maps an HTTP status code to an error of the matching kind.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            400 => ErrorKind::InvalidRequest,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::Timeout,
            413 => ErrorKind::ContextLengthExceeded,
            429 => ErrorKind::RateLimited,
            500 => ErrorKind::Internal,
            502 | 503 => ErrorKind::ProviderUnavailable,
            504 => ErrorKind::Timeout,
            529 => ErrorKind::Overloaded,
            _ => ErrorKind::Internal,
        };
        Self::new(kind, message).with_status_code(status)
    }

    /// An error representing caller-initiated cancellation.
    ///
    /// The taxonomy has no dedicated cancellation kind; cancellations surface
    /// as timeouts so they stay in the transient family.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Timeout, "request cancelled")
    }

    /// Attaches the provider name.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attaches the model id.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Attaches the HTTP status code.
    ///
    /// Internal errors from 502/504 responses are marked transient.
    pub fn with_status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        if self.kind == ErrorKind::Internal && matches!(status, 502 | 504) {
            self.temporary = true;
        }
        self
    }

    /// Attaches a server-suggested retry delay.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Overrides the transient flag.
    pub fn with_temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    /// Attaches the raw provider payload.
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Whether the error is expected to clear on retry.
    pub fn is_transient(&self) -> bool {
        self.temporary
    }

    /// Whether the error is a rate limit.
    pub fn is_rate_limited(&self) -> bool {
        self.kind == ErrorKind::RateLimited
    }

    /// Whether the error is an authentication or authorization failure.
    pub fn is_auth(&self) -> bool {
        matches!(self.kind, ErrorKind::Unauthorized | ErrorKind::Forbidden)
    }

    /// Whether the error was caused by a malformed request.
    pub fn is_bad_request(&self) -> bool {
        self.kind == ErrorKind::InvalidRequest
    }

    /// Whether the prompt exceeded the model's context window.
    pub fn is_context_length(&self) -> bool {
        self.kind == ErrorKind::ContextLengthExceeded
    }

    /// Whether the error came from a safety system or content filter.
    pub fn is_safety(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::SafetyBlocked | ErrorKind::ContentFiltered
        )
    }

    /// Whether the error is a timeout.
    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// The server-suggested retry delay, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::RateLimited.to_string(), "rate_limited");
        assert_eq!(
            ErrorKind::ContextLengthExceeded.to_string(),
            "context_length_exceeded"
        );
    }

    #[test]
    fn test_default_temporary_seeded_from_kind() {
        assert!(GenAiError::new(ErrorKind::RateLimited, "x").is_transient());
        assert!(GenAiError::new(ErrorKind::Overloaded, "x").is_transient());
        assert!(GenAiError::new(ErrorKind::Network, "x").is_transient());
        assert!(!GenAiError::new(ErrorKind::InvalidRequest, "x").is_transient());
        assert!(!GenAiError::new(ErrorKind::Unauthorized, "x").is_transient());
    }

    #[test]
    fn test_from_status_mapping() {
        assert_eq!(
            GenAiError::from_status(401, "x").kind,
            ErrorKind::Unauthorized
        );
        assert_eq!(
            GenAiError::from_status(429, "x").kind,
            ErrorKind::RateLimited
        );
        assert_eq!(
            GenAiError::from_status(503, "x").kind,
            ErrorKind::ProviderUnavailable
        );
        assert_eq!(GenAiError::from_status(504, "x").kind, ErrorKind::Timeout);
        assert_eq!(GenAiError::from_status(500, "x").kind, ErrorKind::Internal);
        assert_eq!(GenAiError::from_status(418, "x").kind, ErrorKind::Internal);
    }

    #[test]
    fn test_internal_502_is_transient() {
        let err = GenAiError::new(ErrorKind::Internal, "bad gateway").with_status_code(502);
        assert!(err.is_transient());

        let err = GenAiError::new(ErrorKind::Internal, "server error").with_status_code(500);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_classification_helpers() {
        let err = GenAiError::new(ErrorKind::Forbidden, "no access");
        assert!(err.is_auth());
        assert!(!err.is_rate_limited());

        let err = GenAiError::new(ErrorKind::ContentFiltered, "filtered");
        assert!(err.is_safety());

        let err = GenAiError::new(ErrorKind::SafetyBlocked, "blocked");
        assert!(err.is_safety());
    }

    #[test]
    fn test_retry_after_round_trip() {
        let err = GenAiError::new(ErrorKind::RateLimited, "slow down")
            .with_retry_after(Duration::from_millis(1500));
        assert_eq!(err.retry_after(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = GenAiError::new(ErrorKind::NotFound, "no such model").with_provider("openai");
        assert_eq!(err.to_string(), "not_found: no such model");
    }

    #[test]
    fn test_cancelled_is_transient_timeout() {
        let err = GenAiError::cancelled();
        assert!(err.is_timeout());
        assert!(err.is_transient());
    }
}
