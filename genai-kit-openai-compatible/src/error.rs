//! Mapping of vendor error responses into the shared taxonomy.
//!
//! The wire format is `{"error": {"message", "type", "code", "param"}}` with
//! a conventional HTTP status. Mapping precedence: the vendor error-code
//! string, then the vendor error-type string, then the HTTP status.

use genai_kit_provider::error::{ErrorKind, GenAiError};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Largest error payload preserved on the mapped error.
const MAX_RAW_BYTES: usize = 4096;

#[derive(Debug, Deserialize)]
struct WireErrorEnvelope {
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<Value>,
    #[allow(dead_code)]
    param: Option<String>,
}

fn kind_from_code(code: &str) -> Option<ErrorKind> {
    match code {
        "context_length_exceeded" | "max_tokens_exceeded" | "string_above_max_length" => {
            Some(ErrorKind::ContextLengthExceeded)
        }
        "rate_limit_exceeded" => Some(ErrorKind::RateLimited),
        "insufficient_quota" | "billing_hard_limit_reached" => Some(ErrorKind::InsufficientQuota),
        "content_filter" | "content_policy_violation" => Some(ErrorKind::ContentFiltered),
        "model_not_found" => Some(ErrorKind::NotFound),
        "invalid_api_key" | "account_deactivated" => Some(ErrorKind::Unauthorized),
        _ => None,
    }
}

fn kind_from_type(error_type: &str) -> Option<ErrorKind> {
    match error_type {
        "invalid_request_error" => Some(ErrorKind::InvalidRequest),
        "authentication_error" => Some(ErrorKind::Unauthorized),
        "permission_error" | "permission_denied_error" => Some(ErrorKind::Forbidden),
        "not_found_error" => Some(ErrorKind::NotFound),
        "rate_limit_error" | "requests" | "tokens" => Some(ErrorKind::RateLimited),
        "overloaded_error" => Some(ErrorKind::Overloaded),
        "insufficient_quota" => Some(ErrorKind::InsufficientQuota),
        "server_error" | "api_error" => Some(ErrorKind::Internal),
        _ => None,
    }
}

/// Maps a non-successful HTTP response into the taxonomy.
pub(crate) fn map_error_response(
    provider: &str,
    model: Option<&str>,
    status: u16,
    retry_after: Option<Duration>,
    body: &str,
) -> GenAiError {
    let parsed: Option<WireError> = serde_json::from_str::<WireErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error);

    let kind = parsed.as_ref().and_then(|e| {
        e.code
            .as_ref()
            .and_then(Value::as_str)
            .and_then(kind_from_code)
            .or_else(|| {
                e.error_type
                    .as_deref()
                    .and_then(kind_from_type)
            })
    });

    let message = parsed
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("request failed with status {status}"));

    let mut error = match kind {
        Some(kind) => GenAiError::new(kind, message).with_status_code(status),
        None => GenAiError::from_status(status, message),
    };
    error = error.with_provider(provider);
    if let Some(model) = model {
        error = error.with_model(model);
    }
    if let Some(retry_after) = retry_after {
        error = error.with_retry_after(retry_after);
    }
    let raw = truncate(body, MAX_RAW_BYTES);
    error.with_raw(Value::String(raw))
}

/// Parses a `Retry-After` header value given in seconds.
pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_takes_precedence_over_type_and_status() {
        let body = r#"{"error": {"message": "too long", "type": "invalid_request_error", "code": "context_length_exceeded"}}"#;
        let error = map_error_response("openai", Some("gpt-4o"), 400, None, body);
        assert_eq!(error.kind, ErrorKind::ContextLengthExceeded);
        assert_eq!(error.message, "too long");
        assert_eq!(error.status_code, Some(400));
        assert_eq!(error.provider.as_deref(), Some("openai"));
        assert_eq!(error.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_type_used_when_code_unknown() {
        let body = r#"{"error": {"message": "nope", "type": "authentication_error", "code": "weird_new_code"}}"#;
        let error = map_error_response("openai", None, 400, None, body);
        assert_eq!(error.kind, ErrorKind::Unauthorized);
    }

    #[test]
    fn test_status_used_when_body_is_not_json() {
        let error = map_error_response("openai", None, 503, None, "<html>bad gateway</html>");
        assert_eq!(error.kind, ErrorKind::ProviderUnavailable);
        assert!(error.is_transient());
    }

    #[test]
    fn test_retry_after_attached() {
        let error = map_error_response(
            "openai",
            None,
            429,
            Some(Duration::from_secs(2)),
            r#"{"error": {"message": "slow down", "type": "rate_limit_error"}}"#,
        );
        assert_eq!(error.kind, ErrorKind::RateLimited);
        assert_eq!(error.retry_after(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(" 10 "), Some(Duration::from_secs(10)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_raw_payload_is_bounded() {
        let body = "x".repeat(10_000);
        let error = map_error_response("openai", None, 500, None, &body);
        match error.raw {
            Some(Value::String(raw)) => assert_eq!(raw.len(), MAX_RAW_BYTES),
            other => panic!("expected raw string, got {other:?}"),
        }
    }

    #[test]
    fn test_numeric_code_falls_through_to_type() {
        let body = r#"{"error": {"message": "x", "type": "overloaded_error", "code": 529}}"#;
        let error = map_error_response("openai", None, 529, None, body);
        assert_eq!(error.kind, ErrorKind::Overloaded);
    }
}
