use genai_kit_provider::error::{ErrorKind, GenAiError};
use std::collections::HashMap;

/// Configuration for an OpenAI-compatible provider.
#[derive(Clone, Debug)]
pub struct OpenAiCompatibleSettings {
    /// Provider name, used for logging, error context, and routing
    /// `provider_options` (e.g. "openai", "groq", "custom").
    pub provider: String,
    /// Base URL of the API, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token sent as `Authorization` header.
    pub api_key: Option<String>,
    /// Model used when a request does not name one.
    pub default_model: Option<String>,
    /// Extra headers attached to every request.
    pub headers: HashMap<String, String>,
}

impl OpenAiCompatibleSettings {
    /// Creates settings with a provider name and base URL.
    pub fn new(provider: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            base_url: base_url.into(),
            api_key: None,
            default_model: None,
            headers: HashMap::new(),
        }
    }

    /// Creates settings with the API key loaded from `<ENV_PREFIX>_API_KEY`.
    pub fn from_env(
        provider: impl Into<String>,
        env_prefix: &str,
        base_url: impl Into<String>,
    ) -> Result<Self, GenAiError> {
        let variable = format!("{env_prefix}_API_KEY");
        let api_key = std::env::var(&variable).map_err(|_| {
            GenAiError::new(
                ErrorKind::Unauthorized,
                format!("missing {variable} environment variable"),
            )
        })?;
        Ok(Self::new(provider, base_url).with_api_key(api_key))
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the default model.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Adds a header to every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The chat-completions endpoint for these settings.
    pub(crate) fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_completions_url_handles_trailing_slash() {
        let settings = OpenAiCompatibleSettings::new("openai", "https://api.openai.com/v1/");
        assert_eq!(
            settings.chat_completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_from_env_missing_key() {
        let err = OpenAiCompatibleSettings::from_env(
            "custom",
            "GENAI_KIT_TEST_NO_SUCH_PREFIX",
            "https://example.com/v1",
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[test]
    fn test_builder_chain() {
        let settings = OpenAiCompatibleSettings::new("groq", "https://api.groq.com/openai/v1")
            .with_api_key("gsk-test")
            .with_default_model("llama-3.3-70b")
            .with_header("x-custom", "1");
        assert_eq!(settings.api_key.as_deref(), Some("gsk-test"));
        assert_eq!(settings.default_model.as_deref(), Some("llama-3.3-70b"));
        assert_eq!(settings.headers.len(), 1);
    }
}
