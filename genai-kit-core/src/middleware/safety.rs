use super::Middleware;
use async_trait::async_trait;
use genai_kit_provider::error::{ErrorKind, GenAiError};
use genai_kit_provider::message::{Message, Part};
use genai_kit_provider::provider::Provider;
use genai_kit_provider::request::Request;
use genai_kit_provider::response::{ObjectResult, TextResult};
use genai_kit_provider::stream::text_stream::DEFAULT_EVENT_CAPACITY;
use genai_kit_provider::stream::{Event, ObjectStream, SafetyAction, TextStream};
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const EMAIL_PATTERN: &str = r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}";

/// Callback invoked when content is blocked: `(reason, content)`.
pub type OnBlocked = Arc<dyn Fn(&str, &str) + Send + Sync>;
/// Callback invoked when content is redacted: `(pattern, match count)`.
pub type OnRedacted = Arc<dyn Fn(&str, usize) + Send + Sync>;

/// Configuration for the safety middleware.
///
/// Applied to request messages and response text. Non-text parts pass
/// through untouched, and structured-output responses are treated as data
/// rather than prose (no redaction).
#[derive(Clone)]
pub struct SafetyConfig {
    /// Patterns whose matches are replaced with `redact_replacement`.
    pub redact_patterns: Vec<Regex>,
    /// Replacement for redacted matches.
    pub redact_replacement: String,
    /// Patterns whose matches block the content outright.
    pub block_patterns: Vec<Regex>,
    /// Case-insensitive substrings that block the content. Stored lowercased.
    pub block_words: Vec<String>,
    /// Maximum allowed content length in bytes.
    pub max_content_length: Option<usize>,
    /// Terminate streams when an upstream `Safety` event carries
    /// `action: block`.
    pub stop_on_safety_event: bool,
    /// Observability callback for blocked content. Must not block.
    pub on_blocked: Option<OnBlocked>,
    /// Observability callback for redactions. Must not block.
    pub on_redacted: Option<OnRedacted>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            redact_patterns: Vec::new(),
            redact_replacement: "[REDACTED]".to_string(),
            block_patterns: Vec::new(),
            block_words: Vec::new(),
            max_content_length: None,
            stop_on_safety_event: false,
            on_blocked: None,
            on_redacted: None,
        }
    }
}

impl SafetyConfig {
    /// Adds a redaction pattern.
    pub fn with_redact_pattern(mut self, pattern: Regex) -> Self {
        self.redact_patterns.push(pattern);
        self
    }

    /// Adds an email redaction pattern (case-insensitive).
    pub fn redact_email_addresses(self) -> Self {
        let pattern = Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex");
        self.with_redact_pattern(pattern)
    }

    /// Overrides the redaction replacement text.
    pub fn with_redact_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.redact_replacement = replacement.into();
        self
    }

    /// Adds a blocking pattern.
    pub fn with_block_pattern(mut self, pattern: Regex) -> Self {
        self.block_patterns.push(pattern);
        self
    }

    /// Adds a blocked word (matched case-insensitively as a substring).
    pub fn with_block_word(mut self, word: impl Into<String>) -> Self {
        self.block_words.push(word.into().to_lowercase());
        self
    }

    /// Caps the allowed content length in bytes.
    pub fn with_max_content_length(mut self, max: usize) -> Self {
        self.max_content_length = Some(max);
        self
    }

    /// Terminates streams on upstream blocking safety events.
    pub fn with_stop_on_safety_event(mut self, stop: bool) -> Self {
        self.stop_on_safety_event = stop;
        self
    }

    /// Installs the blocked-content callback.
    pub fn with_on_blocked(mut self, callback: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_blocked = Some(Arc::new(callback));
        self
    }

    /// Installs the redaction callback.
    pub fn with_on_redacted(
        mut self,
        callback: impl Fn(&str, usize) + Send + Sync + 'static,
    ) -> Self {
        self.on_redacted = Some(Arc::new(callback));
        self
    }

    /// Wraps a provider with this configuration.
    pub fn wrap(self, inner: Arc<dyn Provider>) -> Safety {
        Safety {
            inner,
            config: Arc::new(self),
        }
    }

    /// Turns this configuration into a chainable middleware.
    pub fn into_middleware(self) -> Middleware {
        let config = Arc::new(self);
        Box::new(move |inner| {
            Arc::new(Safety {
                inner,
                config: Arc::clone(&config),
            })
        })
    }

    /// Applies the redaction patterns, firing `on_redacted` per pattern.
    pub fn redact_text(&self, text: &str) -> String {
        let mut current = text.to_string();
        for pattern in &self.redact_patterns {
            let count = pattern.find_iter(&current).count();
            if count > 0 {
                current = pattern
                    .replace_all(&current, self.redact_replacement.as_str())
                    .into_owned();
                if let Some(callback) = &self.on_redacted {
                    callback(pattern.as_str(), count);
                }
            }
        }
        current
    }

    /// Checks the block rules, returning the violation when one matches.
    pub fn check_text(&self, text: &str) -> Option<String> {
        if let Some(max) = self.max_content_length {
            if text.len() > max {
                return Some(format!("content length {} exceeds limit {max}", text.len()));
            }
        }
        for pattern in &self.block_patterns {
            if pattern.is_match(text) {
                return Some(format!("content matches blocked pattern {}", pattern.as_str()));
            }
        }
        if !self.block_words.is_empty() {
            let lowered = text.to_lowercase();
            for word in &self.block_words {
                if lowered.contains(word) {
                    return Some(format!("content contains blocked word {word}"));
                }
            }
        }
        None
    }

    fn notify_blocked(&self, reason: &str, content: &str) {
        if let Some(callback) = &self.on_blocked {
            callback(reason, content);
        }
    }

    fn blocked_error(&self, reason: &str, content: &str) -> GenAiError {
        self.notify_blocked(reason, content);
        GenAiError::new(ErrorKind::SafetyBlocked, format!("content blocked: {reason}"))
    }
}

/// Redacts and blocks content flowing through the provider contract.
pub struct Safety {
    inner: Arc<dyn Provider>,
    config: Arc<SafetyConfig>,
}

impl Safety {
    /// Clones the request with block checks and redaction applied to every
    /// text part. Non-text parts pass through untouched.
    fn sanitize_request(&self, request: Request) -> Result<Request, GenAiError> {
        let mut request = request;
        let mut messages = Vec::with_capacity(request.messages.len());
        for message in request.messages {
            messages.push(self.sanitize_message(message)?);
        }
        request.messages = messages;
        Ok(request)
    }

    fn sanitize_message(&self, message: Message) -> Result<Message, GenAiError> {
        let mut message = message;
        let mut parts = Vec::with_capacity(message.parts.len());
        for part in message.parts {
            match part {
                Part::Text { text } => {
                    if let Some(reason) = self.config.check_text(&text) {
                        return Err(self.config.blocked_error(&reason, &text));
                    }
                    parts.push(Part::text(self.config.redact_text(&text)));
                }
                other => parts.push(other),
            }
        }
        message.parts = parts;
        Ok(message)
    }

    fn sanitize_result(&self, result: TextResult) -> Result<TextResult, GenAiError> {
        let mut result = result;
        if let Some(reason) = self.config.check_text(&result.text) {
            return Err(self.config.blocked_error(&reason, &result.text));
        }
        result.text = self.config.redact_text(&result.text);
        for step in &mut result.steps {
            step.text = self.config.redact_text(&step.text);
        }
        Ok(result)
    }

    fn rewrite_stream(&self, mut inner: TextStream) -> TextStream {
        let cancel = CancellationToken::new();
        let (mut sender, rewritten) = TextStream::channel(DEFAULT_EVENT_CAPACITY, cancel.clone());
        let config = Arc::clone(&self.config);

        tokio::spawn(async move {
            let mut accumulated = String::new();
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        inner.close();
                        break;
                    }
                    event = inner.next() => {
                        let Some(event) = event else { break };
                        match event {
                            Event::TextDelta { text_delta } => {
                                accumulated.push_str(&text_delta);
                                sender.send(Event::text_delta(config.redact_text(&text_delta)));
                            }
                            Event::Safety {
                                category,
                                action,
                                score,
                            } if config.stop_on_safety_event && action == SafetyAction::Block => {
                                sender.send(Event::Safety {
                                    category,
                                    action,
                                    score,
                                });
                                sender.send(Event::error(GenAiError::new(
                                    ErrorKind::SafetyBlocked,
                                    "stream terminated by blocking safety event",
                                )));
                                inner.close();
                                break;
                            }
                            Event::Finish { usage } => {
                                match config.check_text(&accumulated) {
                                    Some(reason) => {
                                        config.notify_blocked(&reason, &accumulated);
                                        sender.send(Event::error(GenAiError::new(
                                            ErrorKind::SafetyBlocked,
                                            format!("content blocked: {reason}"),
                                        )));
                                    }
                                    None => sender.send(Event::finish(usage)),
                                }
                                break;
                            }
                            other => {
                                let terminal = other.is_terminal();
                                sender.send(other);
                                if terminal {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        });

        rewritten
    }
}

#[async_trait]
impl Provider for Safety {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate_text(&self, request: Request) -> Result<TextResult, GenAiError> {
        let request = self.sanitize_request(request)?;
        let result = self.inner.generate_text(request).await?;
        self.sanitize_result(result)
    }

    async fn stream_text(&self, request: Request) -> Result<TextStream, GenAiError> {
        let request = self.sanitize_request(request)?;
        let stream = self.inner.stream_text(request).await?;
        Ok(self.rewrite_stream(stream))
    }

    async fn generate_object(
        &self,
        request: Request,
        schema: Value,
    ) -> Result<ObjectResult<Value>, GenAiError> {
        // Structured outputs are data, not prose: request-side checks only.
        let request = self.sanitize_request(request)?;
        self.inner.generate_object(request, schema).await
    }

    async fn stream_object(
        &self,
        request: Request,
        schema: Value,
    ) -> Result<ObjectStream, GenAiError> {
        let request = self.sanitize_request(request)?;
        self.inner.stream_object(request, schema).await
    }
}
