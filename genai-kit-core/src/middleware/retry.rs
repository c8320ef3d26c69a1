use super::Middleware;
use async_trait::async_trait;
use genai_kit_provider::error::GenAiError;
use genai_kit_provider::provider::Provider;
use genai_kit_provider::request::Request;
use genai_kit_provider::response::{ObjectResult, TextResult};
use genai_kit_provider::stream::{ObjectStream, TextStream};
use rand::Rng;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Optional override for the retry decision.
pub type RetryPredicate = Arc<dyn Fn(&GenAiError) -> bool + Send + Sync>;

/// Configuration for the retry middleware.
#[derive(Clone)]
pub struct RetryConfig {
    /// Retries beyond the first call; total call count is `max_attempts + 1`.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling on the computed delay.
    pub max_delay: Duration,
    /// Exponential growth factor between retries.
    pub multiplier: f64,
    /// Multiply each delay by a uniform factor in `[0.75, 1.25]`.
    pub jitter: bool,
    /// Overrides the default retry decision (transient, rate-limited, or
    /// timeout errors).
    pub retry_if: Option<RetryPredicate>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
            retry_if: None,
        }
    }
}

impl RetryConfig {
    /// Sets the retry budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the delay before the first retry.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the delay ceiling.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Sets the exponential growth factor.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Overrides the retry decision.
    pub fn with_retry_if(
        mut self,
        predicate: impl Fn(&GenAiError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retry_if = Some(Arc::new(predicate));
        self
    }

    /// Wraps a provider with this configuration.
    pub fn wrap(self, inner: Arc<dyn Provider>) -> Retry {
        Retry {
            inner,
            config: self,
        }
    }

    /// Turns this configuration into a chainable middleware.
    pub fn into_middleware(self) -> Middleware {
        Box::new(move |inner| Arc::new(self.clone().wrap(inner)))
    }
}

/// Retries transient failures with exponential backoff.
///
/// The delay for retry `k` (0-indexed) is
/// `min(max_delay, base_delay * multiplier^k)`, optionally jittered; a
/// server-provided `retry_after` overrides the computed delay. Cancellation
/// during a wait returns the last observed error immediately. For streaming
/// calls only the initial connection is retried, never a live stream.
pub struct Retry {
    inner: Arc<dyn Provider>,
    config: RetryConfig,
}

impl Retry {
    fn should_retry(&self, error: &GenAiError) -> bool {
        match &self.config.retry_if {
            Some(predicate) => predicate(error),
            None => error.is_transient() || error.is_rate_limited() || error.is_timeout(),
        }
    }

    fn delay_for(&self, retry_index: u32, error: &GenAiError) -> Duration {
        if let Some(retry_after) = error.retry_after() {
            return retry_after;
        }
        let exponential =
            self.config.base_delay.as_secs_f64() * self.config.multiplier.powi(retry_index as i32);
        let mut delay = exponential.min(self.config.max_delay.as_secs_f64());
        if self.config.jitter {
            delay *= rand::thread_rng().gen_range(0.75..=1.25);
        }
        Duration::from_secs_f64(delay.max(0.0))
    }

    /// Waits out the backoff delay; `Err(())` means the wait was cancelled.
    async fn wait(
        &self,
        retry_index: u32,
        error: &GenAiError,
        cancellation: Option<&CancellationToken>,
    ) -> Result<(), ()> {
        let delay = self.delay_for(retry_index, error);
        match cancellation {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => Err(()),
                    _ = tokio::time::sleep(delay) => Ok(()),
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    async fn retry_call<T, F, Fut>(
        &self,
        cancellation: Option<CancellationToken>,
        mut call: F,
    ) -> Result<T, GenAiError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, GenAiError>> + Send,
        T: Send,
    {
        let mut retry_index = 0u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if retry_index >= self.config.max_attempts || !self.should_retry(&error) {
                        return Err(error);
                    }
                    if let Some(token) = &cancellation {
                        if token.is_cancelled() {
                            return Err(error);
                        }
                    }
                    if self
                        .wait(retry_index, &error, cancellation.as_ref())
                        .await
                        .is_err()
                    {
                        return Err(error);
                    }
                    retry_index += 1;
                }
            }
        }
    }
}

#[async_trait]
impl Provider for Retry {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate_text(&self, request: Request) -> Result<TextResult, GenAiError> {
        let inner = Arc::clone(&self.inner);
        self.retry_call(request.cancellation.clone(), move || {
            let inner = Arc::clone(&inner);
            let request = request.clone();
            async move { inner.generate_text(request).await }
        })
        .await
    }

    async fn stream_text(&self, request: Request) -> Result<TextStream, GenAiError> {
        let inner = Arc::clone(&self.inner);
        self.retry_call(request.cancellation.clone(), move || {
            let inner = Arc::clone(&inner);
            let request = request.clone();
            async move { inner.stream_text(request).await }
        })
        .await
    }

    async fn generate_object(
        &self,
        request: Request,
        schema: Value,
    ) -> Result<ObjectResult<Value>, GenAiError> {
        let inner = Arc::clone(&self.inner);
        self.retry_call(request.cancellation.clone(), move || {
            let inner = Arc::clone(&inner);
            let request = request.clone();
            let schema = schema.clone();
            async move { inner.generate_object(request, schema).await }
        })
        .await
    }

    async fn stream_object(
        &self,
        request: Request,
        schema: Value,
    ) -> Result<ObjectStream, GenAiError> {
        let inner = Arc::clone(&self.inner);
        self.retry_call(request.cancellation.clone(), move || {
            let inner = Arc::clone(&inner);
            let request = request.clone();
            let schema = schema.clone();
            async move { inner.stream_object(request, schema).await }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genai_kit_provider::error::ErrorKind;
    use genai_kit_provider::response::{Step, Usage};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    struct FlakyProvider {
        failures: Mutex<Vec<GenAiError>>,
        calls: AtomicUsize,
    }

    impl FlakyProvider {
        fn new(failures: Vec<GenAiError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate_text(&self, _request: Request) -> Result<TextResult, GenAiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failures.lock().unwrap().pop() {
                Some(error) => Err(error),
                None => Ok(TextResult::from_steps(
                    vec![Step::new(1, "ok")],
                    Usage::new(1, 1),
                    None,
                )),
            }
        }

        async fn stream_text(&self, _request: Request) -> Result<TextStream, GenAiError> {
            Err(GenAiError::new(ErrorKind::Unsupported, "no"))
        }

        async fn generate_object(
            &self,
            _request: Request,
            _schema: Value,
        ) -> Result<ObjectResult<Value>, GenAiError> {
            Err(GenAiError::new(ErrorKind::Unsupported, "no"))
        }

        async fn stream_object(
            &self,
            _request: Request,
            _schema: Value,
        ) -> Result<ObjectStream, GenAiError> {
            Err(GenAiError::new(ErrorKind::Unsupported, "no"))
        }
    }

    fn transient() -> GenAiError {
        GenAiError::new(ErrorKind::ProviderUnavailable, "try later")
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_success() {
        let provider = Arc::new(FlakyProvider::new(vec![transient(), transient()]));
        let retry = RetryConfig::default()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(10))
            .wrap(provider.clone());

        let result = retry.generate_text(Request::from_text("x")).await.unwrap();
        assert_eq!(result.text, "ok");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let provider = Arc::new(FlakyProvider::new(vec![GenAiError::new(
            ErrorKind::InvalidRequest,
            "bad",
        )]));
        let retry = RetryConfig::default().wrap(provider.clone());

        let err = retry
            .generate_text(Request::from_text("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRequest);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_budget_is_respected() {
        let failures: Vec<GenAiError> = (0..10).map(|_| transient()).collect();
        let provider = Arc::new(FlakyProvider::new(failures));
        let retry = RetryConfig::default()
            .with_max_attempts(2)
            .with_base_delay(Duration::from_millis(1))
            .wrap(provider.clone());

        let err = retry
            .generate_text(Request::from_text("x"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        // Total call count is max_attempts + 1.
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_overrides_computed_delay() {
        let delayed = GenAiError::new(ErrorKind::ProviderUnavailable, "busy")
            .with_retry_after(Duration::from_secs(1));
        let provider = Arc::new(FlakyProvider::new(vec![delayed.clone(), delayed]));
        let retry = RetryConfig::default()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(10))
            .with_jitter(false)
            .wrap(provider.clone());

        let started = Instant::now();
        let result = retry.generate_text(Request::from_text("x")).await.unwrap();
        assert_eq!(result.text, "ok");
        assert_eq!(provider.call_count(), 3);
        // Two waits of one second each from Retry-After.
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delay_is_bounded() {
        let retry = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(250))
            .with_multiplier(10.0)
            .with_jitter(false)
            .wrap(Arc::new(FlakyProvider::new(vec![])));

        assert_eq!(
            retry.delay_for(0, &transient()),
            Duration::from_millis(100)
        );
        assert_eq!(
            retry.delay_for(5, &transient()),
            Duration::from_millis(250)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_stays_within_bounds() {
        let retry = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_jitter(true)
            .wrap(Arc::new(FlakyProvider::new(vec![])));

        for _ in 0..50 {
            let delay = retry.delay_for(0, &transient());
            assert!(delay >= Duration::from_millis(75));
            assert!(delay <= Duration::from_millis(125));
        }
    }

    #[tokio::test]
    async fn test_cancellation_during_wait_returns_last_error() {
        let failures: Vec<GenAiError> = (0..5).map(|_| transient()).collect();
        let provider = Arc::new(FlakyProvider::new(failures));
        let retry = RetryConfig::default()
            .with_max_attempts(5)
            .with_base_delay(Duration::from_secs(30))
            .wrap(provider.clone());

        let token = CancellationToken::new();
        token.cancel();
        let request = Request::from_text("x").with_cancellation(token);

        let err = retry.generate_text(request).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProviderUnavailable);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_retry_predicate() {
        let provider = Arc::new(FlakyProvider::new(vec![GenAiError::new(
            ErrorKind::Internal,
            "weird",
        )]));
        let retry = RetryConfig::default()
            .with_base_delay(Duration::from_millis(1))
            .with_retry_if(|error| error.kind == ErrorKind::Internal)
            .wrap(provider.clone());

        let result = retry.generate_text(Request::from_text("x")).await.unwrap();
        assert_eq!(result.text, "ok");
        assert_eq!(provider.call_count(), 2);
    }
}
