use super::Middleware;
use async_trait::async_trait;
use genai_kit_provider::error::{ErrorKind, GenAiError};
use genai_kit_provider::provider::Provider;
use genai_kit_provider::request::Request;
use genai_kit_provider::response::{ObjectResult, TextResult};
use genai_kit_provider::stream::{ObjectStream, TextStream};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Callback invoked whenever a caller is made to wait.
pub type OnRateLimited = Arc<dyn Fn(&str, Duration) + Send + Sync>;

/// Configuration for the rate-limit middleware.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Global refill rate in requests per second.
    pub rps: f64,
    /// Global burst capacity.
    pub burst: f64,
    /// Per-operation overrides of (rps, burst), keyed by operation name
    /// (`generate_text`, `stream_text`, `generate_object`, `stream_object`).
    pub per_operation: HashMap<String, (f64, f64)>,
    /// Maximum time a caller may be made to wait; `None` waits indefinitely
    /// (respecting cancellation).
    pub wait_timeout: Option<Duration>,
    /// Invoked with the operation name and computed wait whenever a caller
    /// has to wait for a token.
    pub on_rate_limited: Option<OnRateLimited>,
}

impl RateLimitConfig {
    /// Creates a config with the given global rate and burst.
    pub fn new(rps: f64, burst: f64) -> Self {
        Self {
            rps,
            burst,
            per_operation: HashMap::new(),
            wait_timeout: None,
            on_rate_limited: None,
        }
    }

    /// Overrides the limits for one operation.
    pub fn with_operation_limit(mut self, operation: impl Into<String>, rps: f64, burst: f64) -> Self {
        self.per_operation.insert(operation.into(), (rps, burst));
        self
    }

    /// Bounds how long a caller may wait for a token.
    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = Some(wait_timeout);
        self
    }

    /// Installs the wait callback.
    pub fn with_on_rate_limited(
        mut self,
        callback: impl Fn(&str, Duration) + Send + Sync + 'static,
    ) -> Self {
        self.on_rate_limited = Some(Arc::new(callback));
        self
    }
}

struct Bucket {
    rps: f64,
    burst: f64,
    tokens: f64,
    refilled_at: Instant,
}

impl Bucket {
    fn new(rps: f64, burst: f64) -> Self {
        Self {
            rps: rps.max(f64::MIN_POSITIVE),
            burst: burst.max(1.0),
            tokens: burst.max(1.0),
            refilled_at: Instant::now(),
        }
    }

    /// Takes a token if available, otherwise returns the wait until one is.
    fn poll(&mut self, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.refilled_at);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.rps).min(self.burst);
        self.refilled_at = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            Some(Duration::from_secs_f64((1.0 - self.tokens) / self.rps))
        }
    }

    fn reconfigure(&mut self, rps: f64, burst: f64) {
        self.rps = rps.max(f64::MIN_POSITIVE);
        self.burst = burst.max(1.0);
        self.tokens = self.tokens.min(self.burst);
    }
}

struct LimiterState {
    global: Bucket,
    per_operation: HashMap<String, Bucket>,
}

/// A token-bucket limiter shared by the rate-limit middleware.
///
/// Keep the `Arc` handle after wrapping a provider: limits may be updated at
/// runtime through it without interrupting in-flight calls.
pub struct RateLimiter {
    state: Mutex<LimiterState>,
    wait_timeout: Option<Duration>,
    on_rate_limited: Option<OnRateLimited>,
}

impl RateLimiter {
    /// Creates a limiter from a config.
    pub fn new(config: RateLimitConfig) -> Self {
        let per_operation = config
            .per_operation
            .iter()
            .map(|(op, (rps, burst))| (op.clone(), Bucket::new(*rps, *burst)))
            .collect();
        Self {
            state: Mutex::new(LimiterState {
                global: Bucket::new(config.rps, config.burst),
                per_operation,
            }),
            wait_timeout: config.wait_timeout,
            on_rate_limited: config.on_rate_limited,
        }
    }

    /// Reserves one token for the operation, waiting when none is available.
    ///
    /// Waits longer than the configured timeout fail with a `RateLimited`
    /// error carrying the computed wait as `retry_after`.
    pub async fn acquire(
        &self,
        operation: &str,
        cancellation: Option<&CancellationToken>,
    ) -> Result<(), GenAiError> {
        let mut total_wait = Duration::ZERO;
        loop {
            if let Some(token) = cancellation {
                if token.is_cancelled() {
                    return Err(GenAiError::cancelled());
                }
            }

            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                if let Some(bucket) = state.per_operation.get_mut(operation) {
                    bucket.poll(now)
                } else {
                    state.global.poll(now)
                }
            };

            let Some(wait) = wait else {
                return Ok(());
            };

            if let Some(timeout) = self.wait_timeout {
                if total_wait + wait > timeout {
                    return Err(GenAiError::new(
                        ErrorKind::RateLimited,
                        format!("rate limit wait exceeds timeout for {operation}"),
                    )
                    .with_retry_after(wait));
                }
            }

            if let Some(callback) = &self.on_rate_limited {
                callback(operation, wait);
            }
            total_wait += wait;

            match cancellation {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => return Err(GenAiError::cancelled()),
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                None => tokio::time::sleep(wait).await,
            }
        }
    }

    /// Updates the global limits without interrupting in-flight calls.
    pub async fn set_limits(&self, rps: f64, burst: f64) {
        self.state.lock().await.global.reconfigure(rps, burst);
    }

    /// Updates or installs a per-operation limit.
    pub async fn set_operation_limits(&self, operation: impl Into<String>, rps: f64, burst: f64) {
        let mut state = self.state.lock().await;
        match state.per_operation.entry(operation.into()) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                entry.get_mut().reconfigure(rps, burst);
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(Bucket::new(rps, burst));
            }
        }
    }

    /// Turns a shared limiter into a chainable middleware.
    pub fn middleware(limiter: Arc<RateLimiter>) -> Middleware {
        Box::new(move |inner| {
            Arc::new(RateLimited {
                limiter: Arc::clone(&limiter),
                inner,
            })
        })
    }
}

/// A provider wrapper that reserves a token before every call.
pub struct RateLimited {
    limiter: Arc<RateLimiter>,
    inner: Arc<dyn Provider>,
}

impl RateLimited {
    /// Wraps a provider with a shared limiter.
    pub fn new(limiter: Arc<RateLimiter>, inner: Arc<dyn Provider>) -> Self {
        Self { limiter, inner }
    }
}

#[async_trait]
impl Provider for RateLimited {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate_text(&self, request: Request) -> Result<TextResult, GenAiError> {
        self.limiter
            .acquire("generate_text", request.cancellation.as_ref())
            .await?;
        self.inner.generate_text(request).await
    }

    async fn stream_text(&self, request: Request) -> Result<TextStream, GenAiError> {
        self.limiter
            .acquire("stream_text", request.cancellation.as_ref())
            .await?;
        self.inner.stream_text(request).await
    }

    async fn generate_object(
        &self,
        request: Request,
        schema: Value,
    ) -> Result<ObjectResult<Value>, GenAiError> {
        self.limiter
            .acquire("generate_object", request.cancellation.as_ref())
            .await?;
        self.inner.generate_object(request, schema).await
    }

    async fn stream_object(
        &self,
        request: Request,
        schema: Value,
    ) -> Result<ObjectStream, GenAiError> {
        self.limiter
            .acquire("stream_object", request.cancellation.as_ref())
            .await?;
        self.inner.stream_object(request, schema).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_throttle() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2.0, 2.0));

        let started = Instant::now();
        for _ in 0..5 {
            limiter.acquire("generate_text", None).await.unwrap();
        }
        // Two from the burst, three paced at 2 rps.
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_immediate() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1.0, 3.0));

        let started = Instant::now();
        for _ in 0..3 {
            limiter.acquire("generate_text", None).await.unwrap();
        }
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_fails_with_retry_after() {
        let limiter = RateLimiter::new(
            RateLimitConfig::new(0.5, 1.0).with_wait_timeout(Duration::from_millis(100)),
        );

        limiter.acquire("generate_text", None).await.unwrap();
        let err = limiter.acquire("generate_text", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::RateLimited);
        assert!(err.retry_after().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_fires_on_wait() {
        let waits = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&waits);
        let limiter = RateLimiter::new(RateLimitConfig::new(10.0, 1.0).with_on_rate_limited(
            move |operation, _wait| {
                assert_eq!(operation, "generate_text");
                counted.fetch_add(1, Ordering::SeqCst);
            },
        ));

        limiter.acquire("generate_text", None).await.unwrap();
        assert_eq!(waits.load(Ordering::SeqCst), 0);
        limiter.acquire("generate_text", None).await.unwrap();
        assert!(waits.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_operation_override() {
        let limiter = RateLimiter::new(
            RateLimitConfig::new(100.0, 100.0).with_operation_limit("stream_text", 1.0, 1.0),
        );

        // Global bucket is generous.
        let started = Instant::now();
        for _ in 0..10 {
            limiter.acquire("generate_text", None).await.unwrap();
        }
        assert!(started.elapsed() < Duration::from_millis(100));

        // Stream bucket is not.
        let started = Instant::now();
        limiter.acquire("stream_text", None).await.unwrap();
        limiter.acquire("stream_text", None).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hot_reconfiguration() {
        let limiter = RateLimiter::new(RateLimitConfig::new(0.1, 1.0));
        limiter.acquire("generate_text", None).await.unwrap();

        // Raise the limits; the next call should be quick.
        limiter.set_limits(1000.0, 1000.0).await;
        let started = Instant::now();
        limiter.acquire("generate_text", None).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_cancellation_respected_while_waiting() {
        let limiter = RateLimiter::new(RateLimitConfig::new(0.001, 1.0));
        limiter.acquire("generate_text", None).await.unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let err = limiter
            .acquire("generate_text", Some(&token))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
