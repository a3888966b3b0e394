//! Retry logic with exponential backoff
//!
//! Network calls made on behalf of a meeting view (suggestion lookups,
//! location pushes, attendee refreshes) go through here:
//! - Exponential backoff with jitter
//! - Configurable retry policies
//! - Circuit breaker pattern
//!
//! # Example
//!
//! ```rust,no_run
//! use meetpoint_core::retry::{retry_async, RetryConfig};
//!
//! # async fn demo() {
//! let result = retry_async(RetryConfig::quick(), "ping", |_: &std::io::Error| true, || async {
//!     Ok::<_, std::io::Error>("pong")
//! })
//! .await;
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add random jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a config for quick retries
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Create a config for patient retries
    pub fn patient() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Create a config with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    /// Calculate delay before a given attempt (attempt 0 never waits)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.jitter {
            // Up to 25% jitter
            delay_secs * (1.0 + jitter_fraction() * 0.25)
        } else {
            delay_secs
        };

        Duration::from_secs_f64(final_delay.max(0.0))
    }
}

/// Pseudo-random fraction in `0.0..1.0` seeded by the std hasher's random keys
fn jitter_fraction() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u128(Instant::now().elapsed().as_nanos());
    (hasher.finish() % 1000) as f64 / 1000.0
}

/// Retry result with attempt information
#[derive(Debug)]
pub struct RetryResult<T> {
    /// The successful result
    pub value: T,
    /// Number of attempts made
    pub attempts: u32,
    /// Total time spent, including backoff sleeps
    pub total_duration: Duration,
}

/// Failure after the retry policy gave up
#[derive(Debug)]
pub struct RetryError<E> {
    /// The last error observed
    pub last_error: E,
    /// Number of attempts made
    pub attempts: u32,
    /// Whether the last error was classified as retryable
    pub exhausted: bool,
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.exhausted {
            write!(f, "gave up after {} attempts: {}", self.attempts, self.last_error)
        } else {
            write!(f, "{}", self.last_error)
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last_error)
    }
}

impl<E> RetryError<E> {
    /// Discard attempt bookkeeping and keep the underlying error
    pub fn into_inner(self) -> E {
        self.last_error
    }
}

/// Execute an async operation with retry logic.
///
/// `is_retryable` decides whether a failure is transient; permanent failures
/// return immediately without sleeping.
pub async fn retry_async<F, Fut, T, E, R>(
    config: RetryConfig,
    operation: &str,
    is_retryable: R,
    mut f: F,
) -> Result<RetryResult<T>, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let start = Instant::now();
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = config.delay_for_attempt(attempt);
            debug!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying after delay"
            );
            tokio::time::sleep(delay).await;
        }

        match f().await {
            Ok(value) => {
                return Ok(RetryResult {
                    value,
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                });
            }
            Err(e) => {
                let retryable = is_retryable(&e);
                attempt += 1;
                if !retryable || attempt >= max_attempts {
                    debug!(operation, attempt, error = %e, retryable, "Giving up");
                    return Err(RetryError {
                        last_error: e,
                        attempts: attempt,
                        exhausted: retryable,
                    });
                }
                debug!(operation, attempt, error = %e, "Attempt failed, will retry");
            }
        }
    }
}

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,
    /// Number of successes in half-open to close circuit
    pub success_threshold: u32,
    /// Time to wait before trying half-open
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: u32,
    successes: u32,
    opened_at: Option<Instant>,
}

/// Circuit breaker for preventing request storms against a failing backend
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                opened_at: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Get current state
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Check if circuit allows execution, moving open -> half-open once the reset timeout passed
    pub fn can_execute(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner.opened_at.map_or(Duration::MAX, |t| t.elapsed());
                if elapsed >= self.config.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful execution
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.failures = 0;
        if inner.state == CircuitState::HalfOpen {
            inner.successes += 1;
            if inner.successes >= self.config.success_threshold {
                inner.state = CircuitState::Closed;
                inner.opened_at = None;
            }
        }
    }

    /// Record a failed execution
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failures += 1;
        match inner.state {
            CircuitState::Closed if inner.failures >= self.config.failure_threshold => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            // Any failure in half-open goes back to open
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }

    /// Reset the circuit breaker
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.successes = 0;
        inner.opened_at = None;
    }
}
