//! Registry configuration

use registrar_concurrency::RetryPolicy;

/// Configuration for a [`Registry`](crate::Registry)
///
/// # Example
/// ```ignore
/// let config = RegistryConfig::default()
///     .with_retry(RetryPolicy::new().with_max_attempts(5))
///     .with_rng_seed(42);
/// let registry = Registry::with_config(engine, config);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Retry behavior applied to every top-level operation
    pub retry: RetryPolicy,
    /// Seed for backoff jitter; `None` uses the thread RNG
    ///
    /// Set in tests to make retried interleavings repeatable.
    pub rng_seed: Option<u64>,
}

impl RegistryConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Seed the jitter RNG for deterministic backoff
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}
