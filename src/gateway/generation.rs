/// Image generation gateway and its retry policy.
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};

use crate::config::generation::{
    GENERATION_ATTEMPT_TIMEOUT, GENERATION_MAX_ATTEMPTS, GENERATION_RETRY_DELAY,
};
use crate::gateway::GatewayError;

/// Turns a text prompt into PNG bytes.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, GatewayError>;
}

/// Wraps a gateway with bounded, fixed-delay retries and a per-attempt timeout.
///
/// After the last failed attempt the error is `RetriesExhausted`, carrying the
/// attempt count and the last cause.
pub struct RetryingGenerator<G> {
    inner: G,
    max_attempts: u32,
    delay: Duration,
    attempt_timeout: Duration,
}

impl<G: GenerationGateway> RetryingGenerator<G> {
    /// Retry with the configured defaults.
    pub fn new(inner: G) -> Self {
        Self::with_policy(
            inner,
            GENERATION_MAX_ATTEMPTS,
            GENERATION_RETRY_DELAY,
            GENERATION_ATTEMPT_TIMEOUT,
        )
    }

    pub fn with_policy(
        inner: G,
        max_attempts: u32,
        delay: Duration,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            delay,
            attempt_timeout,
        }
    }
}

#[async_trait]
impl<G: GenerationGateway> GenerationGateway for RetryingGenerator<G> {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, GatewayError> {
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.attempt_timeout, self.inner.generate(prompt))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Timeout(self.attempt_timeout)),
            };

            match result {
                Ok(image) => {
                    if attempt > 1 {
                        info!("[Generation] Succeeded on attempt {}", attempt);
                    }
                    return Ok(image);
                }
                Err(err) if attempt < self.max_attempts => {
                    warn!(
                        "[Generation] Attempt {} failed: {}. Retrying in {:?}",
                        attempt, err, self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!("[Generation] All {} attempts failed: {}", attempt, err);
                    return Err(GatewayError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
            }
        }
    }
}
