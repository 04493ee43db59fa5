use prospector_core::{CoreError, PlatformApiError, RateLimitSettings};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Minimum spacing between consecutive request completions.
    pub min_interval: Duration,
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,
    /// How long the breaker stays open before it resets.
    pub cooldown: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(1_100),
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

impl From<&RateLimitSettings> for RateLimiterConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            min_interval: Duration::from_millis(settings.min_interval_ms),
            failure_threshold: settings.failure_threshold,
            cooldown: Duration::from_secs(settings.cooldown_secs),
        }
    }
}

#[derive(Debug)]
struct LimiterState {
    last_request: Option<Instant>,
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Request pacing plus a failure-streak circuit breaker, owned by one crawl
/// session. Constructed per session rather than shared globally so tests
/// and concurrent sessions stay isolated.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LimiterState {
                last_request: None,
                failure_count: 0,
                last_failure: None,
            }),
        }
    }

    /// Block until it is safe to issue the next outbound request. Fails
    /// immediately with `CircuitOpen` while the breaker is tripped.
    ///
    /// The lock is held across the pacing sleep so two concurrent callers
    /// cannot both observe the same `last_request` stamp.
    pub async fn wait(&self) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;

        if state.failure_count >= self.config.failure_threshold {
            let since_failure = state
                .last_failure
                .map(|t| t.elapsed())
                .unwrap_or(self.config.cooldown);

            if since_failure >= self.config.cooldown {
                info!(
                    "Circuit breaker cooldown elapsed after {} failures, resetting",
                    state.failure_count
                );
                state.failure_count = 0;
            } else {
                let retry_in = (self.config.cooldown - since_failure).as_secs().max(1);
                warn!("Circuit breaker open, {}s of cooldown remaining", retry_in);
                return Err(PlatformApiError::CircuitOpen { retry_in }.into());
            }
        }

        if let Some(last) = state.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.config.min_interval {
                let pause = self.config.min_interval - elapsed;
                debug!("Pacing request, sleeping {:?}", pause);
                sleep(pause).await;
            }
        }

        state.last_request = Some(Instant::now());
        Ok(())
    }

    /// Decrement the failure streak toward zero. Lets transient blips
    /// recover without waiting out a full cooldown.
    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;
        state.failure_count = state.failure_count.saturating_sub(1);
    }

    pub async fn record_failure(&self) {
        let mut state = self.state.lock().await;
        state.failure_count += 1;
        state.last_failure = Some(Instant::now());
        debug!("Recorded failure, streak is now {}", state.failure_count);
    }

    pub async fn failure_count(&self) -> u32 {
        self.state.lock().await.failure_count
    }
}
