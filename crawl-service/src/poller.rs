use crate::store::SessionStore;
use prospector_core::{CoreError, PollerSettings, Post, ScrapeProgress};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Session-level safety timeout. Independent of per-request timeouts;
    /// expiry yields whatever partial data exists.
    pub session_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            session_timeout: Duration::from_secs(300),
        }
    }
}

impl From<&PollerSettings> for PollerConfig {
    fn from(settings: &PollerSettings) -> Self {
        Self {
            interval: Duration::from_millis(settings.interval_ms),
            session_timeout: Duration::from_secs(settings.session_timeout_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub posts: Vec<Post>,
    pub progress: Vec<ScrapeProgress>,
    /// True when the safety timeout forced termination; `posts` then holds
    /// best-effort partial data.
    pub timed_out: bool,
}

/// The crawl is done only when *every* requested community has reached a
/// terminal status. A community with no record yet counts as pending.
pub fn completion_reached(progress: &[ScrapeProgress], expected: &[String]) -> bool {
    expected.iter().all(|name| {
        progress
            .iter()
            .find(|p| &p.community == name)
            .map(|p| p.status.is_terminal())
            .unwrap_or(false)
    })
}

/// Read side of the progress protocol. Polls the shared store on a fixed
/// interval; never mutates crawl state.
pub struct ProgressPoller {
    store: Arc<SessionStore>,
    config: PollerConfig,
}

impl ProgressPoller {
    pub fn new(store: Arc<SessionStore>, config: PollerConfig) -> Self {
        Self { store, config }
    }

    /// Poll until every requested community is terminal, then fetch the
    /// aggregated results exactly once. The session timeout bounds total
    /// wall-clock time and degrades to a partial fetch.
    pub async fn wait_for_completion(&self, session_id: &str) -> Result<PollOutcome, CoreError> {
        let expected = self.store.communities(session_id)?;
        let deadline = Instant::now() + self.config.session_timeout;

        loop {
            let progress = self.store.get_progress(session_id)?;

            if completion_reached(&progress, &expected) {
                info!(
                    "Session {} complete ({} sources terminal)",
                    session_id,
                    expected.len()
                );
                let posts = self.store.get_posts(session_id)?;
                return Ok(PollOutcome {
                    posts,
                    progress,
                    timed_out: false,
                });
            }

            if Instant::now() >= deadline {
                warn!(
                    "Session {} timed out after {:?}, returning partial data",
                    session_id, self.config.session_timeout
                );
                let posts = self.store.get_posts(session_id)?;
                return Ok(PollOutcome {
                    posts,
                    progress,
                    timed_out: true,
                });
            }

            debug!(
                "Session {} still running, {} of {} sources terminal",
                session_id,
                progress.iter().filter(|p| p.status.is_terminal()).count(),
                expected.len()
            );
            sleep(self.config.interval).await;
        }
    }
}
