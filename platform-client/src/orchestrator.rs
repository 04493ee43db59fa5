use crate::api::ContentPlatform;
use crate::scraper::{ProgressSink, SourceScraper};
use prospector_core::{CoreError, CrawlSettings, Post, ScrapeProgress};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Cooperative cancellation flag, checked between sources. In-flight
/// requests are bounded by the client's request timeout instead.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Invoked after each source with that source's collected items (empty on
/// failure).
pub type SourceCompleteSink = Arc<dyn Fn(&str, &[Post]) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause between sources, on top of the limiter's per-request spacing.
    pub inter_source_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            inter_source_delay: Duration::from_secs(2),
        }
    }
}

impl From<&CrawlSettings> for OrchestratorConfig {
    fn from(settings: &CrawlSettings) -> Self {
        Self {
            inter_source_delay: Duration::from_millis(settings.inter_source_delay_ms),
        }
    }
}

/// Drives one crawl: sources strictly one at a time, partial failure as
/// the normal case. Sequential processing is a deliberate conservatism
/// against upstream bans; any future parallelism must stay governed by the
/// same RateLimiter.
pub struct CrawlOrchestrator<P> {
    scraper: SourceScraper<P>,
    config: OrchestratorConfig,
}

impl<P: ContentPlatform> CrawlOrchestrator<P> {
    pub fn new(scraper: SourceScraper<P>, config: OrchestratorConfig) -> Self {
        Self { scraper, config }
    }

    /// Returns the concatenation of every source's matched items, in
    /// source-processing order. A failing source contributes nothing but
    /// never aborts the rest.
    pub async fn run(
        &self,
        communities: &[String],
        keywords: &[String],
        on_progress: &ProgressSink,
        on_source_complete: Option<&SourceCompleteSink>,
        cancel: &CancelHandle,
    ) -> Result<Vec<Post>, CoreError> {
        if communities.is_empty() {
            return Err(CoreError::InvalidInput {
                message: "at least one community is required to crawl".to_string(),
            });
        }

        let mut collected: Vec<Post> = Vec::new();
        let mut failed_sources = 0usize;

        for (index, community) in communities.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(
                    "Crawl cancelled after {} of {} sources",
                    index,
                    communities.len()
                );
                break;
            }

            on_progress(ScrapeProgress::new(community.clone()));

            match self.scraper.scrape(community, keywords, on_progress).await {
                Ok(items) => {
                    info!("{} contributed {} items", community, items.len());
                    if let Some(callback) = on_source_complete {
                        callback(community, &items);
                    }
                    collected.extend(items);
                }
                Err(e) => {
                    // The scraper already wrote the terminal error record.
                    failed_sources += 1;
                    warn!("Source {} failed, continuing: {}", community, e);
                    if let Some(callback) = on_source_complete {
                        callback(community, &[]);
                    }
                }
            }

            if index + 1 < communities.len() && !cancel.is_cancelled() {
                sleep(self.config.inter_source_delay).await;
            }
        }

        info!(
            "Crawl finished: {} items from {} sources ({} failed)",
            collected.len(),
            communities.len(),
            failed_sources
        );
        Ok(collected)
    }
}
