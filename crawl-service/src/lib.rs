pub mod poller;
pub mod store;

pub use poller::{completion_reached, PollOutcome, PollerConfig, ProgressPoller};
pub use store::SessionStore;

use platform_client::{
    CommunityDiscoverer, ContentPlatform, CrawlOrchestrator, ProgressSink, RateLimiter,
    SourceCompleteSink, SourceScraper,
};
use prospector_core::{AppConfig, Community, CoreError, Post, ScrapeProgress};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Facade tying the crawl pipeline to the shared session store. Crawls
/// run as detached tasks that report through the store; callers observe
/// them via `get_progress`/`get_posts` or a [`ProgressPoller`].
pub struct CrawlService<P> {
    platform: Arc<P>,
    store: Arc<SessionStore>,
    config: AppConfig,
}

impl<P: ContentPlatform + 'static> CrawlService<P> {
    pub fn new(platform: Arc<P>, config: AppConfig) -> Self {
        Self {
            platform,
            store: Arc::new(SessionStore::new()),
            config,
        }
    }

    pub fn store(&self) -> Arc<SessionStore> {
        self.store.clone()
    }

    pub fn poller(&self) -> ProgressPoller {
        ProgressPoller::new(self.store.clone(), PollerConfig::from(&self.config.poller))
    }

    /// Keyword-driven community discovery. Uses a fresh rate limiter so a
    /// breaker opened by a previous crawl does not block discovery.
    pub async fn discover(&self, keywords: &[String]) -> Result<Vec<Community>, CoreError> {
        let limiter = Arc::new(RateLimiter::new((&self.config.rate_limit).into()));
        let discoverer = CommunityDiscoverer::new(
            self.platform.clone(),
            limiter,
            (&self.config.discovery).into(),
        );
        discoverer.discover(keywords).await
    }

    /// Register a session and launch its crawl in the background. Returns
    /// once the session exists; progress and results land in the store as
    /// the crawl advances.
    pub fn start_crawl(
        &self,
        session_id: &str,
        communities: Vec<String>,
        keywords: Vec<String>,
    ) -> Result<(), CoreError> {
        if communities.is_empty() {
            return Err(CoreError::InvalidInput {
                message: "at least one community is required to crawl".to_string(),
            });
        }

        let cancel = self
            .store
            .create_session(session_id, communities.clone(), keywords.clone())?;

        // Each session gets its own limiter so one session's failures do
        // not trip the breaker for another.
        let limiter = Arc::new(RateLimiter::new((&self.config.rate_limit).into()));
        let scraper = SourceScraper::new(
            self.platform.clone(),
            limiter,
            (&self.config.scraper).into(),
        );
        let orchestrator = CrawlOrchestrator::new(scraper, (&self.config.crawl).into());

        let store = self.store.clone();
        let session = session_id.to_string();

        let progress_store = store.clone();
        let progress_session = session.clone();
        let on_progress: ProgressSink = Arc::new(move |progress: ScrapeProgress| {
            if let Err(e) = progress_store.upsert_progress(&progress_session, progress) {
                warn!("Dropping progress update: {}", e);
            }
        });

        // Posts are stored per source as each finishes; the orchestrator's
        // aggregate return is redundant here and only logged.
        let posts_store = store.clone();
        let posts_session = session.clone();
        let on_source_complete: SourceCompleteSink = Arc::new(move |community, items: &[Post]| {
            if items.is_empty() {
                return;
            }
            if let Err(e) = posts_store.append_posts(&posts_session, items.to_vec()) {
                warn!("Dropping {} posts from {}: {}", items.len(), community, e);
            }
        });

        tokio::spawn(async move {
            info!("Session {} crawling {} sources", session, communities.len());
            match orchestrator
                .run(
                    &communities,
                    &keywords,
                    &on_progress,
                    Some(&on_source_complete),
                    &cancel,
                )
                .await
            {
                Ok(posts) => info!("Session {} finished with {} items", session, posts.len()),
                Err(e) => warn!("Session {} aborted: {}", session, e),
            }
        });

        Ok(())
    }

    pub fn get_progress(&self, session_id: &str) -> Result<Vec<ScrapeProgress>, CoreError> {
        Ok(self.store.get_progress(session_id)?)
    }

    pub fn get_posts(&self, session_id: &str) -> Result<Vec<Post>, CoreError> {
        Ok(self.store.get_posts(session_id)?)
    }

    pub fn cancel(&self, session_id: &str) -> Result<(), CoreError> {
        Ok(self.store.cancel(session_id)?)
    }

    /// On-demand comment hydration for a single post. Best effort, like
    /// the scraper's own hydration path.
    pub async fn attach_comments(&self, post: Post) -> Post {
        let limiter = Arc::new(RateLimiter::new((&self.config.rate_limit).into()));
        let scraper = SourceScraper::new(
            self.platform.clone(),
            limiter,
            (&self.config.scraper).into(),
        );
        scraper.attach_comments(post).await
    }

    pub fn prune_expired(&self, ttl: Duration) -> usize {
        self.store.prune_expired(ttl)
    }
}
