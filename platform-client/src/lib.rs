pub mod api;
pub mod discovery;
pub mod fallback;
pub mod matcher;
pub mod orchestrator;
pub mod rate_limiter;
pub mod scraper;

pub use api::{CommunitySummary, ContentPlatform, HttpPlatform, RawComment, RawItem};
pub use discovery::{CommunityDiscoverer, DiscoveryConfig};
pub use fallback::{categorize, fallback_communities, FallbackCategory};
pub use matcher::{KeywordMatcher, WILDCARD_MATCH};
pub use orchestrator::{CancelHandle, CrawlOrchestrator, OrchestratorConfig, SourceCompleteSink};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use scraper::{ProgressSink, ScraperConfig, SourceScraper};
