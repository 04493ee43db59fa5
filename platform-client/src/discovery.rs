use crate::api::{CommunitySummary, ContentPlatform};
use crate::fallback::fallback_communities;
use crate::rate_limiter::RateLimiter;
use chrono::Utc;
use prospector_core::{Community, CoreError, DiscoverySettings, QualityTier};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub results_per_keyword: u32,
    /// Communities below this floor are treated as noise.
    pub min_subscribers: u64,
    pub max_communities: usize,
    /// Constant score assigned to every discovered community. Discovery
    /// filters; it does not rank.
    pub relevance_score: f64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            results_per_keyword: 25,
            min_subscribers: 100,
            max_communities: 15,
            relevance_score: 0.75,
        }
    }
}

impl From<&DiscoverySettings> for DiscoveryConfig {
    fn from(settings: &DiscoverySettings) -> Self {
        Self {
            results_per_keyword: settings.results_per_keyword,
            min_subscribers: settings.min_subscribers,
            max_communities: settings.max_communities,
            ..Default::default()
        }
    }
}

/// Rough posting cadence from engagement numbers. Display metadata only.
pub(crate) fn estimate_posts_per_day(active_users: Option<u64>, subscribers: u64) -> f64 {
    let active = active_users.unwrap_or(subscribers / 100);
    (active as f64 * 0.05).max(1.0)
}

pub struct CommunityDiscoverer<P> {
    platform: Arc<P>,
    limiter: Arc<RateLimiter>,
    config: DiscoveryConfig,
}

impl<P: ContentPlatform> CommunityDiscoverer<P> {
    pub fn new(platform: Arc<P>, limiter: Arc<RateLimiter>, config: DiscoveryConfig) -> Self {
        Self {
            platform,
            limiter,
            config,
        }
    }

    /// Search the platform once per keyword and aggregate the results.
    /// Individual keyword failures are recorded and skipped; the call only
    /// fails when every keyword died in transit. An empty-but-reachable
    /// result set degrades to the curated fallback list.
    pub async fn discover(&self, keywords: &[String]) -> Result<Vec<Community>, CoreError> {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(CoreError::InvalidInput {
                message: "at least one non-empty keyword is required for discovery".to_string(),
            });
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut communities: Vec<Community> = Vec::new();
        let mut any_response = false;
        let mut last_error: Option<CoreError> = None;

        for keyword in &keywords {
            if let Err(e) = self.limiter.wait().await {
                warn!("Skipping keyword '{}': {}", keyword, e);
                last_error = Some(e);
                continue;
            }

            let summaries = match self
                .platform
                .search_communities(keyword, self.config.results_per_keyword)
                .await
            {
                Ok(summaries) => {
                    self.limiter.record_success().await;
                    any_response = true;
                    summaries
                }
                Err(e) => {
                    self.limiter.record_failure().await;
                    warn!("Search failed for keyword '{}': {}", keyword, e);
                    last_error = Some(e);
                    continue;
                }
            };

            for summary in summaries {
                let canonical = summary.name.to_lowercase();
                if summary.nsfw {
                    debug!("Excluding adult community {}", summary.name);
                    continue;
                }
                if seen.contains(&canonical) {
                    continue;
                }
                if summary.subscribers < self.config.min_subscribers {
                    debug!(
                        "Excluding {} ({} subscribers, floor {})",
                        summary.name, summary.subscribers, self.config.min_subscribers
                    );
                    continue;
                }

                seen.insert(canonical);
                communities.push(self.build_community(summary, keyword));
            }
        }

        if communities.is_empty() {
            if !any_response {
                if let Some(e) = last_error {
                    warn!("Discovery failed for every keyword");
                    return Err(e);
                }
            }
            return Ok(fallback_communities(&keywords));
        }

        communities.sort_by(|a, b| b.subscribers.cmp(&a.subscribers));
        communities.truncate(self.config.max_communities);

        info!(
            "Discovered {} communities from {} keywords",
            communities.len(),
            keywords.len()
        );
        Ok(communities)
    }

    fn build_community(&self, summary: CommunitySummary, keyword: &str) -> Community {
        let display_name = summary
            .display_name
            .clone()
            .unwrap_or_else(|| summary.name.clone());
        Community {
            id: summary.name.to_lowercase(),
            name: summary.name,
            display_name,
            description: summary.description,
            subscribers: summary.subscribers,
            active_users: summary.active_users.unwrap_or(summary.subscribers / 100),
            posts_per_day: estimate_posts_per_day(summary.active_users, summary.subscribers),
            relevance_score: self.config.relevance_score,
            tier: QualityTier::for_subscribers(summary.subscribers),
            tags: vec![keyword.to_string()],
            last_updated: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RawComment;
    use crate::rate_limiter::RateLimiterConfig;
    use prospector_core::PlatformApiError;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::time::Duration;

    struct StubSearch {
        by_keyword: HashMap<String, Vec<CommunitySummary>>,
        fail_all: bool,
    }

    impl ContentPlatform for StubSearch {
        async fn search_communities(
            &self,
            query: &str,
            _limit: u32,
        ) -> Result<Vec<CommunitySummary>, CoreError> {
            if self.fail_all {
                return Err(PlatformApiError::ServerError { status_code: 502 }.into());
            }
            Ok(self.by_keyword.get(query).cloned().unwrap_or_default())
        }

        async fn fetch_new_items(
            &self,
            _community: &str,
            _limit: u32,
        ) -> Result<Vec<Value>, CoreError> {
            Ok(Vec::new())
        }

        async fn fetch_comment_tree(
            &self,
            _permalink: &str,
            _limit: u32,
        ) -> Result<Vec<RawComment>, CoreError> {
            Ok(Vec::new())
        }
    }

    fn summary(name: &str, subscribers: u64, nsfw: bool) -> CommunitySummary {
        CommunitySummary {
            name: name.to_string(),
            display_name: None,
            description: format!("about {}", name),
            subscribers,
            active_users: Some(subscribers / 50),
            nsfw,
        }
    }

    fn fast_limiter() -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(RateLimiterConfig {
            min_interval: Duration::from_millis(1),
            failure_threshold: 10,
            cooldown: Duration::from_millis(50),
        }))
    }

    fn discoverer(stub: StubSearch) -> CommunityDiscoverer<StubSearch> {
        CommunityDiscoverer::new(Arc::new(stub), fast_limiter(), DiscoveryConfig::default())
    }

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[tokio::test]
    async fn filters_dedupes_and_sorts() {
        let mut by_keyword = HashMap::new();
        by_keyword.insert(
            "saas".to_string(),
            vec![
                summary("bigone", 50_000, false),
                summary("nsfwplace", 90_000, true),
                summary("tiny", 10, false),
                summary("middling", 5_000, false),
            ],
        );
        by_keyword.insert(
            "pricing".to_string(),
            // Dedupe is canonical-name based, case-insensitive.
            vec![summary("BigOne", 50_000, false), summary("other", 2_000, false)],
        );

        let result = discoverer(StubSearch {
            by_keyword,
            fail_all: false,
        })
        .discover(&kw(&["saas", "pricing"]))
        .await
        .unwrap();

        let names: Vec<&str> = result.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["bigone", "middling", "other"]);
        assert_eq!(result[0].tier, QualityTier::High);
        assert_eq!(result[1].tier, QualityTier::Medium);
        assert_eq!(result[0].tags, vec!["saas".to_string()]);
    }

    #[tokio::test]
    async fn truncates_to_configured_maximum() {
        let many: Vec<CommunitySummary> = (0..30)
            .map(|i| summary(&format!("community{}", i), 1_000 + i as u64, false))
            .collect();
        let mut by_keyword = HashMap::new();
        by_keyword.insert("dev".to_string(), many);

        let result = discoverer(StubSearch {
            by_keyword,
            fail_all: false,
        })
        .discover(&kw(&["dev"]))
        .await
        .unwrap();

        assert_eq!(result.len(), DiscoveryConfig::default().max_communities);
    }

    #[tokio::test]
    async fn empty_results_fall_back_to_curated_list() {
        let result = discoverer(StubSearch {
            by_keyword: HashMap::new(),
            fail_all: false,
        })
        .discover(&kw(&["obscure-niche-topic"]))
        .await
        .unwrap();

        assert!(!result.is_empty());
        assert!(result.iter().all(|c| c.tags.contains(&"curated".to_string())));
    }

    #[tokio::test]
    async fn total_transport_failure_propagates() {
        let result = discoverer(StubSearch {
            by_keyword: HashMap::new(),
            fail_all: true,
        })
        .discover(&kw(&["saas"]))
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn partial_failure_still_yields_results() {
        let mut by_keyword = HashMap::new();
        by_keyword.insert("good".to_string(), vec![summary("found", 3_000, false)]);

        // "missing" yields nothing but the request itself succeeds, so the
        // aggregate from "good" survives.
        let result = discoverer(StubSearch {
            by_keyword,
            fail_all: false,
        })
        .discover(&kw(&["missing", "good"]))
        .await
        .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "found");
    }

    #[tokio::test]
    async fn rejects_empty_keyword_list() {
        let result = discoverer(StubSearch {
            by_keyword: HashMap::new(),
            fail_all: false,
        })
        .discover(&[])
        .await;

        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
    }
}
