use crate::api::{ContentPlatform, RawComment, RawItem};
use crate::matcher::KeywordMatcher;
use crate::rate_limiter::RateLimiter;
use prospector_core::{Comment, CoreError, Post, ScrapeProgress, ScraperSettings};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::epoch_to_datetime;

/// Observer for progress events. The scraper emits a fresh snapshot after
/// every state change; the sink decides where it goes.
pub type ProgressSink = Arc<dyn Fn(ScrapeProgress) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Items fetched per source in the single listing call. Small on
    /// purpose: per-source latency stays predictable.
    pub batch_size: u32,
    pub comment_limit: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            comment_limit: 20,
        }
    }
}

impl From<&ScraperSettings> for ScraperConfig {
    fn from(settings: &ScraperSettings) -> Self {
        Self {
            batch_size: settings.batch_size,
            comment_limit: settings.comment_limit,
        }
    }
}

pub struct SourceScraper<P> {
    platform: Arc<P>,
    limiter: Arc<RateLimiter>,
    config: ScraperConfig,
}

impl<P: ContentPlatform> SourceScraper<P> {
    pub fn new(platform: Arc<P>, limiter: Arc<RateLimiter>, config: ScraperConfig) -> Self {
        Self {
            platform,
            limiter,
            config,
        }
    }

    /// Fetch one batch of recent items for `community` and keep the ones
    /// matching `keywords`. Writes its own terminal progress record before
    /// returning, including the `Error` record on failure, so each
    /// community key has a single writer.
    pub async fn scrape(
        &self,
        community: &str,
        keywords: &[String],
        on_progress: &ProgressSink,
    ) -> Result<Vec<Post>, CoreError> {
        let matcher = KeywordMatcher::new(keywords);
        let mut progress = ScrapeProgress::new(community);
        progress.begin();
        on_progress(progress.clone());

        if let Err(e) = self.limiter.wait().await {
            progress.fail(e.to_string());
            on_progress(progress);
            return Err(e);
        }

        let raw_items = match self
            .platform
            .fetch_new_items(community, self.config.batch_size)
            .await
        {
            Ok(items) => {
                self.limiter.record_success().await;
                items
            }
            Err(e) => {
                self.limiter.record_failure().await;
                warn!("Fetch failed for {}: {}", community, e);
                progress.fail(e.to_string());
                on_progress(progress);
                return Err(e);
            }
        };

        progress.total_items = raw_items.len() as u32;

        if raw_items.is_empty() {
            // An inactive source is a valid outcome, not an error.
            info!("{} returned no items", community);
            progress.complete();
            on_progress(progress);
            return Ok(Vec::new());
        }

        let mut posts = Vec::new();
        for value in raw_items {
            match serde_json::from_value::<RawItem>(value) {
                Ok(raw) => {
                    let text = format!("{} {}", raw.title, raw.body);
                    let matched = matcher.matches(&text);
                    if !matched.is_empty() {
                        debug!("Item {} matched {:?}", raw.id, matched);
                        posts.push(raw.into_post(community));
                    }
                }
                Err(e) => {
                    // Malformed items are skipped but still counted.
                    progress.push_error(format!("skipped malformed item: {}", e));
                }
            }
            progress.processed_items += 1;
            on_progress(progress.clone());
        }

        info!(
            "{}: {} of {} items matched",
            community, posts.len(), progress.total_items
        );
        progress.complete();
        on_progress(progress);
        Ok(posts)
    }

    /// Best-effort comment hydration. Never fails the pipeline: any
    /// problem returns the post unchanged. Idempotent, so calling it on an
    /// already-hydrated post is a no-op.
    pub async fn attach_comments(&self, post: Post) -> Post {
        if !post.comments.is_empty() {
            return post;
        }

        if let Err(e) = self.limiter.wait().await {
            debug!("Skipping comment hydration for {}: {}", post.id, e);
            return post;
        }

        match self
            .platform
            .fetch_comment_tree(&post.permalink, self.config.comment_limit)
            .await
        {
            Ok(tree) => {
                self.limiter.record_success().await;
                let mut post = post;
                post.comments = flatten_comments(&tree, 0, None);
                post
            }
            Err(e) => {
                self.limiter.record_failure().await;
                debug!("Comment fetch failed for {}: {}", post.id, e);
                post
            }
        }
    }
}

fn flatten_comments(tree: &[RawComment], depth: u32, parent_id: Option<&str>) -> Vec<Comment> {
    let mut out = Vec::new();
    for node in tree {
        out.push(Comment {
            id: node.id.clone(),
            body: node.body.clone(),
            author: node.author.clone(),
            score: node.score,
            depth,
            created_at: epoch_to_datetime(node.created_at),
            parent_id: parent_id.map(|p| p.to_string()),
        });
        out.extend(flatten_comments(&node.replies, depth + 1, Some(&node.id)));
    }
    out
}
