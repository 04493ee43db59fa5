use crawl_service::CrawlService;
use platform_client::HttpPlatform;
use prospector_core::{AppConfig, CoreError};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    tracing_subscriber::fmt()
        .with_env_filter("prospector=debug,platform_client=debug,crawl_service=debug")
        .init();

    tracing::info!("Starting Prospector - community content discovery");

    let keywords: Vec<String> = std::env::args().skip(1).collect();
    if keywords.is_empty() {
        return Err(CoreError::InvalidInput {
            message: "usage: prospector <keyword> [keyword ...]".to_string(),
        });
    }

    let config = AppConfig::from_env_or_default()?;
    let platform = Arc::new(HttpPlatform::new(&config.platform)?);
    let service = CrawlService::new(platform, config);

    tracing::info!("Discovering communities for {:?}", keywords);
    let communities = service.discover(&keywords).await?;
    for community in &communities {
        tracing::info!(
            "  {} ({} subscribers, ~{:.0} posts/day)",
            community.name,
            community.subscribers,
            community.posts_per_day
        );
    }

    let session_id = Uuid::new_v4().to_string();
    let names: Vec<String> = communities.iter().map(|c| c.name.clone()).collect();
    service.start_crawl(&session_id, names, keywords)?;

    let outcome = service.poller().wait_for_completion(&session_id).await?;
    if outcome.timed_out {
        tracing::warn!("Crawl timed out; results below are partial");
    }

    for progress in &outcome.progress {
        tracing::info!(
            "  {}: {:?}, {} of {} items, {} errors",
            progress.community,
            progress.status,
            progress.processed_items,
            progress.total_items,
            progress.errors.len()
        );
    }
    tracing::info!(
        "Collected {} matching items from {} communities",
        outcome.posts.len(),
        communities.len()
    );

    for post in outcome.posts.iter().take(20) {
        tracing::info!("  [{}] {} ({})", post.community, post.title, post.permalink);
    }

    service.store().remove_session(&session_id);
    Ok(())
}
