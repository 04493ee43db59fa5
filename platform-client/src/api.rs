use chrono::{DateTime, Utc};
use prospector_core::{CoreError, PlatformApiError, PlatformSettings, Post};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// Community summary as returned by the platform's search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subscribers: u64,
    #[serde(default)]
    pub active_users: Option<u64>,
    #[serde(default)]
    pub nsfw: bool,
}

/// One item from a community listing. `id`, `title`, `permalink` and
/// `created_at` are required; an item missing them is malformed and gets
/// skipped by the scraper without failing the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "deleted_author")]
    pub author: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default = "full_ratio")]
    pub ratio: f64,
    #[serde(default)]
    pub num_comments: u32,
    pub created_at: f64,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub flair: Option<String>,
    pub permalink: String,
}

fn deleted_author() -> String {
    "[deleted]".to_string()
}

fn full_ratio() -> f64 {
    1.0
}

impl RawItem {
    pub fn into_post(self, community: &str) -> Post {
        Post {
            id: self.id,
            title: self.title,
            body: self.body,
            author: self.author,
            score: self.score,
            upvote_ratio: self.ratio,
            num_comments: self.num_comments,
            created_at: epoch_to_datetime(self.created_at),
            community: community.to_string(),
            permalink: self.permalink,
            nsfw: self.nsfw,
            pinned: self.pinned,
            flair: self.flair,
            comments: Vec::new(),
        }
    }
}

/// One node of the nested comment tree returned by the comment endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawComment {
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "deleted_author")]
    pub author: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_at: f64,
    #[serde(default)]
    pub replies: Vec<RawComment>,
}

pub(crate) fn epoch_to_datetime(epoch_secs: f64) -> DateTime<Utc> {
    DateTime::from_timestamp(epoch_secs as i64, 0).unwrap_or_else(Utc::now)
}

/// The seam between the pipeline and the upstream HTTP API. Tests inject
/// scripted implementations; production uses [`HttpPlatform`].
pub trait ContentPlatform: Send + Sync {
    /// `GET /search?query=<kw>&type=community&limit=N`
    fn search_communities(
        &self,
        query: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<CommunitySummary>, CoreError>> + Send;

    /// `GET /<community>/new?limit=N`. Items come back as raw JSON values
    /// so a malformed item stays a per-item problem, not a request failure.
    fn fetch_new_items(
        &self,
        community: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Value>, CoreError>> + Send;

    /// `GET <permalink>?limit=K&sort=top`
    fn fetch_comment_tree(
        &self,
        permalink: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<RawComment>, CoreError>> + Send;
}

#[derive(Debug)]
pub struct HttpPlatform {
    http_client: Client,
    base_url: String,
}

impl HttpPlatform {
    pub fn new(settings: &PlatformSettings) -> Result<Self, CoreError> {
        // Validate up front so a bad base URL fails before any crawl starts.
        Url::parse(&settings.base_url).map_err(|e| CoreError::InvalidInput {
            message: format!("invalid platform base URL '{}': {}", settings.base_url, e),
        })?;

        let http_client = Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(CoreError::Network)?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Platform request: GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!("Network error for GET {}: {}", path, e);
                if e.is_timeout() {
                    CoreError::Platform(PlatformApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        self.check_status(response, path).await
    }

    async fn check_status(&self, response: Response, path: &str) -> Result<Response, CoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        error!("Request failed with status {} for {}", status, path);
        let err = match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                PlatformApiError::RateLimitExceeded { retry_after }
            }
            403 => PlatformApiError::Forbidden {
                resource: path.to_string(),
            },
            404 => PlatformApiError::CommunityNotFound {
                community: path.trim_start_matches('/').to_string(),
            },
            code if status.is_server_error() => PlatformApiError::ServerError { status_code: code },
            code => PlatformApiError::InvalidResponse {
                details: format!("unexpected status {} for {}", code, path),
            },
        };
        Err(err.into())
    }
}

impl ContentPlatform for HttpPlatform {
    async fn search_communities(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<CommunitySummary>, CoreError> {
        let response = self
            .get(
                "/search",
                &[
                    ("query", query.to_string()),
                    ("type", "community".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let results: Vec<CommunitySummary> = response.json().await.map_err(|e| {
            error!("Failed to parse community search results: {}", e);
            CoreError::Platform(PlatformApiError::InvalidResponse {
                details: format!("failed to parse search results for '{}'", query),
            })
        })?;

        info!("Search '{}' returned {} communities", query, results.len());
        Ok(results)
    }

    async fn fetch_new_items(&self, community: &str, limit: u32) -> Result<Vec<Value>, CoreError> {
        let path = format!("/{}/new", community);
        let response = self.get(&path, &[("limit", limit.to_string())]).await?;

        let items: Vec<Value> = response.json().await.map_err(|e| {
            error!("Failed to parse listing for {}: {}", community, e);
            CoreError::Platform(PlatformApiError::InvalidResponse {
                details: format!("failed to parse listing for {}", community),
            })
        })?;

        info!("Fetched {} items from {}", items.len(), community);
        Ok(items)
    }

    async fn fetch_comment_tree(
        &self,
        permalink: &str,
        limit: u32,
    ) -> Result<Vec<RawComment>, CoreError> {
        let response = self
            .get(
                permalink,
                &[("limit", limit.to_string()), ("sort", "top".to_string())],
            )
            .await?;

        let comments: Vec<RawComment> = response.json().await.map_err(|e| {
            error!("Failed to parse comment tree for {}: {}", permalink, e);
            CoreError::Platform(PlatformApiError::InvalidResponse {
                details: format!("failed to parse comments for {}", permalink),
            })
        })?;

        debug!(
            "Fetched {} top-level comments for {}",
            comments.len(),
            permalink
        );
        Ok(comments)
    }
}
