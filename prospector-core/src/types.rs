use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quality tier derived from subscriber count. Thresholds are deliberately
/// coarse: tiering is a display hint, not a ranking signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    High,
    Medium,
    Low,
}

impl QualityTier {
    pub const HIGH_FLOOR: u64 = 10_000;
    pub const MEDIUM_FLOOR: u64 = 1_000;

    pub fn for_subscribers(subscribers: u64) -> Self {
        if subscribers >= Self::HIGH_FLOOR {
            QualityTier::High
        } else if subscribers >= Self::MEDIUM_FLOOR {
            QualityTier::Medium
        } else {
            QualityTier::Low
        }
    }
}

/// A community returned by discovery. Immutable once returned; downstream
/// code only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub subscribers: u64,
    pub active_users: u64,
    pub posts_per_day: f64,
    pub relevance_score: f64,
    pub tier: QualityTier,
    pub tags: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

/// A scraped content unit. Built by the scraper from raw API payloads and
/// owned by the orchestrator's result collection afterwards. `comments`
/// stays empty unless hydration is requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub body: String,
    pub author: String,
    pub score: i64,
    pub upvote_ratio: f64,
    pub num_comments: u32,
    pub created_at: DateTime<Utc>,
    pub community: String,
    pub permalink: String,
    pub nsfw: bool,
    pub pinned: bool,
    pub flair: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub author: String,
    pub score: i64,
    pub depth: u32,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<String>,
}

/// Per-source run state. Status only ever moves forward through
/// Pending -> InProgress -> (Completed | Error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrapeStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

impl ScrapeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScrapeStatus::Completed | ScrapeStatus::Error)
    }

    /// Forward-only transition check. Re-asserting the current status is
    /// allowed so that processed-count updates can be upserted freely.
    pub fn can_transition_to(&self, next: ScrapeStatus) -> bool {
        use ScrapeStatus::*;
        match (self, next) {
            (a, b) if *a == b => true,
            (Pending, InProgress) => true,
            (Pending, Completed) | (Pending, Error) => true,
            (InProgress, Completed) | (InProgress, Error) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeProgress {
    pub community: String,
    pub total_items: u32,
    pub processed_items: u32,
    pub status: ScrapeStatus,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScrapeProgress {
    pub fn new(community: impl Into<String>) -> Self {
        Self {
            community: community.into(),
            total_items: 0,
            processed_items: 0,
            status: ScrapeStatus::Pending,
            errors: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn begin(&mut self) {
        self.status = ScrapeStatus::InProgress;
    }

    pub fn complete(&mut self) {
        self.status = ScrapeStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = ScrapeStatus::Error;
        self.errors.push(message.into());
        self.finished_at = Some(Utc::now());
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_tier_thresholds() {
        assert_eq!(QualityTier::for_subscribers(50_000), QualityTier::High);
        assert_eq!(QualityTier::for_subscribers(10_000), QualityTier::High);
        assert_eq!(QualityTier::for_subscribers(9_999), QualityTier::Medium);
        assert_eq!(QualityTier::for_subscribers(1_000), QualityTier::Medium);
        assert_eq!(QualityTier::for_subscribers(999), QualityTier::Low);
        assert_eq!(QualityTier::for_subscribers(0), QualityTier::Low);
    }

    #[test]
    fn status_transitions_only_move_forward() {
        use ScrapeStatus::*;

        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Error));
        assert!(Pending.can_transition_to(Completed));

        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Error.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Pending));

        // Same-status upserts are fine while non-terminal and harmless
        // when terminal (last-writer-wins per key).
        assert!(InProgress.can_transition_to(InProgress));
        assert!(Completed.can_transition_to(Completed));
    }

    #[test]
    fn progress_lifecycle() {
        let mut progress = ScrapeProgress::new("rustdev");
        assert_eq!(progress.status, ScrapeStatus::Pending);
        assert!(progress.finished_at.is_none());

        progress.begin();
        assert_eq!(progress.status, ScrapeStatus::InProgress);

        progress.complete();
        assert_eq!(progress.status, ScrapeStatus::Completed);
        assert!(progress.finished_at.is_some());

        let mut failed = ScrapeProgress::new("ghosttown");
        failed.begin();
        failed.fail("connection reset");
        assert_eq!(failed.status, ScrapeStatus::Error);
        assert_eq!(failed.errors, vec!["connection reset".to_string()]);
        assert!(failed.finished_at.is_some());
    }
}
