use platform_client::CancelHandle;
use prospector_core::{Post, ScrapeProgress, SessionError};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug)]
struct SessionEntry {
    communities: Vec<String>,
    keywords: Vec<String>,
    progress: HashMap<String, ScrapeProgress>,
    posts: Vec<Post>,
    cancel: CancelHandle,
    created_at: Instant,
}

/// Session-keyed progress and result store. The only mutable state shared
/// between the crawl flow and the observation flow; progress writes are
/// upserts keyed by (session, community), last-writer-wins per key.
///
/// Short synchronous critical sections behind a std lock so both async
/// tasks and plain callbacks can write.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_session(
        &self,
        session_id: &str,
        communities: Vec<String>,
        keywords: Vec<String>,
    ) -> Result<CancelHandle, SessionError> {
        let mut sessions = self.sessions.write().unwrap();
        if sessions.contains_key(session_id) {
            return Err(SessionError::AlreadyExists {
                session_id: session_id.to_string(),
            });
        }

        let cancel = CancelHandle::new();
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                communities,
                keywords,
                progress: HashMap::new(),
                posts: Vec::new(),
                cancel: cancel.clone(),
                created_at: Instant::now(),
            },
        );
        debug!("Created crawl session {}", session_id);
        Ok(cancel)
    }

    /// Upsert one community's progress record. Regressions (backwards
    /// status transitions or shrinking processed counts) are dropped with
    /// a warning rather than overwriting newer state.
    pub fn upsert_progress(
        &self,
        session_id: &str,
        progress: ScrapeProgress,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().unwrap();
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound {
                session_id: session_id.to_string(),
            })?;

        if let Some(existing) = entry.progress.get(&progress.community) {
            if !existing.status.can_transition_to(progress.status) {
                warn!(
                    "Dropping progress regression for {}/{}: {:?} -> {:?}",
                    session_id, progress.community, existing.status, progress.status
                );
                return Ok(());
            }
            if progress.processed_items < existing.processed_items {
                warn!(
                    "Dropping shrinking processed count for {}/{}: {} -> {}",
                    session_id,
                    progress.community,
                    existing.processed_items,
                    progress.processed_items
                );
                return Ok(());
            }
        }

        entry.progress.insert(progress.community.clone(), progress);
        Ok(())
    }

    pub fn append_posts(&self, session_id: &str, posts: Vec<Post>) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().unwrap();
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound {
                session_id: session_id.to_string(),
            })?;
        entry.posts.extend(posts);
        Ok(())
    }

    pub fn get_progress(&self, session_id: &str) -> Result<Vec<ScrapeProgress>, SessionError> {
        let sessions = self.sessions.read().unwrap();
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound {
                session_id: session_id.to_string(),
            })?;
        Ok(entry.progress.values().cloned().collect())
    }

    /// Whatever has accumulated so far. Valid at any point in the crawl.
    pub fn get_posts(&self, session_id: &str) -> Result<Vec<Post>, SessionError> {
        let sessions = self.sessions.read().unwrap();
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound {
                session_id: session_id.to_string(),
            })?;
        Ok(entry.posts.clone())
    }

    /// The community list the session was requested with, used by the
    /// poller for completion detection.
    pub fn communities(&self, session_id: &str) -> Result<Vec<String>, SessionError> {
        let sessions = self.sessions.read().unwrap();
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound {
                session_id: session_id.to_string(),
            })?;
        Ok(entry.communities.clone())
    }

    pub fn keywords(&self, session_id: &str) -> Result<Vec<String>, SessionError> {
        let sessions = self.sessions.read().unwrap();
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound {
                session_id: session_id.to_string(),
            })?;
        Ok(entry.keywords.clone())
    }

    pub fn cancel(&self, session_id: &str) -> Result<(), SessionError> {
        let sessions = self.sessions.read().unwrap();
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound {
                session_id: session_id.to_string(),
            })?;
        entry.cancel.cancel();
        Ok(())
    }

    pub fn remove_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().unwrap().remove(session_id).is_some();
        if removed {
            debug!("Removed crawl session {}", session_id);
        }
        removed
    }

    /// Drop sessions older than `ttl`. Returns how many were pruned.
    pub fn prune_expired(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.created_at.elapsed() < ttl);
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!("Pruned {} expired crawl sessions", pruned);
        }
        pruned
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_core::ScrapeStatus;

    fn progress(community: &str, status: ScrapeStatus, processed: u32) -> ScrapeProgress {
        let mut p = ScrapeProgress::new(community);
        p.status = status;
        p.processed_items = processed;
        p
    }

    #[test]
    fn duplicate_session_rejected() {
        let store = SessionStore::new();
        store
            .create_session("s1", vec!["a".to_string()], Vec::new())
            .unwrap();
        let err = store
            .create_session("s1", vec!["b".to_string()], Vec::new())
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyExists { .. }));
    }

    #[test]
    fn unknown_session_is_an_error() {
        let store = SessionStore::new();
        assert!(store.get_progress("missing").is_err());
        assert!(store.get_posts("missing").is_err());
        assert!(store
            .upsert_progress("missing", progress("a", ScrapeStatus::Pending, 0))
            .is_err());
    }

    #[test]
    fn upsert_drops_status_regressions() {
        let store = SessionStore::new();
        store
            .create_session("s1", vec!["a".to_string()], Vec::new())
            .unwrap();

        store
            .upsert_progress("s1", progress("a", ScrapeStatus::Completed, 5))
            .unwrap();
        // A stale in-progress snapshot arriving late must not regress the
        // terminal record.
        store
            .upsert_progress("s1", progress("a", ScrapeStatus::InProgress, 6))
            .unwrap();

        let records = store.get_progress("s1").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ScrapeStatus::Completed);
        assert_eq!(records[0].processed_items, 5);
    }

    #[test]
    fn upsert_drops_shrinking_processed_counts() {
        let store = SessionStore::new();
        store
            .create_session("s1", vec!["a".to_string()], Vec::new())
            .unwrap();

        store
            .upsert_progress("s1", progress("a", ScrapeStatus::InProgress, 4))
            .unwrap();
        store
            .upsert_progress("s1", progress("a", ScrapeStatus::InProgress, 2))
            .unwrap();

        let records = store.get_progress("s1").unwrap();
        assert_eq!(records[0].processed_items, 4);
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new();
        store
            .create_session("s1", vec!["a".to_string()], Vec::new())
            .unwrap();
        store
            .create_session("s2", vec!["a".to_string()], Vec::new())
            .unwrap();

        store
            .upsert_progress("s1", progress("a", ScrapeStatus::InProgress, 1))
            .unwrap();

        assert_eq!(store.get_progress("s1").unwrap().len(), 1);
        assert!(store.get_progress("s2").unwrap().is_empty());
    }

    #[test]
    fn prune_removes_only_expired_sessions() {
        let store = SessionStore::new();
        store.create_session("s1", Vec::new(), Vec::new()).unwrap();

        assert_eq!(store.prune_expired(Duration::from_secs(60)), 0);
        assert_eq!(store.session_count(), 1);

        assert_eq!(store.prune_expired(Duration::from_nanos(0)), 1);
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn cancel_reaches_the_session_handle() {
        let store = SessionStore::new();
        let handle = store
            .create_session("s1", vec!["a".to_string()], Vec::new())
            .unwrap();
        assert!(!handle.is_cancelled());

        store.cancel("s1").unwrap();
        assert!(handle.is_cancelled());
    }
}
