//! Time-bounded cache in front of the aggregation engine.
//!
//! One instance lives for the process lifetime, shared by every request
//! handler. The stored `(articles, fetched)` pair is only ever replaced
//! wholesale under the lock, so readers never observe articles from one
//! aggregation run paired with the timestamp of another.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use crate::feed::Aggregator;
use crate::model::Article;

/// A consistent view of the cache taken under a single lock acquisition.
#[derive(Clone)]
pub struct Snapshot {
    /// Merged articles, sorted newest-first
    pub articles: Arc<Vec<Article>>,
    /// Epoch seconds of the aggregation run that produced `articles`;
    /// `None` only before the first successful run
    pub last_updated: Option<i64>,
}

/// When the last aggregation finished, in both clocks we need: a monotonic
/// instant for freshness math and wall-clock epoch seconds for the API.
#[derive(Clone, Copy)]
struct FetchStamp {
    at: Instant,
    unix_secs: i64,
}

#[derive(Default)]
struct CacheState {
    articles: Arc<Vec<Article>>,
    fetched: Option<FetchStamp>,
}

/// Caches the most recent aggregation result for a freshness window.
///
/// The cache moves through three states, evaluated lazily on read: empty
/// (no run yet), fresh (last run younger than the TTL) and stale. Empty and
/// stale reads trigger a refresh; any successful refresh makes the cache
/// fresh again, even one that produced zero articles.
pub struct ArticleCache {
    aggregator: Aggregator,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl ArticleCache {
    pub fn new(aggregator: Aggregator, ttl: Duration) -> Self {
        Self {
            aggregator,
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Returns the cached articles, refreshing first if the cache is empty
    /// or the freshness window has elapsed.
    ///
    /// The freshness check and the refresh are intentionally not one
    /// critical section: two tasks that both observe a stale cache will
    /// both aggregate, and the last writer wins. Aggregation has no side
    /// effects beyond this cache, so the race is benign — what is never
    /// possible is a torn read of the stored pair.
    pub async fn read_or_refresh(&self) -> Snapshot {
        if let Some(snapshot) = self.fresh_snapshot() {
            return snapshot;
        }
        self.refresh().await
    }

    /// Unconditionally runs an aggregation cycle and commits the result,
    /// regardless of freshness.
    pub async fn force_refresh(&self) -> Snapshot {
        self.refresh().await
    }

    fn fresh_snapshot(&self) -> Option<Snapshot> {
        let state = self.lock_state();
        let stamp = state.fetched?;
        if stamp.at.elapsed() < self.ttl {
            Some(Snapshot {
                articles: Arc::clone(&state.articles),
                last_updated: Some(stamp.unix_secs),
            })
        } else {
            None
        }
    }

    async fn refresh(&self) -> Snapshot {
        // The network work runs outside the lock; only the commit holds it
        let articles = Arc::new(self.aggregator.aggregate_all().await);
        let stamp = FetchStamp {
            at: Instant::now(),
            unix_secs: Utc::now().timestamp(),
        };

        let mut state = self.lock_state();
        state.articles = Arc::clone(&articles);
        state.fetched = Some(stamp);

        Snapshot {
            articles,
            last_updated: Some(stamp.unix_secs),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CacheState> {
        // A poisoned lock still holds a consistent pair (both fields are
        // written before any await or panic point), so recover it
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FeedSource;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS_ONE_ITEM: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><title>Cached</title><pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate></item>
</channel></rss>"#;

    fn cache_for(server: &MockServer, ttl: Duration) -> ArticleCache {
        let sources = vec![FeedSource::new("A", format!("{}/feed", server.uri()))];
        let aggregator = Aggregator::new(
            reqwest::Client::new(),
            sources,
            Duration::from_millis(500),
            10,
        );
        ArticleCache::new(aggregator, ttl)
    }

    fn empty_cache(ttl: Duration) -> ArticleCache {
        let aggregator = Aggregator::new(
            reqwest::Client::new(),
            Vec::new(),
            Duration::from_millis(500),
            10,
        );
        ArticleCache::new(aggregator, ttl)
    }

    async fn mount_counted(server: &MockServer, expected_hits: u64) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS_ONE_ITEM))
            .expect(expected_hits)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_fresh_cache_serves_without_fetching() {
        let server = MockServer::start().await;
        mount_counted(&server, 1).await;

        let cache = cache_for(&server, Duration::from_secs(300));
        let first = cache.read_or_refresh().await;
        let second = cache.read_or_refresh().await;

        assert_eq!(first.articles.len(), 1);
        // Same committed snapshot, not merely equal contents
        assert!(Arc::ptr_eq(&first.articles, &second.articles));
        assert_eq!(first.last_updated, second.last_updated);
        // MockServer verifies the expected hit count of 1 on drop
    }

    #[tokio::test]
    async fn test_expired_cache_refetches() {
        let server = MockServer::start().await;
        mount_counted(&server, 2).await;

        // Zero TTL: every read observes an expired window
        let cache = cache_for(&server, Duration::ZERO);
        let first = cache.read_or_refresh().await;
        let second = cache.read_or_refresh().await;

        assert!(!Arc::ptr_eq(&first.articles, &second.articles));
        assert_eq!(second.articles.len(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_freshness() {
        let server = MockServer::start().await;
        // Two forced refreshes hit upstream twice; the plain read after
        // them is served from the fresh cache and adds no hit
        mount_counted(&server, 2).await;

        let cache = cache_for(&server, Duration::from_secs(300));
        cache.force_refresh().await;
        cache.force_refresh().await;

        let snapshot = cache.read_or_refresh().await;
        assert_eq!(snapshot.articles.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_freshness_window_elapses_with_time() {
        // Empty source list: refreshes do no network work, so virtual time
        // is safe to drive the TTL
        let cache = empty_cache(Duration::from_secs(300));

        let first = cache.read_or_refresh().await;
        assert!(first.last_updated.is_some());

        tokio::time::advance(Duration::from_secs(299)).await;
        let second = cache.read_or_refresh().await;
        assert!(Arc::ptr_eq(&first.articles, &second.articles));

        tokio::time::advance(Duration::from_secs(2)).await;
        let third = cache.read_or_refresh().await;
        assert!(!Arc::ptr_eq(&first.articles, &third.articles));
    }

    #[tokio::test]
    async fn test_empty_source_list_still_becomes_fresh() {
        let cache = empty_cache(Duration::from_secs(300));

        let snapshot = cache.read_or_refresh().await;
        assert!(snapshot.articles.is_empty());
        assert!(snapshot.last_updated.is_some());

        // Second read serves the committed empty result without refreshing
        let again = cache.read_or_refresh().await;
        assert!(Arc::ptr_eq(&snapshot.articles, &again.articles));
    }
}
