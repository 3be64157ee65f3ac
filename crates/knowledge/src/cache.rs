//! Single-slot TTL cache over the aggregator.
//!
//! One snapshot serves every caller. It is reused while
//! `now - fetched_at < ttl` and replaced wholesale afterwards. Concurrent
//! misses share one refresh: the first caller aggregates, the rest wait on
//! the refresh guard and then find the fresh slot.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::aggregator::KnowledgeAggregator;
use crate::clock::{Clock, SystemClock};
use crate::facts::StaticFacts;
use crate::snapshot::KnowledgeSnapshot;

struct CacheEntry {
    snapshot: Arc<KnowledgeSnapshot>,
    fetched_at: DateTime<Utc>,
}

pub struct KnowledgeCache {
    aggregator: KnowledgeAggregator,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<CacheEntry>>,
    refresh: Mutex<()>,
}

impl KnowledgeCache {
    /// Default snapshot lifetime.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

    pub fn new(aggregator: KnowledgeAggregator) -> Self {
        Self {
            aggregator,
            ttl: Self::DEFAULT_TTL,
            clock: Arc::new(SystemClock),
            slot: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn static_facts(&self) -> Arc<StaticFacts> {
        self.aggregator.static_facts()
    }

    pub fn source_name(&self) -> &str {
        self.aggregator.source_name()
    }

    /// The current snapshot, aggregating first when the slot is empty,
    /// expired, or `force_refresh` is set.
    pub async fn get_snapshot(&self, force_refresh: bool) -> Arc<KnowledgeSnapshot> {
        if !force_refresh {
            if let Some(snapshot) = self.fresh().await {
                debug!("Knowledge cache hit");
                return snapshot;
            }
        }

        let _guard = self.refresh.lock().await;

        // Someone else may have refreshed while we waited.
        if !force_refresh {
            if let Some(snapshot) = self.fresh().await {
                debug!("Knowledge cache filled by a concurrent refresh");
                return snapshot;
            }
        }

        debug!(force_refresh, "Knowledge cache miss, aggregating");
        let snapshot = Arc::new(self.aggregator.aggregate().await);
        let fetched_at = self.clock.now();
        *self.slot.write().await = Some(CacheEntry {
            snapshot: Arc::clone(&snapshot),
            fetched_at,
        });
        snapshot
    }

    /// Shorthand for `get_snapshot(false)`.
    pub async fn snapshot(&self) -> Arc<KnowledgeSnapshot> {
        self.get_snapshot(false).await
    }

    /// Shorthand for `get_snapshot(true)`.
    pub async fn refresh(&self) -> Arc<KnowledgeSnapshot> {
        self.get_snapshot(true).await
    }

    /// Empty the slot; the next read aggregates.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }

    /// When the cached snapshot was taken, if there is one.
    pub async fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.slot.read().await.as_ref().map(|e| e.fetched_at)
    }

    async fn fresh(&self) -> Option<Arc<KnowledgeSnapshot>> {
        let slot = self.slot.read().await;
        let entry = slot.as_ref()?;
        let age = self.clock.now().signed_duration_since(entry.fetched_at);
        // A clock that went backwards counts as fresh.
        let expired = age.to_std().map(|age| age >= self.ttl).unwrap_or(false);
        (!expired).then(|| Arc::clone(&entry.snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::in_memory::InMemorySource;
    use crate::test_helpers::{FailingSource, StallingSource};
    use chrono::TimeZone;

    fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap(),
        ))
    }

    fn cache_over(source: Arc<InMemorySource>, clock: Arc<ManualClock>) -> KnowledgeCache {
        let aggregator = KnowledgeAggregator::new(source, Arc::new(StaticFacts::default()));
        KnowledgeCache::new(aggregator).with_clock(clock)
    }

    #[tokio::test]
    async fn hit_within_ttl_reuses_snapshot_without_io() {
        let source = Arc::new(InMemorySource::new());
        let clock = manual_clock();
        let cache = cache_over(Arc::clone(&source), Arc::clone(&clock));

        let first = cache.get_snapshot(false).await;
        let calls_after_first = source.call_count();
        assert!(calls_after_first > 0);

        clock.advance(chrono::Duration::minutes(29));
        let second = cache.get_snapshot(false).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.call_count(), calls_after_first);
    }

    #[tokio::test]
    async fn expiry_triggers_exactly_one_refresh() {
        let source = Arc::new(InMemorySource::new());
        let clock = manual_clock();
        let cache = cache_over(Arc::clone(&source), Arc::clone(&clock));

        let first = cache.get_snapshot(false).await;
        let per_aggregation = source.call_count();

        clock.advance(chrono::Duration::minutes(30));
        let second = cache.get_snapshot(false).await;
        let third = cache.get_snapshot(false).await;

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &third));
        assert_eq!(source.call_count(), 2 * per_aggregation);
        assert_eq!(cache.fetched_at().await, Some(clock.now()));
    }

    #[tokio::test]
    async fn force_refresh_bypasses_a_fresh_slot() {
        let source = Arc::new(InMemorySource::new());
        let cache = cache_over(Arc::clone(&source), manual_clock());

        let first = cache.get_snapshot(false).await;
        let forced = cache.get_snapshot(true).await;
        assert!(!Arc::ptr_eq(&first, &forced));

        // The forced snapshot replaced the slot.
        let after = cache.get_snapshot(false).await;
        assert!(Arc::ptr_eq(&forced, &after));
    }

    #[tokio::test]
    async fn refresh_picks_up_new_records() {
        let source = Arc::new(InMemorySource::new());
        let cache = cache_over(Arc::clone(&source), manual_clock());

        assert!(cache.snapshot().await.news.is_empty());
        source
            .push_news(crate::snapshot::FeedItem {
                title: Some("STEMpower opens its 60th center".into()),
                description: None,
            })
            .await;
        // Still cached.
        assert!(cache.snapshot().await.news.is_empty());
        assert_eq!(cache.refresh().await.news.len(), 1);
    }

    #[tokio::test]
    async fn invalidate_empties_the_slot() {
        let source = Arc::new(InMemorySource::new());
        let cache = cache_over(Arc::clone(&source), manual_clock());

        cache.snapshot().await;
        assert!(cache.fetched_at().await.is_some());
        cache.invalidate().await;
        assert!(cache.fetched_at().await.is_none());

        let before = source.call_count();
        cache.snapshot().await;
        assert!(source.call_count() > before);
    }

    #[tokio::test]
    async fn failing_source_still_caches_static_facts() {
        let aggregator =
            KnowledgeAggregator::new(Arc::new(FailingSource), Arc::new(StaticFacts::default()));
        let cache = KnowledgeCache::new(aggregator);

        let snapshot = cache.snapshot().await;
        assert!(snapshot.static_facts.has_content());
        assert!(!snapshot.has_dynamic_content());
        assert_eq!(cache.ttl(), Duration::from_secs(1800));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_share_one_aggregation() {
        let source = Arc::new(StallingSource::slow(Duration::from_millis(200)));
        let aggregator = KnowledgeAggregator::new(
            Arc::clone(&source) as Arc<dyn crate::source::KnowledgeSource>,
            Arc::new(StaticFacts::default()),
        );
        let cache = Arc::new(KnowledgeCache::new(aggregator));

        let (a, b, c) = tokio::join!(cache.snapshot(), cache.snapshot(), cache.snapshot());

        assert_eq!(source.aggregations(), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
    }
}
