use crate::scrape::extract::extract_promotions;
use crate::scrape::fetcher::{FetchError, PageSource};
use crate::scrape::types::PromotionSnapshot;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub fetched_at: DateTime<Utc>,
    pub payload: Arc<PromotionSnapshot>,
}

/// Source of wall-clock time; swapped out in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Last successful scrape, reused while younger than the staleness window.
///
/// The lock only guards the slot; it is released before fetching, so
/// concurrent refreshes may both hit upstream and the later write wins.
/// The window starts when a fetch completes.
pub struct PromotionCache {
    source: Arc<dyn PageSource>,
    site_base: Url,
    ttl: Duration,
    clock: Clock,
    entry: RwLock<Option<CacheEntry>>,
}

impl PromotionCache {
    pub fn new(source: Arc<dyn PageSource>, site_base: Url, ttl: Duration) -> Self {
        Self::with_clock(source, site_base, ttl, Arc::new(Utc::now))
    }

    pub fn with_clock(
        source: Arc<dyn PageSource>,
        site_base: Url,
        ttl: Duration,
        clock: Clock,
    ) -> Self {
        Self {
            source,
            site_base,
            ttl,
            clock,
            entry: RwLock::new(None),
        }
    }

    pub async fn get_or_refresh(&self) -> Result<Arc<PromotionSnapshot>, FetchError> {
        let now = (self.clock)();
        if let Some(entry) = self.entry.read().await.as_ref() {
            if self.is_fresh(entry, now) {
                return Ok(entry.payload.clone());
            }
        }

        let previous = self.fetched_at().await;
        let markup = self.source.fetch_page().await.map_err(|e| {
            tracing::error!("Refreshing promotions failed: {}", e);
            e
        })?;
        let payload = Arc::new(extract_promotions(&markup, &self.site_base));
        let fetched_at = (self.clock)();

        tracing::info!(
            "Refreshed promotions cache: {} items, {} upcoming (previous fetch: {:?})",
            payload.items.len(),
            payload.upcoming.len(),
            previous
        );

        *self.entry.write().await = Some(CacheEntry {
            fetched_at,
            payload: payload.clone(),
        });

        Ok(payload)
    }

    pub async fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.entry.read().await.as_ref().map(|entry| entry.fetched_at)
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let age_ms = now.signed_duration_since(entry.fetched_at).num_milliseconds();
        i128::from(age_ms) < self.ttl.as_millis() as i128
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub(crate) const PAGE: &str = r#"
        <table>
          <tr><td><a href="/app/123/">Game X</a> Free Weekend</td></tr>
        </table>
        <h2>Potentially Upcoming Free Promotions</h2>
        <ul><li>Game Y</li></ul>
    "#;

    /// Hand-driven clock shared between a cache and its fake source.
    #[derive(Clone)]
    pub(crate) struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

    impl ManualClock {
        pub(crate) fn starting_at(t: DateTime<Utc>) -> Self {
            Self(Arc::new(Mutex::new(t)))
        }

        pub(crate) fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }

        pub(crate) fn set(&self, t: DateTime<Utc>) {
            *self.0.lock().unwrap() = t;
        }

        pub(crate) fn advance(&self, by: chrono::Duration) {
            let next = self.now() + by;
            self.set(next);
        }

        fn as_clock(&self) -> Clock {
            let handle = self.clone();
            Arc::new(move || handle.now())
        }
    }

    /// Serves a fixed page and counts fetches; can be switched to fail.
    /// When given a clock, each fetch moves it forward by `fetch_takes`.
    pub(crate) struct FakeSource {
        pub calls: AtomicUsize,
        pub failing: AtomicBool,
        clock: Option<(ManualClock, chrono::Duration)>,
    }

    impl FakeSource {
        pub(crate) fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                clock: None,
            }
        }

        pub(crate) fn taking(clock: ManualClock, fetch_takes: chrono::Duration) -> Self {
            Self {
                clock: Some((clock, fetch_takes)),
                ..Self::new()
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn fetch_page(&self) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some((clock, fetch_takes)) = &self.clock {
                clock.advance(*fetch_takes);
            }
            if self.failing.load(Ordering::SeqCst) {
                Err(FetchError::Status { status: 502 })
            } else {
                Ok(PAGE.to_string())
            }
        }
    }

    fn site_base() -> Url {
        Url::parse("https://steamdb.info").unwrap()
    }

    pub(crate) fn cache_with(source: Arc<FakeSource>) -> PromotionCache {
        PromotionCache::new(source, site_base(), Duration::from_secs(5 * 60))
    }

    fn cache_on(source: Arc<FakeSource>, clock: &ManualClock) -> PromotionCache {
        PromotionCache::with_clock(
            source,
            site_base(),
            Duration::from_secs(5 * 60),
            clock.as_clock(),
        )
    }

    #[tokio::test]
    async fn test_second_call_within_window_is_served_from_cache() {
        let t0 = Utc::now();
        let clock = ManualClock::starting_at(t0);
        let source = Arc::new(FakeSource::new());
        let cache = cache_on(source.clone(), &clock);

        let first = cache.get_or_refresh().await.unwrap();
        clock.set(t0 + chrono::Duration::seconds(299));
        let second = cache.get_or_refresh().await.unwrap();

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.items[0].app_id, "123");
        assert_eq!(first.upcoming, vec!["Game Y"]);
        assert_eq!(cache.fetched_at().await, Some(t0));
    }

    #[tokio::test]
    async fn test_call_after_window_refetches() {
        let t0 = Utc::now();
        let later = t0 + chrono::Duration::minutes(5);
        let clock = ManualClock::starting_at(t0);
        let source = Arc::new(FakeSource::new());
        let cache = cache_on(source.clone(), &clock);

        cache.get_or_refresh().await.unwrap();
        clock.set(later);
        cache.get_or_refresh().await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(cache.fetched_at().await, Some(later));
    }

    #[tokio::test]
    async fn test_window_starts_when_fetch_completes() {
        let t0 = Utc::now();
        let clock = ManualClock::starting_at(t0);
        let source = Arc::new(FakeSource::taking(
            clock.clone(),
            chrono::Duration::seconds(20),
        ));
        let cache = cache_on(source.clone(), &clock);

        cache.get_or_refresh().await.unwrap();
        assert_eq!(cache.fetched_at().await, Some(t0 + chrono::Duration::seconds(20)));

        // Five minutes after the request started, but not after the fetch finished.
        clock.set(t0 + chrono::Duration::seconds(310));
        cache.get_or_refresh().await.unwrap();
        assert_eq!(source.calls(), 1);

        clock.set(t0 + chrono::Duration::seconds(320));
        cache.get_or_refresh().await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_propagates_and_keeps_existing_entry() {
        let t0 = Utc::now();
        let clock = ManualClock::starting_at(t0);
        let source = Arc::new(FakeSource::new());
        let cache = cache_on(source.clone(), &clock);

        let original = cache.get_or_refresh().await.unwrap();
        source.failing.store(true, Ordering::SeqCst);

        clock.set(t0 + chrono::Duration::minutes(10));
        let result = cache.get_or_refresh().await;
        assert!(matches!(result, Err(FetchError::Status { status: 502 })));
        assert_eq!(cache.fetched_at().await, Some(t0));

        // Still inside the window of the kept entry: served without I/O.
        source.failing.store(false, Ordering::SeqCst);
        clock.set(t0 + chrono::Duration::minutes(1));
        let again = cache.get_or_refresh().await.unwrap();
        assert!(Arc::ptr_eq(&original, &again));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_on_empty_cache_stores_nothing() {
        let source = Arc::new(FakeSource::new());
        source.failing.store(true, Ordering::SeqCst);
        let cache = cache_with(source.clone());

        assert!(cache.get_or_refresh().await.is_err());
        assert!(cache.fetched_at().await.is_none());
    }
}
