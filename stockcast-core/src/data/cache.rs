//! Bounded in-memory fetch cache.
//!
//! Retrievals are keyed by symbol plus the requested date window. Entries
//! expire after a time-to-live (one day by default) and the cache never holds
//! more than `capacity` entries: when full, the oldest entry is evicted.
//! Only successful, non-empty fetches are stored.

use super::provider::{DataError, DataProvider, DataSource, RawSeries};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Default time-to-live for cached retrievals.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default maximum number of cached retrievals.
pub const DEFAULT_CAPACITY: usize = 64;

/// Cache key: one retrieval request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(symbol: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.to_string(),
            start,
            end,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    series: RawSeries,
    inserted_at: Instant,
}

/// Keyed TTL cache with a capacity bound.
#[derive(Debug)]
pub struct FetchCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl FetchCache {
    /// Create a cache. A capacity of zero is treated as one.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        // A panic while holding the lock cannot leave an entry half-written.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a live entry. Expired entries are dropped on access.
    pub fn get(&self, key: &CacheKey) -> Option<RawSeries> {
        let mut entries = self.lock();
        let fresh = entries
            .get(key)
            .map(|e| e.inserted_at.elapsed() < self.ttl)?;
        if fresh {
            entries.get(key).map(|e| e.series.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    /// Store a retrieval, evicting expired entries and then the oldest one
    /// if the cache is still full.
    pub fn insert(&self, key: CacheKey, series: RawSeries) {
        let mut entries = self.lock();
        let ttl = self.ttl;
        entries.retain(|_, e| e.inserted_at.elapsed() < ttl);

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                log::debug!("fetch cache full, evicting {}", oldest.symbol);
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                series,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of entries currently held (expired ones included until touched).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

/// Wraps a provider with a `FetchCache`.
///
/// Hits come back tagged `DataSource::Cache`.
pub struct CachedProvider<P> {
    inner: P,
    cache: FetchCache,
    name: String,
}

impl<P: DataProvider> CachedProvider<P> {
    pub fn new(inner: P, cache: FetchCache) -> Self {
        let name = format!("cached({})", inner.name());
        Self { inner, cache, name }
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: DataProvider> DataProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, DataError> {
        let key = CacheKey::new(symbol, start, end);

        if let Some(mut series) = self.cache.get(&key) {
            log::debug!("fetch cache hit for {symbol} {start}..{end}");
            series.source = DataSource::Cache;
            return Ok(series);
        }

        log::debug!("fetch cache miss for {symbol} {start}..{end}");
        let series = self.inner.fetch(symbol, start, end)?;
        if !series.is_empty() {
            self.cache.insert(key, series.clone());
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::RawBar;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(symbol: &str, n: usize) -> RawSeries {
        let bars = (0..n)
            .map(|i| RawBar {
                date: d(2024, 1, 1) + chrono::Duration::days(i as i64),
                open: Some(1.0),
                high: Some(1.0),
                low: Some(1.0),
                close: Some(1.0),
                volume: Some(1),
            })
            .collect();
        RawSeries::new(symbol, bars, DataSource::Synthetic)
    }

    /// Counts calls; returns `rows` bars, or an error for "FAIL".
    struct CountingProvider {
        calls: AtomicUsize,
        rows: usize,
    }

    impl DataProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn fetch(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<RawSeries, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if symbol == "FAIL" {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.into(),
                });
            }
            Ok(series(symbol, self.rows))
        }
    }

    fn counting(rows: usize) -> CountingProvider {
        CountingProvider {
            calls: AtomicUsize::new(0),
            rows,
        }
    }

    #[test]
    fn get_returns_inserted_entry() {
        let cache = FetchCache::new(Duration::from_secs(60), 4);
        let key = CacheKey::new("AAPL", d(2015, 1, 1), d(2024, 1, 1));
        cache.insert(key.clone(), series("AAPL", 3));
        assert_eq!(cache.get(&key).unwrap().len(), 3);
    }

    #[test]
    fn window_is_part_of_the_key() {
        let cache = FetchCache::new(Duration::from_secs(60), 4);
        cache.insert(
            CacheKey::new("AAPL", d(2015, 1, 1), d(2024, 1, 1)),
            series("AAPL", 3),
        );
        assert!(cache
            .get(&CacheKey::new("AAPL", d(2015, 1, 1), d(2024, 1, 2)))
            .is_none());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = FetchCache::new(Duration::from_millis(10), 4);
        let key = CacheKey::new("AAPL", d(2015, 1, 1), d(2024, 1, 1));
        cache.insert(key.clone(), series("AAPL", 3));
        std::thread::sleep(Duration::from_millis(15));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = FetchCache::new(Duration::from_secs(60), 2);
        let k1 = CacheKey::new("A", d(2015, 1, 1), d(2024, 1, 1));
        let k2 = CacheKey::new("B", d(2015, 1, 1), d(2024, 1, 1));
        let k3 = CacheKey::new("C", d(2015, 1, 1), d(2024, 1, 1));
        cache.insert(k1.clone(), series("A", 1));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert(k2.clone(), series("B", 1));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert(k3.clone(), series("C", 1));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&k1).is_none());
        assert!(cache.get(&k2).is_some());
        assert!(cache.get(&k3).is_some());
    }

    #[test]
    fn cached_provider_skips_second_fetch() {
        let provider = CachedProvider::new(counting(5), FetchCache::default());
        let first = provider.fetch("AAPL", d(2015, 1, 1), d(2024, 1, 1)).unwrap();
        let second = provider.fetch("AAPL", d(2015, 1, 1), d(2024, 1, 1)).unwrap();

        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.source, DataSource::Synthetic);
        assert_eq!(second.source, DataSource::Cache);
        assert_eq!(first.bars, second.bars);
        assert_eq!(provider.name(), "cached(counting)");
    }

    #[test]
    fn failures_and_empty_results_are_not_cached() {
        let provider = CachedProvider::new(counting(0), FetchCache::default());
        assert!(provider.fetch("FAIL", d(2015, 1, 1), d(2024, 1, 1)).is_err());
        assert!(provider.fetch("FAIL", d(2015, 1, 1), d(2024, 1, 1)).is_err());
        provider.fetch("EMPTY", d(2015, 1, 1), d(2024, 1, 1)).unwrap();
        provider.fetch("EMPTY", d(2015, 1, 1), d(2024, 1, 1)).unwrap();

        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 4);
        assert!(provider.cache().is_empty());
    }
}
