//! # TTL Cache
//!
//! Process-wide, in-memory memoization keyed by a stable fingerprint of call
//! arguments. Cached data is split into named regions (resort metadata,
//! condition data, computed quality) with independently configured capacity
//! and TTL, so eviction pressure in one region never evicts another.
//!
//! Keys are SHA-256 over the canonical JSON serialization of the arguments:
//! args are converted to a `serde_json::Value` first, whose maps are
//! BTreeMap-backed and therefore key-sorted at every nesting level, so
//! logically-equal argument sets produce the same fingerprint regardless of
//! insertion order. The hash is not used for any security purpose.
//!
//! The miss-then-populate sequence is not atomic across concurrent callers:
//! two concurrent misses for the same key may both invoke the compute
//! closure. Compute closures must be idempotent and side-effect-free.
//! A failed compute propagates to the caller and is never cached.

use anyhow::{Context, Result};
use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Whether a lookup was served from the cache or freshly computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Header-friendly rendering (`HIT` / `MISS`).
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Per-region tuning: how long entries live and how many fit.
#[derive(Debug, Clone, Copy)]
pub struct RegionConfig {
    pub ttl: Duration,
    pub capacity: usize,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            capacity: 256,
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: serde_json::Value,
    inserted_at: Instant,
    /// Monotonic touch stamp for LRU ordering. Instants can tie on fast
    /// successive touches; a sequence number cannot.
    last_used: u64,
}

#[derive(Debug)]
struct Region {
    cfg: RegionConfig,
    seq: u64,
    entries: HashMap<String, Entry>,
}

impl Region {
    fn new(cfg: RegionConfig) -> Self {
        Self {
            cfg,
            seq: 0,
            entries: HashMap::new(),
        }
    }

    fn touch(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Live value for `key`, or `None`. Expired entries are removed on sight.
    fn lookup(&mut self, key: &str) -> Option<serde_json::Value> {
        let ttl = self.cfg.ttl;
        self.seq += 1;
        let stamp = self.seq;
        match self.entries.get_mut(key) {
            Some(e) if e.inserted_at.elapsed() < ttl => {
                e.last_used = stamp;
                Some(e.value.clone())
            }
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn insert(&mut self, key: String, value: serde_json::Value) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.cfg.capacity {
            self.evict_lru();
        }
        let stamp = self.touch();
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
                last_used: stamp,
            },
        );
    }

    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_used)
            .map(|(k, _)| k.clone());
        if let Some(k) = victim {
            self.entries.remove(&k);
        }
    }
}

/// Region-scoped TTL + LRU memoization store.
///
/// Constructed once per process and shared via `Arc`; tests create isolated
/// instances (or call [`TtlCache::clear_all`]) so runs stay independent.
#[derive(Debug)]
pub struct TtlCache {
    regions: Mutex<HashMap<String, Region>>,
    default_cfg: RegionConfig,
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TtlCache {
    /// Empty cache; regions not configured up front fall back to
    /// [`RegionConfig::default`] on first use.
    pub fn new() -> Self {
        Self {
            regions: Mutex::new(HashMap::new()),
            default_cfg: RegionConfig::default(),
        }
    }

    /// Cache with a set of pre-configured regions.
    pub fn with_regions<I>(regions: I) -> Self
    where
        I: IntoIterator<Item = (String, RegionConfig)>,
    {
        let map = regions
            .into_iter()
            .map(|(name, cfg)| (name, Region::new(cfg)))
            .collect();
        Self {
            regions: Mutex::new(map),
            default_cfg: RegionConfig::default(),
        }
    }

    /// Deterministic fingerprint of `args`: SHA-256 over canonical JSON.
    pub fn fingerprint<A: Serialize>(args: &A) -> Result<String> {
        // Serializing a map type straight to a string would emit entries in
        // iteration order. Going through a Value sorts every map, nested
        // ones included.
        let value = serde_json::to_value(args).context("serializing cache key arguments")?;
        let canonical =
            serde_json::to_string(&value).context("encoding canonical cache key")?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(format!("{digest:x}"))
    }

    /// Memoized computation: return the live cached value for `args` if one
    /// exists, otherwise run `compute`, store its result, and return it.
    pub async fn get_or_compute<A, T, F, Fut>(
        &self,
        region: &str,
        args: &A,
        compute: F,
    ) -> Result<T>
    where
        A: Serialize,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.get_or_compute_traced(region, args, compute)
            .await
            .map(|(value, _)| value)
    }

    /// Same as [`TtlCache::get_or_compute`] but also reports whether the
    /// value came from the cache, for diagnostics headers and metrics.
    pub async fn get_or_compute_traced<A, T, F, Fut>(
        &self,
        region: &str,
        args: &A,
        compute: F,
    ) -> Result<(T, CacheStatus)>
    where
        A: Serialize,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = Self::fingerprint(args)?;

        if let Some(raw) = self.lookup_raw(region, &key) {
            counter!("snow_cache_hits_total", "region" => region.to_string()).increment(1);
            let value = serde_json::from_value(raw)
                .with_context(|| format!("decoding cached value in region '{region}'"))?;
            return Ok((value, CacheStatus::Hit));
        }

        // Miss: compute outside the lock. Concurrent misses may race; last
        // write wins, which is fine for idempotent compute closures.
        let value = compute().await?;
        let raw = serde_json::to_value(&value)
            .with_context(|| format!("encoding value for cache region '{region}'"))?;
        self.insert_raw(region, key, raw);
        counter!("snow_cache_misses_total", "region" => region.to_string()).increment(1);
        Ok((value, CacheStatus::Miss))
    }

    /// Drop every entry in one region.
    pub fn clear(&self, region: &str) {
        let mut regions = self.regions.lock().expect("cache mutex poisoned");
        if let Some(r) = regions.get_mut(region) {
            r.entries.clear();
        }
    }

    /// Drop every entry in every region. Used for test isolation.
    pub fn clear_all(&self) {
        let mut regions = self.regions.lock().expect("cache mutex poisoned");
        for r in regions.values_mut() {
            r.entries.clear();
        }
    }

    /// Number of physically stored entries in a region (expired entries that
    /// have not been looked up since expiry still count).
    pub fn len(&self, region: &str) -> usize {
        let regions = self.regions.lock().expect("cache mutex poisoned");
        regions.get(region).map_or(0, |r| r.entries.len())
    }

    pub fn is_empty(&self, region: &str) -> bool {
        self.len(region) == 0
    }

    fn lookup_raw(&self, region: &str, key: &str) -> Option<serde_json::Value> {
        let mut regions = self.regions.lock().expect("cache mutex poisoned");
        regions.get_mut(region).and_then(|r| r.lookup(key))
    }

    fn insert_raw(&self, region: &str, key: String, value: serde_json::Value) {
        let mut regions = self.regions.lock().expect("cache mutex poisoned");
        let default_cfg = self.default_cfg;
        regions
            .entry(region.to_string())
            .or_insert_with(|| Region::new(default_cfg))
            .insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn small_region(ttl_ms: u64, capacity: usize) -> TtlCache {
        TtlCache::with_regions([(
            "test".to_string(),
            RegionConfig {
                ttl: Duration::from_millis(ttl_ms),
                capacity,
            },
        )])
    }

    #[test]
    fn fingerprint_is_order_independent() {
        // HashMap iteration order varies per instance, so logically-equal
        // maps must still hash the same. Repeated builds make an
        // order-sensitive fingerprint fail reliably rather than flake.
        let reference = {
            let mut args = HashMap::new();
            args.insert("resort_id", "alpenblick");
            args.insert("bucket", "42");
            args.insert("radius_km", "50");
            TtlCache::fingerprint(&args).unwrap()
        };

        for _ in 0..64 {
            let mut args = HashMap::new();
            args.insert("radius_km", "50");
            args.insert("bucket", "42");
            args.insert("resort_id", "alpenblick");
            assert_eq!(TtlCache::fingerprint(&args).unwrap(), reference);
        }
    }

    #[test]
    fn fingerprint_canonicalizes_nested_maps() {
        let mut inner_a = HashMap::new();
        inner_a.insert("lat", 47.2692);
        inner_a.insert("lon", 11.4041);
        let mut inner_b = HashMap::new();
        inner_b.insert("lon", 11.4041);
        inner_b.insert("lat", 47.2692);

        let a = TtlCache::fingerprint(&HashMap::from([("center", inner_a)])).unwrap();
        let b = TtlCache::fingerprint(&HashMap::from([("center", inner_b)])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_for_different_args() {
        let a = TtlCache::fingerprint(&("alpenblick", 1u64)).unwrap();
        let b = TtlCache::fingerprint(&("alpenblick", 2u64)).unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn second_call_is_a_hit_and_skips_compute() {
        let cache = small_region(60_000, 8);
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        for expected in [CacheStatus::Miss, CacheStatus::Hit] {
            let (v, status) = cache
                .get_or_compute_traced("test", &"key-a", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7.2f64)
                })
                .await
                .unwrap();
            assert_eq!(status, expected);
            assert!((v - 7.2).abs() < 1e-9);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_recomputes() {
        let cache = small_region(30, 8);
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        cache
            .get_or_compute("test", &"key-a", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1u32)
            })
            .await
            .unwrap();

        // Sleep well past TTL to avoid boundary flakes.
        tokio::time::sleep(Duration::from_millis(150)).await;

        let (_, status) = cache
            .get_or_compute_traced("test", &"key-a", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1u32)
            })
            .await
            .unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn capacity_eviction_is_lru() {
        let cache = small_region(60_000, 2);

        let cache_ref = &cache;
        let put = move |k: &'static str, v: u32| async move {
            cache_ref
                .get_or_compute("test", &k, || async move { Ok(v) })
                .await
                .unwrap()
        };

        put("a", 1).await;
        put("b", 2).await;
        // Touch "a" so "b" becomes least recently used.
        put("a", 1).await;
        // At capacity: admitting "c" must evict "b".
        put("c", 3).await;

        let (_, status_a) = cache
            .get_or_compute_traced("test", &"a", || async { Ok(1u32) })
            .await
            .unwrap();
        assert_eq!(status_a, CacheStatus::Hit);

        // Checked last: the miss recomputes "b" and re-admits it, which
        // evicts another entry in turn.
        let (_, status_b) = cache
            .get_or_compute_traced("test", &"b", || async { Ok(2u32) })
            .await
            .unwrap();
        assert_eq!(status_b, CacheStatus::Miss);
    }

    #[tokio::test]
    async fn regions_evict_independently() {
        let cache = TtlCache::with_regions([
            (
                "one".to_string(),
                RegionConfig {
                    ttl: Duration::from_secs(60),
                    capacity: 1,
                },
            ),
            (
                "two".to_string(),
                RegionConfig {
                    ttl: Duration::from_secs(60),
                    capacity: 8,
                },
            ),
        ]);

        cache
            .get_or_compute("two", &"k", || async { Ok(0u32) })
            .await
            .unwrap();
        // Overflow region "one"; region "two" must keep its entry.
        for k in ["a", "b", "c"] {
            cache
                .get_or_compute("one", &k, || async { Ok(0u32) })
                .await
                .unwrap();
        }

        assert_eq!(cache.len("one"), 1);
        let (_, status) = cache
            .get_or_compute_traced("two", &"k", || async { Ok(0u32) })
            .await
            .unwrap();
        assert_eq!(status, CacheStatus::Hit);
    }

    #[tokio::test]
    async fn failed_compute_is_not_cached() {
        let cache = small_region(60_000, 8);
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let err: Result<u32> = cache
            .get_or_compute("test", &"k", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("upstream unavailable"))
            })
            .await;
        assert!(err.is_err());
        assert!(cache.is_empty("test"));

        let (_, status) = cache
            .get_or_compute_traced("test", &"k", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(5u32)
            })
            .await
            .unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn clear_all_resets_every_region() {
        let cache = TtlCache::new();
        cache
            .get_or_compute("one", &"k", || async { Ok(1u32) })
            .await
            .unwrap();
        cache
            .get_or_compute("two", &"k", || async { Ok(2u32) })
            .await
            .unwrap();

        cache.clear_all();
        assert!(cache.is_empty("one"));
        assert!(cache.is_empty("two"));
    }
}
