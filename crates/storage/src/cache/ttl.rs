use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

// Stand-in deadline for durations too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn deadline(now: Instant, after: Duration) -> Instant {
    now.checked_add(after).unwrap_or_else(|| now + FAR_FUTURE)
}

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value:      V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    #[inline]
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub count:    usize,
    pub hits:     u64,
    pub misses:   u64,
    pub hit_rate: f64,
}

impl CacheStats {
    fn new(count: usize, hits: u64, misses: u64) -> Self {
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        Self {
            count,
            hits,
            misses,
            hit_rate,
        }
    }
}

struct Sweeper {
    token:  CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct Shared<K, V> {
    name:    &'static str,
    ttl:     Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    hits:    AtomicU64,
    misses:  AtomicU64,
    sweeper: Sweeper,
}

impl<K: Eq + Hash, V> Shared<K, V> {
    fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}

pub struct TtlCache<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self::with_sweep_interval(name, ttl, DEFAULT_SWEEP_INTERVAL)
    }

    pub fn with_sweep_interval(name: &'static str, ttl: Duration, sweep_interval: Duration) -> Self {
        let token = CancellationToken::new();
        let shared = Arc::new(Shared {
            name,
            ttl,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sweeper: Sweeper {
                token:  token.clone(),
                handle: Mutex::new(None),
            },
        });

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let task = run_sweeper(Arc::downgrade(&shared), sweep_interval, token);
                *shared.sweeper.handle.lock() = Some(runtime.spawn(task));
                debug!(cache = name, ttl = ?ttl, every = ?sweep_interval, "cache sweeper started");
            }
            Err(_) => {
                warn!(cache = name, "no tokio runtime, cache sweeper not started");
            }
        }

        Self { shared }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let now = Instant::now();
        let value = self
            .shared
            .entries
            .read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone());

        let counter = if value.is_some() {
            &self.shared.hits
        } else {
            &self.shared.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        value
    }

    pub fn set(&self, key: K, value: V) {
        let entry = CacheEntry {
            value,
            expires_at: deadline(Instant::now(), self.shared.ttl),
        };
        self.shared.entries.write().insert(key, entry);
    }

    // Leaves the expiry untouched; `false` when absent or expired.
    pub fn update<Q, F>(&self, key: &Q, f: F) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        F: FnOnce(&mut V),
    {
        let now = Instant::now();
        let mut entries = self.shared.entries.write();
        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                f(&mut entry.value);
                true
            }
            _ => false,
        }
    }

    pub fn invalidate<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.shared.entries.write().remove(key);
    }

    pub fn invalidate_all(&self) {
        self.shared.entries.write().clear();
    }

    pub fn sweep(&self) -> usize {
        self.shared.sweep()
    }

    pub fn stats(&self) -> CacheStats {
        let count = self.shared.entries.read().len();
        CacheStats::new(
            count,
            self.shared.hits.load(Ordering::Relaxed),
            self.shared.misses.load(Ordering::Relaxed),
        )
    }

    pub async fn shutdown(&self) {
        self.shared.sweeper.token.cancel();
        let handle = self.shared.sweeper.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(cache = self.shared.name, error = %e, "cache sweeper ended abnormally");
            }
            debug!(cache = self.shared.name, "cache sweeper stopped");
        }
    }

    pub fn is_sweeping(&self) -> bool {
        !self.shared.sweeper.token.is_cancelled()
            && self
                .shared
                .sweeper
                .handle
                .lock()
                .as_ref()
                .is_some_and(|h| !h.is_finished())
    }
}

async fn run_sweeper<K, V>(shared: Weak<Shared<K, V>>, period: Duration, token: CancellationToken)
where
    K: Eq + Hash,
{
    let mut interval = time::interval_at(deadline(Instant::now(), period), period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let removed = shared.sweep();
                if removed > 0 {
                    debug!(cache = shared.name, removed, "swept expired cache entries");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TTL: Duration = Duration::from_millis(60);

    #[tokio::test]
    async fn test_set_then_get_hits() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        cache.set(1, "a".to_string());
        assert_eq!(cache.get(&1).as_deref(), Some("a"));
        assert_eq!(cache.get(&2), None);

        let stats = cache.stats();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss_until_swept() {
        let cache = TtlCache::new("test", TTL);
        cache.set("k", 1u64);
        assert_eq!(cache.get("k"), Some(1));

        time::sleep(TTL + Duration::from_millis(30)).await;
        assert_eq!(cache.get("k"), None);
        // logical expiry only; the entry is still stored
        assert_eq!(cache.stats().count, 1);

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.stats().count, 0);
    }

    #[tokio::test]
    async fn test_set_restarts_lifetime() {
        let cache = TtlCache::new("test", Duration::from_millis(100));
        cache.set(1, 1);
        time::sleep(Duration::from_millis(60)).await;
        cache.set(1, 2);
        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get(&1), Some(2));
    }

    #[tokio::test]
    async fn test_returned_values_are_copies() {
        let cache: TtlCache<u32, HashMap<u32, u64>> = TtlCache::new("test", Duration::from_secs(60));
        let mut counts = HashMap::from([(1, 5)]);
        cache.set(7, counts.clone());
        counts.insert(2, 9);

        let mut got = cache.get(&7).unwrap();
        got.insert(1, 0);
        got.insert(3, 3);
        assert_eq!(cache.get(&7).unwrap(), HashMap::from([(1, 5)]));

        let list: TtlCache<(), Vec<u32>> = TtlCache::new("list", Duration::from_secs(60));
        list.set((), vec![1, 2, 3]);
        let mut got = list.get(&()).unwrap();
        got.clear();
        assert_eq!(list.get(&()).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_update_only_touches_live_entries() {
        let cache = TtlCache::new("test", TTL);
        assert!(!cache.update(&1, |v: &mut u64| *v += 1));
        assert_eq!(cache.get(&1), None);

        cache.set(1, 10u64);
        assert!(cache.update(&1, |v| *v += 1));
        assert_eq!(cache.get(&1), Some(11));

        time::sleep(TTL + Duration::from_millis(30)).await;
        assert!(!cache.update(&1, |v| *v += 1));
        assert_eq!(cache.get(&1), None);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        cache.set(1, 1);
        cache.set(2, 2);
        cache.invalidate(&1);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(2));
        cache.invalidate_all();
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.stats().count, 0);
    }

    #[tokio::test]
    async fn test_stats_without_traffic() {
        let cache: TtlCache<u8, u8> = TtlCache::new("test", TTL);
        assert_eq!(cache.stats(), CacheStats::new(0, 0, 0));
        assert_eq!(cache.stats().hit_rate, 0.0);
    }

    #[tokio::test]
    async fn test_background_sweep_reclaims_memory() {
        let cache = TtlCache::with_sweep_interval("test", TTL, Duration::from_millis(40));
        for k in 0..10 {
            cache.set(k, k);
        }
        time::sleep(Duration::from_millis(250)).await;
        assert_eq!(cache.stats().count, 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_sweeper() {
        let cache = TtlCache::with_sweep_interval("test", TTL, Duration::from_millis(20));
        assert!(cache.is_sweeping());
        cache.shutdown().await;
        assert!(!cache.is_sweeping());

        cache.set(1, 1);
        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.stats().count, 1);
    }

    #[tokio::test]
    async fn test_dropping_last_handle_cancels_sweeper() {
        let cache: TtlCache<u8, u8> =
            TtlCache::with_sweep_interval("test", TTL, Duration::from_millis(20));
        let token = cache.shared.sweeper.token.clone();
        let clone = cache.clone();
        drop(cache);
        assert!(!token.is_cancelled());
        drop(clone);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_huge_durations_do_not_overflow() {
        let cache = TtlCache::with_sweep_interval("test", Duration::MAX, Duration::MAX);
        cache.set(1, 1);
        assert_eq!(cache.get(&1), Some(1));
        assert!(cache.update(&1, |v| *v += 1));
        assert_eq!(cache.get(&1), Some(2));
        cache.shutdown().await;
    }

    #[test]
    fn test_works_without_runtime() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        cache.set(1, 1);
        assert_eq!(cache.get(&1), Some(1));
        assert!(!cache.is_sweeping());
    }
}
