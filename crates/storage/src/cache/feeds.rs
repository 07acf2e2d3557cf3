use super::ttl::{CacheStats, TtlCache};
use common::Feed;
use std::time::Duration;

#[derive(Clone)]
pub struct FeedListCache(TtlCache<(), Vec<Feed>>);

impl FeedListCache {
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self(TtlCache::with_sweep_interval("feed_list", ttl, sweep_interval))
    }

    pub fn get(&self) -> Option<Vec<Feed>> {
        self.0.get(&())
    }

    pub fn set(&self, feeds: Vec<Feed>) {
        self.0.set((), feeds);
    }

    pub fn invalidate(&self) {
        self.0.invalidate(&());
    }

    pub fn stats(&self) -> CacheStats {
        self.0.stats()
    }

    pub async fn shutdown(&self) {
        self.0.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    fn feed(id: i64) -> Feed {
        Feed {
            id,
            title: format!("feed {id}").into(),
            url:   format!("https://example.com/{id}.xml").into(),
        }
    }

    #[tokio::test]
    async fn test_invalidate_right_after_set_misses() {
        let cache = FeedListCache::new(Duration::from_secs(60), Duration::from_secs(300));
        cache.set(vec![feed(1), feed(2)]);
        assert_eq!(cache.get().unwrap().len(), 2);

        cache.invalidate();
        assert_eq!(cache.get(), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.count, 0);
    }

    #[tokio::test]
    async fn test_caller_mutation_does_not_leak() {
        let cache = FeedListCache::new(Duration::from_secs(60), Duration::from_secs(300));
        cache.set(vec![feed(1)]);
        let mut feeds = cache.get().unwrap();
        feeds.push(feed(2));
        feeds[0].title = "renamed".into();
        assert_eq!(cache.get().unwrap(), vec![feed(1)]);
    }

    #[tokio::test]
    async fn test_expires() {
        let cache = FeedListCache::new(Duration::from_millis(40), Duration::from_secs(300));
        cache.set(vec![feed(1)]);
        assert!(cache.get().is_some());
        time::sleep(Duration::from_millis(70)).await;
        assert!(cache.get().is_none());
    }
}
