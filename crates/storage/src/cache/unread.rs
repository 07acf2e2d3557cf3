use super::ttl::{CacheStats, TtlCache};
use common::{FeedId, UserId};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Per-feed unread tally of one user. A missing feed means "unknown", not zero.
pub type UnreadCounts = HashMap<FeedId, u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountUpdate {
    Unchanged,
    NotCached,
    Applied,
    Invalidated,
}

#[derive(Clone)]
pub struct UnreadCountCache(TtlCache<UserId, UnreadCounts>);

impl UnreadCountCache {
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self(TtlCache::with_sweep_interval(
            "unread_counts",
            ttl,
            sweep_interval,
        ))
    }

    pub fn get(&self, user_id: UserId) -> Option<UnreadCounts> {
        self.0.get(&user_id)
    }

    pub fn set(&self, user_id: UserId, counts: UnreadCounts) {
        self.0.set(user_id, counts);
    }

    // Never creates an entry: an absent or expired tally waits for a recompute.
    pub fn update_count(
        &self,
        user_id: UserId,
        feed_id: FeedId,
        was_read: bool,
        now_read: bool,
    ) -> CountUpdate {
        if was_read == now_read {
            return CountUpdate::Unchanged;
        }

        let mut known_feed = true;
        let live = self.0.update(&user_id, |counts| match counts.get_mut(&feed_id) {
            Some(count) if now_read => *count = count.saturating_sub(1),
            Some(count) => *count += 1,
            None => known_feed = false,
        });

        let outcome = match (live, known_feed) {
            (false, _) => CountUpdate::NotCached,
            (true, true) => CountUpdate::Applied,
            (true, false) => {
                self.0.invalidate(&user_id);
                CountUpdate::Invalidated
            }
        };
        debug!(user_id, feed_id, was_read, now_read, ?outcome, "unread count update");
        outcome
    }

    pub fn invalidate(&self, user_id: UserId) {
        self.0.invalidate(&user_id);
    }

    pub fn stats(&self) -> CacheStats {
        self.0.stats()
    }

    pub async fn shutdown(&self) {
        self.0.shutdown().await;
    }
}
