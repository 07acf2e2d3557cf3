use common::{FeedId, UserId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;

pub struct RequestCache<K, V> {
    memo: Mutex<HashMap<K, V>>,
}

impl<K, V> Default for RequestCache<K, V> {
    fn default() -> Self {
        Self {
            memo: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> RequestCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    // Only successes are memoized. The lock is not held across `fetch`.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cached = self.memo.lock().get(&key).cloned();
        if let Some(value) = cached {
            return Ok(value);
        }

        let value = fetch().await?;
        Ok(self.memo.lock().entry(key).or_insert(value).clone())
    }

    pub fn forget(&self, key: &K) {
        self.memo.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.memo.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct RequestScope {
    feed_ids: RequestCache<UserId, Vec<FeedId>>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_ids(&self) -> &RequestCache<UserId, Vec<FeedId>> {
        &self.feed_ids
    }
}
