//! In-process document store: one article partition per feed, merged client-side.

use super::{ReadTransition, Store};
use crate::cache::UnreadCounts;
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::paginate::{PageQuery, merge_partitions};
use chrono::{DateTime, Utc};
use common::{Article, ArticleId, Feed, FeedId, UserId};
use faststr::FastStr;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::warn;

#[derive(Default)]
struct Documents {
    feeds:           BTreeMap<FeedId, Feed>,
    partitions:      HashMap<FeedId, BTreeMap<Cursor, Article>>,
    article_feeds:   HashMap<ArticleId, FeedId>,
    read_states:     HashSet<(UserId, ArticleId)>,
    subscriptions:   HashMap<UserId, BTreeSet<FeedId>>,
    next_feed_id:    FeedId,
    next_article_id: ArticleId,
}

impl Documents {
    fn view(&self, article: &Article, user_id: UserId) -> Article {
        Article {
            read: self.read_states.contains(&(user_id, article.id)),
            ..article.clone()
        }
    }

    fn scan_partition(&self, feed_id: FeedId, query: &PageQuery) -> Vec<Article> {
        let Some(partition) = self.partitions.get(&feed_id) else {
            return Vec::new();
        };
        let upper = query.before.map_or(Bound::Unbounded, Bound::Excluded);
        partition
            .range((Bound::Unbounded, upper))
            .rev()
            .map(|(_, article)| self.view(article, query.user_id))
            .filter(|article| !query.unread_only || !article.read)
            .take(query.fetch_limit)
            .collect()
    }

    fn unread_in(&self, user_id: UserId, feed_id: FeedId) -> u64 {
        self.partitions.get(&feed_id).map_or(0, |partition| {
            partition
                .values()
                .filter(|a| !self.read_states.contains(&(user_id, a.id)))
                .count() as u64
        })
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    docs:       Arc<RwLock<Documents>>,
    faults:     Arc<AtomicUsize>,
    latency_ms: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_feed(&self, title: impl Into<FastStr>, url: impl Into<FastStr>) -> Feed {
        let mut docs = self.docs.write();
        docs.next_feed_id += 1;
        let feed = Feed {
            id:    docs.next_feed_id,
            title: title.into(),
            url:   url.into(),
        };
        docs.feeds.insert(feed.id, feed.clone());
        feed
    }

    pub fn add_article(
        &self,
        feed_id: FeedId,
        title: impl Into<FastStr>,
        published_at: DateTime<Utc>,
    ) -> Article {
        let mut docs = self.docs.write();
        docs.next_article_id += 1;
        let article = Article {
            id: docs.next_article_id,
            feed_id,
            title: title.into(),
            url: None,
            published_at,
            read: false,
        };
        docs.article_feeds.insert(article.id, feed_id);
        docs.partitions
            .entry(feed_id)
            .or_default()
            .insert(Cursor::of(&article), article.clone());
        article
    }

    /// Makes the next `n` store calls fail with `StorageUnavailable`.
    pub fn fail_next(&self, n: usize) {
        self.faults.store(n, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    async fn enter(&self, op: &'static str) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        let injected = self
            .faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            warn!(op, "injected store fault");
            return Err(Error::StorageUnavailable(format!("{op}: injected fault").into()));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    async fn subscribed_feed_ids(&self, user_id: UserId) -> Result<Vec<FeedId>> {
        self.enter("subscribed_feed_ids").await?;
        let docs = self.docs.read();
        Ok(docs
            .subscriptions
            .get(&user_id)
            .map(|feeds| feeds.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn subscribed_feeds(&self) -> Result<Vec<Feed>> {
        self.enter("subscribed_feeds").await?;
        let docs = self.docs.read();
        let subscribed: BTreeSet<FeedId> = docs.subscriptions.values().flatten().copied().collect();
        Ok(subscribed
            .into_iter()
            .filter_map(|id| docs.feeds.get(&id).cloned())
            .collect())
    }

    async fn articles(&self, query: &PageQuery) -> Result<Vec<Article>> {
        self.enter("articles").await?;
        let docs = self.docs.read();
        let partitions = query
            .feed_ids
            .iter()
            .map(|&feed_id| docs.scan_partition(feed_id, query));
        Ok(merge_partitions(
            partitions,
            query.before.as_ref(),
            query.fetch_limit,
        ))
    }

    async fn count_unread(&self, user_id: UserId) -> Result<UnreadCounts> {
        self.enter("count_unread").await?;
        let docs = self.docs.read();
        Ok(docs
            .subscriptions
            .get(&user_id)
            .into_iter()
            .flatten()
            .map(|&feed_id| (feed_id, docs.unread_in(user_id, feed_id)))
            .collect())
    }

    async fn set_read_state(
        &self,
        user_id: UserId,
        article_id: ArticleId,
        read: bool,
    ) -> Result<ReadTransition> {
        self.enter("set_read_state").await?;
        let mut docs = self.docs.write();
        let feed_id = *docs
            .article_feeds
            .get(&article_id)
            .ok_or(Error::ArticleNotFound(article_id))?;
        let was_read = if read {
            !docs.read_states.insert((user_id, article_id))
        } else {
            docs.read_states.remove(&(user_id, article_id))
        };
        Ok(ReadTransition {
            feed_id,
            was_read,
            now_read: read,
        })
    }

    async fn mark_feed_read(&self, user_id: UserId, feed_id: FeedId) -> Result<u64> {
        self.enter("mark_feed_read").await?;
        let mut docs = self.docs.write();
        let ids: Vec<ArticleId> = docs
            .partitions
            .get(&feed_id)
            .map(|partition| partition.values().map(|a| a.id).collect())
            .unwrap_or_default();
        let changed = ids
            .into_iter()
            .filter(|&id| docs.read_states.insert((user_id, id)))
            .count();
        Ok(changed as u64)
    }

    async fn subscribe(&self, user_id: UserId, feed_id: FeedId) -> Result<bool> {
        self.enter("subscribe").await?;
        let mut docs = self.docs.write();
        if !docs.feeds.contains_key(&feed_id) {
            return Err(Error::FeedNotFound(feed_id));
        }
        Ok(docs.subscriptions.entry(user_id).or_default().insert(feed_id))
    }

    async fn unsubscribe(&self, user_id: UserId, feed_id: FeedId) -> Result<bool> {
        self.enter("unsubscribe").await?;
        let mut docs = self.docs.write();
        Ok(docs
            .subscriptions
            .get_mut(&user_id)
            .is_some_and(|feeds| feeds.remove(&feed_id)))
    }
}
