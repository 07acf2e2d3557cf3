pub mod cache;
pub mod cursor;
pub mod error;
pub mod paginate;
pub mod store;


pub use cache::{CacheStats, FeedListCache, RequestScope, UnreadCountCache, UnreadCounts};
pub use cursor::Cursor;
pub use error::{Error, Result};
pub use paginate::{Page, PageQuery};
pub use store::{MemoryStore, PgStore, ReadTransition, Store};

use cache::CountUpdate;
use common::config::{CacheConfig, PageSizes};
use common::{ArticleId, Feed, FeedId, UserId};
use serde::Serialize;
use std::time::Duration;
use tokio::time;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct CacheReport {
    pub unread_counts: CacheStats,
    pub feed_list:     CacheStats,
}

#[derive(Clone)]
pub struct Storage<S> {
    store:         S,
    unread_counts: UnreadCountCache,
    feed_list:     FeedListCache,
    page_sizes:    PageSizes,
    query_timeout: Duration,
}

impl<S: Store> Storage<S> {
    pub fn new(store: S, cache: &CacheConfig, page_sizes: PageSizes, query_timeout: Duration) -> Self {
        Self {
            store,
            unread_counts: UnreadCountCache::new(cache.unread_count_ttl, cache.sweep_interval),
            feed_list: FeedListCache::new(cache.feed_list_ttl, cache.sweep_interval),
            page_sizes,
            query_timeout,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match time::timeout(self.query_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, timeout = ?self.query_timeout, "store query timed out");
                Err(Error::DatabaseTimeOut)
            }
        }
    }

    async fn user_feed_ids(&self, scope: &RequestScope, user_id: UserId) -> Result<Vec<FeedId>> {
        scope
            .feed_ids()
            .get_or_fetch(user_id, || {
                self.bounded("subscribed_feed_ids", self.store.subscribed_feed_ids(user_id))
            })
            .await
    }

    pub async fn fetch_page(
        &self,
        scope: &RequestScope,
        user_id: UserId,
        limit: Option<usize>,
        cursor: Option<&str>,
        unread_only: bool,
    ) -> Result<Page> {
        let limit = paginate::resolve_limit(limit, self.page_sizes)?;
        let before = Cursor::parse_param(cursor)?;

        let feed_ids = self.user_feed_ids(scope, user_id).await?;
        if feed_ids.is_empty() {
            debug!(user_id, "no subscriptions, empty page");
            return Ok(Page::default());
        }

        let query = PageQuery {
            user_id,
            feed_ids,
            before,
            unread_only,
            fetch_limit: limit + 1,
        };
        let rows = self.bounded("articles", self.store.articles(&query)).await?;
        let page = paginate::finish_page(rows, limit);
        debug!(
            user_id,
            limit,
            unread_only,
            returned = page.articles.len(),
            more = page.next_cursor.is_some(),
            "fetched page"
        );
        Ok(page)
    }

    pub async fn unread_counts(&self, user_id: UserId) -> Result<UnreadCounts> {
        if let Some(counts) = self.unread_counts.get(user_id) {
            return Ok(counts);
        }
        let counts = self
            .bounded("count_unread", self.store.count_unread(user_id))
            .await?;
        self.unread_counts.set(user_id, counts.clone());
        Ok(counts)
    }

    pub fn notify_read_state_changed(
        &self,
        user_id: UserId,
        feed_id: FeedId,
        was_read: bool,
        now_read: bool,
    ) -> CountUpdate {
        self.unread_counts
            .update_count(user_id, feed_id, was_read, now_read)
    }

    pub fn notify_subscription_changed(&self) {
        self.feed_list.invalidate();
    }

    pub async fn subscribed_feeds(&self) -> Result<Vec<Feed>> {
        if let Some(feeds) = self.feed_list.get() {
            return Ok(feeds);
        }
        let feeds = self
            .bounded("subscribed_feeds", self.store.subscribed_feeds())
            .await?;
        self.feed_list.set(feeds.clone());
        Ok(feeds)
    }

    pub async fn mark_read(
        &self,
        user_id: UserId,
        article_id: ArticleId,
        read: bool,
    ) -> Result<ReadTransition> {
        let transition = self
            .bounded(
                "set_read_state",
                self.store.set_read_state(user_id, article_id, read),
            )
            .await?;
        if transition.changed() {
            self.notify_read_state_changed(
                user_id,
                transition.feed_id,
                transition.was_read,
                transition.now_read,
            );
        }
        Ok(transition)
    }

    pub async fn mark_feed_read(&self, user_id: UserId, feed_id: FeedId) -> Result<u64> {
        let changed = self
            .bounded("mark_feed_read", self.store.mark_feed_read(user_id, feed_id))
            .await?;
        if changed > 0 {
            self.unread_counts.invalidate(user_id);
        }
        info!(user_id, feed_id, changed, "marked feed read");
        Ok(changed)
    }

    pub async fn subscribe(
        &self,
        scope: &RequestScope,
        user_id: UserId,
        feed_id: FeedId,
    ) -> Result<bool> {
        let created = self
            .bounded("subscribe", self.store.subscribe(user_id, feed_id))
            .await?;
        self.subscription_written(scope, user_id);
        info!(user_id, feed_id, created, "subscribed");
        Ok(created)
    }

    pub async fn unsubscribe(
        &self,
        scope: &RequestScope,
        user_id: UserId,
        feed_id: FeedId,
    ) -> Result<bool> {
        let removed = self
            .bounded("unsubscribe", self.store.unsubscribe(user_id, feed_id))
            .await?;
        self.subscription_written(scope, user_id);
        info!(user_id, feed_id, removed, "unsubscribed");
        Ok(removed)
    }

    fn subscription_written(&self, scope: &RequestScope, user_id: UserId) {
        self.notify_subscription_changed();
        self.unread_counts.invalidate(user_id);
        scope.feed_ids().forget(&user_id);
    }

    pub fn cache_stats(&self) -> CacheReport {
        CacheReport {
            unread_counts: self.unread_counts.stats(),
            feed_list:     self.feed_list.stats(),
        }
    }

    pub async fn shutdown(&self) {
        self.unread_counts.shutdown().await;
        self.feed_list.shutdown().await;
        info!("storage caches shut down");
    }
}
