//! The narrow contract the read path needs from persistent storage.
//!
//! Every backend must list articles in the same total order,
//! `(published_at DESC, id DESC)`, and apply the cursor boundary as a strict
//! inequality on that pair, whether it can push the compound comparison into a
//! single query or has to merge per-partition results itself.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::cache::UnreadCounts;
use crate::error::Result;
use crate::paginate::PageQuery;
use common::{Article, ArticleId, Feed, FeedId, UserId};

/// Outcome of a write to one article's read state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTransition {
    pub feed_id:  FeedId,
    pub was_read: bool,
    pub now_read: bool,
}

impl ReadTransition {
    pub fn changed(&self) -> bool {
        self.was_read != self.now_read
    }
}

pub trait Store: Clone + Send + Sync + 'static {
    fn subscribed_feed_ids(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<FeedId>>> + Send;

    /// Feeds with at least one subscriber, ordered by id.
    fn subscribed_feeds(&self) -> impl Future<Output = Result<Vec<Feed>>> + Send;

    /// At most `query.fetch_limit` articles strictly after `query.before`, in
    /// listing order, with `read` set for `query.user_id`.
    fn articles(&self, query: &PageQuery) -> impl Future<Output = Result<Vec<Article>>> + Send;

    /// Unread tally for every feed the user subscribes to, zeros included.
    fn count_unread(&self, user_id: UserId) -> impl Future<Output = Result<UnreadCounts>> + Send;

    fn set_read_state(
        &self,
        user_id: UserId,
        article_id: ArticleId,
        read: bool,
    ) -> impl Future<Output = Result<ReadTransition>> + Send;

    /// Marks every article of a feed read; returns how many changed state.
    fn mark_feed_read(
        &self,
        user_id: UserId,
        feed_id: FeedId,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Returns `false` when the subscription already existed.
    fn subscribe(
        &self,
        user_id: UserId,
        feed_id: FeedId,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Returns `false` when there was no subscription.
    fn unsubscribe(
        &self,
        user_id: UserId,
        feed_id: FeedId,
    ) -> impl Future<Output = Result<bool>> + Send;
}
