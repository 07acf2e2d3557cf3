use chrono::{DateTime, Utc};
use faststr::FastStr;
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type FeedId = i64;
pub type ArticleId = i64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Feed {
    pub id:    FeedId,
    pub title: FastStr,
    pub url:   FastStr,
}

/// An article as seen by one user; `read` reflects that user's state at query time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Article {
    pub id:           ArticleId,
    pub feed_id:      FeedId,
    pub title:        FastStr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url:          Option<FastStr>,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub read:         bool,
}
