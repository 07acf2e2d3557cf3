mod feeds;
mod request;
mod ttl;
mod unread;

pub use feeds::FeedListCache;
pub use request::{RequestCache, RequestScope};
pub use ttl::{CacheEntry, CacheStats, DEFAULT_SWEEP_INTERVAL, TtlCache};
pub use unread::{CountUpdate, UnreadCountCache, UnreadCounts};
