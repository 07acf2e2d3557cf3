pub mod config;
pub mod feeds;

mod log;

pub use config::Config;
pub use feeds::{Article, ArticleId, Feed, FeedId, UserId};
pub use log::logging_stdout;
