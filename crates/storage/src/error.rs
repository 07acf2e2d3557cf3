use common::{ArticleId, FeedId};
use faststr::FastStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid cursor: {0}")]
    InvalidCursor(FastStr),

    #[error("invalid page size: {0}")]
    InvalidLimit(usize),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(FastStr),

    #[error("database query timeout")]
    DatabaseTimeOut,

    #[error("article not found: {0}")]
    ArticleNotFound(ArticleId),

    #[error("feed not found: {0}")]
    FeedNotFound(FeedId),

    #[error("{0}")]
    MigrateError(FastStr),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => Error::DatabaseTimeOut,
            e => Error::StorageUnavailable(e.to_string().into()),
        }
    }
}

impl Error {
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidCursor(_) | Error::InvalidLimit(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ArticleNotFound(_) | Error::FeedNotFound(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_) | Error::DatabaseTimeOut)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
