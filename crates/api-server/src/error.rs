use faststr::FastStr;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use volo_http::{
    http::StatusCode,
    response::Response,
    server::IntoResponse,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] storage::Error),

    #[error("Invalid Requst Body: {0}")]
    InvalidRequestBody(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Storage(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Error::Storage(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Error::Storage(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> FastStr {
        json!({ "error": self.to_string(), "retryable": self.is_retryable() })
            .to_string()
            .into()
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Storage(e) if e.is_retryable())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = %status, "request failed");
        } else {
            warn!(error = %self, status = %status, "request rejected");
        }
        (status, self.body()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (storage::Error::InvalidCursor("bad".into()), StatusCode::BAD_REQUEST),
            (storage::Error::InvalidLimit(0), StatusCode::BAD_REQUEST),
            (storage::Error::ArticleNotFound(3), StatusCode::NOT_FOUND),
            (storage::Error::FeedNotFound(4), StatusCode::NOT_FOUND),
            (
                storage::Error::StorageUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (storage::Error::DatabaseTimeOut, StatusCode::SERVICE_UNAVAILABLE),
            (
                storage::Error::MigrateError("broken".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(Error::from(err).status(), status);
        }
    }

    #[test]
    fn test_error_body() {
        let err = Error::from(storage::Error::DatabaseTimeOut);
        let body: serde_json::Value = serde_json::from_str(&err.body()).unwrap();
        assert_eq!(body["retryable"], true);
        assert_eq!(body["error"], "database query timeout");

        let err = Error::from(storage::Error::InvalidLimit(0));
        let body: serde_json::Value = serde_json::from_str(&err.body()).unwrap();
        assert_eq!(body["retryable"], false);
    }
}
