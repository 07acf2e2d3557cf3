mod articles;
mod feeds;
mod subscriptions;

pub use articles::articles_router;
pub use feeds::feeds_router;
pub use subscriptions::subscriptions_router;

use crate::error::Result;
use serde::Serialize;
use volo_http::{
    http::StatusCode,
    response::Response,
    server::IntoResponse,
};

/// Serializes a handler result as JSON, mapping errors through [`crate::error::Error`].
fn respond<T: Serialize>(result: Result<T>) -> Response {
    let body = result.and_then(|value| Ok(serde_json::to_string(&value)?));
    match body {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => e.into_response(),
    }
}
