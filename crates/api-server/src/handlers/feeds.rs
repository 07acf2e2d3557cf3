use super::respond;
use storage::{Storage, Store};
use volo_http::{
    response::Response,
    server::route::{Router, get},
    utils::Extension,
};

async fn feeds_handler<S: Store>(Extension(storage): Extension<Storage<S>>) -> Response {
    respond(storage.subscribed_feeds().await.map_err(Into::into))
}

async fn cache_stats_handler<S: Store>(Extension(storage): Extension<Storage<S>>) -> Response {
    respond(Ok(storage.cache_stats()))
}

pub fn feeds_router<S: Store>() -> Router {
    Router::new()
        .route("/v1/feeds", get(feeds_handler::<S>))
        .route("/v1/cache/stats", get(cache_stats_handler::<S>))
}
