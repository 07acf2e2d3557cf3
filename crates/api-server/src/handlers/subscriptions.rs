use super::respond;
use common::{FeedId, UserId};
use serde_json::json;
use storage::{RequestScope, Storage, Store};
use volo_http::{
    response::Response,
    server::{
        param::PathParams,
        route::{Router, post, put},
    },
    utils::Extension,
};

async fn subscribe_handler<S: Store>(
    Extension(storage): Extension<Storage<S>>,
    PathParams((user_id, feed_id)): PathParams<(UserId, FeedId)>,
) -> Response {
    let scope = RequestScope::new();
    let created = storage.subscribe(&scope, user_id, feed_id).await;
    respond(
        created
            .map(|created| json!({ "feed_id": feed_id, "subscribed": true, "changed": created }))
            .map_err(Into::into),
    )
}

async fn unsubscribe_handler<S: Store>(
    Extension(storage): Extension<Storage<S>>,
    PathParams((user_id, feed_id)): PathParams<(UserId, FeedId)>,
) -> Response {
    let scope = RequestScope::new();
    let removed = storage.unsubscribe(&scope, user_id, feed_id).await;
    respond(
        removed
            .map(|removed| json!({ "feed_id": feed_id, "subscribed": false, "changed": removed }))
            .map_err(Into::into),
    )
}

async fn mark_feed_read_handler<S: Store>(
    Extension(storage): Extension<Storage<S>>,
    PathParams((user_id, feed_id)): PathParams<(UserId, FeedId)>,
) -> Response {
    let marked = storage.mark_feed_read(user_id, feed_id).await;
    respond(
        marked
            .map(|marked| json!({ "feed_id": feed_id, "marked": marked }))
            .map_err(Into::into),
    )
}

pub fn subscriptions_router<S: Store>() -> Router {
    Router::new()
        .route(
            "/v1/users/{:user_id}/subscriptions/{:feed_id}",
            put(subscribe_handler::<S>).delete(unsubscribe_handler::<S>),
        )
        .route(
            "/v1/users/{:user_id}/feeds/{:feed_id}/read",
            post(mark_feed_read_handler::<S>),
        )
}
