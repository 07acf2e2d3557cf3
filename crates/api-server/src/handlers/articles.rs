use super::respond;
use crate::requests::{PageParams, ReadStateRequest};
use common::{ArticleId, UserId};
use serde_json::json;
use storage::{RequestScope, Storage, Store};
use tracing::info;
use volo_http::{
    response::Response,
    server::{
        extract::{Json, Query},
        param::PathParams,
        route::{Router, get, put},
    },
    utils::Extension,
};

async fn list_articles_handler<S: Store>(
    Extension(storage): Extension<Storage<S>>,
    PathParams(user_id): PathParams<UserId>,
    Query(params): Query<PageParams>,
) -> Response {
    let scope = RequestScope::new();
    let page = storage
        .fetch_page(
            &scope,
            user_id,
            params.limit,
            params.cursor.as_deref(),
            params.unread_only,
        )
        .await;
    respond(page.map_err(Into::into))
}

async fn unread_counts_handler<S: Store>(
    Extension(storage): Extension<Storage<S>>,
    PathParams(user_id): PathParams<UserId>,
) -> Response {
    let counts = storage.unread_counts(user_id).await;
    respond(counts.map_err(Into::into))
}

async fn read_state_handler<S: Store>(
    Extension(storage): Extension<Storage<S>>,
    PathParams((user_id, article_id)): PathParams<(UserId, ArticleId)>,
    Json(req): Json<ReadStateRequest>,
) -> Response {
    info!(user_id, article_id, read = req.read, "set read state");
    let transition = storage.mark_read(user_id, article_id, req.read).await;
    respond(
        transition
            .map(|t| {
                json!({
                    "article_id": article_id,
                    "feed_id": t.feed_id,
                    "read": t.now_read,
                    "changed": t.changed(),
                })
            })
            .map_err(Into::into),
    )
}

pub fn articles_router<S: Store>() -> Router {
    Router::new()
        .route("/v1/users/{:user_id}/articles", get(list_articles_handler::<S>))
        .route("/v1/users/{:user_id}/unread-counts", get(unread_counts_handler::<S>))
        .route(
            "/v1/users/{:user_id}/articles/{:article_id}/read",
            put(read_state_handler::<S>),
        )
}
