pub use common::logging_stdout;
use std::net::SocketAddr;
use storage::{Storage, Store};
use tracing::{error, info};
use volo_http::Address;
use volo_http::server::{Router, Server};
use volo_http::utils::Extension;

pub mod error;
pub mod handlers;
pub mod requests;

pub fn app<S: Store>(storage: Storage<S>) -> Router {
    Router::new()
        .merge(handlers::articles_router::<S>())
        .merge(handlers::subscriptions_router::<S>())
        .merge(handlers::feeds_router::<S>())
        .layer(Extension(storage))
}

/// Serves the HTTP API until the server stops.
pub async fn run_api_server<S: Store>(addr: SocketAddr, storage: Storage<S>) {
    let app = app(storage);
    info!(%addr, "api server listening");
    let addr = Address::from(addr);
    if let Err(e) = Server::new(app).run(addr).await {
        error!(error = %e, "api server stopped");
    }
}
