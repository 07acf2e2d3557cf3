use anyhow::Result;
use common::Config;
use dotenvy::dotenv;
use std::time::Duration;
use storage::{PgStore, Storage};
use tokio_util::sync::CancellationToken;
use tracing::info;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = api_server::logging_stdout();
    dotenv().ok();

    let config = Config::from_env()?;

    let store = PgStore::connect(&config.database_url).await?;
    let health = CancellationToken::new();
    let health_task =
        store.spawn_health_check(HEALTH_CHECK_INTERVAL, config.query_timeout, health.clone());

    let storage = Storage::new(
        store,
        &config.cache,
        config.page_sizes,
        config.query_timeout,
    );
    info!(
        unread_count_ttl = ?config.cache.unread_count_ttl,
        feed_list_ttl = ?config.cache.feed_list_ttl,
        page_size = config.page_sizes.default,
        "storage ready"
    );

    api_server::run_api_server(config.listen_addr, storage.clone()).await;

    health.cancel();
    let _ = health_task.await;
    storage.shutdown().await;
    Ok(())
}
