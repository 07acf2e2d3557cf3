use super::{ReadTransition, Store};
use crate::cache::UnreadCounts;
use crate::error::{Error, Result};
use crate::paginate::PageQuery;
use chrono::{DateTime, Utc};
use common::{Article, ArticleId, Feed, FeedId, UserId};
use faststr::FastStr;
use sqlx::prelude::FromRow;
use sqlx::{PgPool, migrate::MigrateDatabase, postgres::PgPoolOptions};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, FromRow)]
struct FeedRow {
    id:    i64,
    title: FastStr,
    url:   FastStr,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id:    row.id,
            title: row.title,
            url:   row.url,
        }
    }
}

#[derive(Debug, FromRow)]
struct ArticleRow {
    id:           i64,
    feed_id:      i64,
    title:        FastStr,
    // Nullable columns in SQL map to Option<T> in Rust.
    url:          Option<FastStr>,
    published_at: DateTime<Utc>,
    read:         bool,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id:           row.id,
            feed_id:      row.feed_id,
            title:        row.title,
            url:          row.url,
            published_at: row.published_at,
            read:         row.read,
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        if !sqlx::Postgres::database_exists(database_url).await? {
            sqlx::Postgres::create_database(database_url).await?;
        }

        debug!("connecting to database");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::MigrateError(e.to_string().into()))?;

        Ok(Self { pool })
    }

    // Keeps pinging after failures; the pool reconnects on its own.
    pub fn spawn_health_check(
        &self,
        interval: Duration,
        query_timeout: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let start = Instant::now();
                let result = time::timeout(query_timeout, sqlx::query("SELECT 1").execute(&pool)).await;
                match result {
                    Ok(Ok(_)) => {
                        debug!(elapsed = ?start.elapsed(), "database health check successful");
                    }
                    Ok(Err(e)) => {
                        warn!(error = %e, "database health check failed");
                    }
                    Err(_) => {
                        warn!(timeout = ?query_timeout, "database health check timed out");
                    }
                }
            }
            info!("database health check stopped");
        })
    }

    async fn feed_exists(&self, feed_id: FeedId) -> Result<bool> {
        Ok(
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM feeds WHERE id = $1)")
                .bind(feed_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }
}

impl Store for PgStore {
    async fn subscribed_feed_ids(&self, user_id: UserId) -> Result<Vec<FeedId>> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT feed_id FROM subscriptions WHERE user_id = $1 ORDER BY feed_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn subscribed_feeds(&self) -> Result<Vec<Feed>> {
        let rows = sqlx::query_as::<_, FeedRow>(
            r#"
        SELECT f.id, f.title, f.url
        FROM feeds f
        WHERE EXISTS (SELECT 1 FROM subscriptions s WHERE s.feed_id = f.id)
        ORDER BY f.id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Feed::from).collect())
    }

    async fn articles(&self, query: &PageQuery) -> Result<Vec<Article>> {
        // The row comparison keeps the boundary positional in the listing
        // order, so it is index-friendly and independent of read state.
        let rows = sqlx::query_as::<_, ArticleRow>(
            r#"
        SELECT
            a.id,
            a.feed_id,
            a.title,
            a.url,
            a.published_at,
            (r.article_id IS NOT NULL) AS "read"
        FROM articles a
        LEFT JOIN read_states r ON r.article_id = a.id AND r.user_id = $1
        WHERE a.feed_id = ANY($2)
          AND ($3::timestamptz IS NULL OR (a.published_at, a.id) < ($3, $4))
          AND (NOT $5 OR r.article_id IS NULL)
        ORDER BY a.published_at DESC, a.id DESC
        LIMIT $6
        "#,
        )
        .bind(query.user_id)
        .bind(&query.feed_ids)
        .bind(query.before.map(|c| c.published_at))
        .bind(query.before.map_or(0, |c| c.article_id))
        .bind(query.unread_only)
        .bind(i64::try_from(query.fetch_limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn count_unread(&self, user_id: UserId) -> Result<UnreadCounts> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            r#"
        SELECT s.feed_id, COUNT(a.id) FILTER (WHERE r.article_id IS NULL) AS unread
        FROM subscriptions s
        LEFT JOIN articles a ON a.feed_id = s.feed_id
        LEFT JOIN read_states r ON r.article_id = a.id AND r.user_id = s.user_id
        WHERE s.user_id = $1
        GROUP BY s.feed_id
        "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(feed_id, unread)| (feed_id, unread.max(0) as u64))
            .collect())
    }

    async fn set_read_state(
        &self,
        user_id: UserId,
        article_id: ArticleId,
        read: bool,
    ) -> Result<ReadTransition> {
        let feed_id = sqlx::query_scalar::<_, i64>("SELECT feed_id FROM articles WHERE id = $1")
            .bind(article_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::ArticleNotFound(article_id))?;

        // A single statement decides the previous state: the insert only
        // lands if the row was absent, the delete only if it was present.
        let was_read = if read {
            let done = sqlx::query(
                "INSERT INTO read_states (user_id, article_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(article_id)
            .execute(&self.pool)
            .await?;
            done.rows_affected() == 0
        } else {
            let done = sqlx::query("DELETE FROM read_states WHERE user_id = $1 AND article_id = $2")
                .bind(user_id)
                .bind(article_id)
                .execute(&self.pool)
                .await?;
            done.rows_affected() > 0
        };

        Ok(ReadTransition {
            feed_id,
            was_read,
            now_read: read,
        })
    }

    async fn mark_feed_read(&self, user_id: UserId, feed_id: FeedId) -> Result<u64> {
        let done = sqlx::query(
            r#"
        INSERT INTO read_states (user_id, article_id)
        SELECT $1, a.id FROM articles a WHERE a.feed_id = $2
        ON CONFLICT DO NOTHING
        "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected())
    }

    async fn subscribe(&self, user_id: UserId, feed_id: FeedId) -> Result<bool> {
        if !self.feed_exists(feed_id).await? {
            return Err(Error::FeedNotFound(feed_id));
        }
        let done = sqlx::query(
            "INSERT INTO subscriptions (user_id, feed_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(feed_id)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn unsubscribe(&self, user_id: UserId, feed_id: FeedId) -> Result<bool> {
        let done = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND feed_id = $2")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
