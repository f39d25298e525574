use std::collections::HashMap;

use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Row,
};

use crate::{
    db::{check_content_genre, RecommenderStore},
    error::{AppError, AppResult},
    models::{
        AggregateScan, BanditStat, ContentId, ContentItem, EventAggregate, InteractionEvent,
        NewInteraction, SearchHit, TripleKey, UserId,
    },
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the schema migrations embedded from `migrations/`
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn decode_aggregate(row: &PgRow) -> Result<EventAggregate, sqlx::Error> {
    Ok(EventAggregate {
        key: TripleKey::new(
            row.try_get("user_id")?,
            row.try_get::<String, _>("genre")?,
            row.try_get("content_id")?,
        ),
        total: row.try_get("total")?,
        successes: row.try_get("successes")?,
    })
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecommenderStore for PgStore {
    async fn upsert_content(&self, genre: &str, hits: &[SearchHit]) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for hit in hits {
            let result = sqlx::query(
                r#"
                INSERT INTO content (genre, title, url)
                VALUES ($1, $2, $3)
                ON CONFLICT (genre, url) DO NOTHING
                "#,
            )
            .bind(genre)
            .bind(&hit.title)
            .bind(&hit.url)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;

        tracing::debug!(genre = %genre, offered = hits.len(), inserted, "Content upserted");

        Ok(inserted)
    }

    async fn content_by_genre(&self, genre: &str) -> AppResult<Vec<ContentItem>> {
        let items = sqlx::query_as::<_, ContentItem>(
            r#"
            SELECT id, genre, title, url
            FROM content
            WHERE genre = $1
            ORDER BY id
            "#,
        )
        .bind(genre)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn upsert_stat(&self, stat: &BanditStat) -> AppResult<bool> {
        // Rows derived from fewer events than the stored one are stale
        let result = sqlx::query(
            r#"
            INSERT INTO user_models (user_id, genre, content_id, alpha, beta, last_trained)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, genre, content_id)
            DO UPDATE SET alpha = EXCLUDED.alpha,
                          beta = EXCLUDED.beta,
                          last_trained = EXCLUDED.last_trained
            WHERE user_models.alpha + user_models.beta <= EXCLUDED.alpha + EXCLUDED.beta
            "#,
        )
        .bind(stat.user_id)
        .bind(&stat.genre)
        .bind(stat.content_id)
        .bind(stat.alpha)
        .bind(stat.beta)
        .bind(stat.last_trained_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stats_for(
        &self,
        user_id: UserId,
        genre: &str,
    ) -> AppResult<HashMap<ContentId, BanditStat>> {
        let rows = sqlx::query_as::<_, BanditStat>(
            r#"
            SELECT user_id, genre, content_id, alpha, beta, last_trained AS last_trained_at
            FROM user_models
            WHERE user_id = $1 AND genre = $2
            "#,
        )
        .bind(user_id)
        .bind(genre)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|stat| (stat.content_id, stat)).collect())
    }

    async fn append_event(&self, event: NewInteraction) -> AppResult<InteractionEvent> {
        let owner: Option<String> = sqlx::query_scalar("SELECT genre FROM content WHERE id = $1")
            .bind(event.content_id)
            .fetch_optional(&self.pool)
            .await?;
        check_content_genre(event.content_id, owner.as_deref(), &event.genre)?;

        let result = sqlx::query(
            r#"
            INSERT INTO interactions (user_id, content_id, agent_type, reward, genre, ts)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(event.user_id)
        .bind(event.content_id)
        .bind(&event.policy)
        .bind(event.reward.as_i64() as i32)
        .bind(&event.genre)
        .bind(event.recorded_at)
        .fetch_one(&self.pool)
        .await;

        let row = match result {
            Ok(row) => row,
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                return Err(AppError::NotFound(format!("content {}", event.content_id)));
            }
            Err(e) => return Err(e.into()),
        };

        let id: i64 = row.try_get("id")?;
        Ok(InteractionEvent::from_new(id, event))
    }

    async fn aggregate_events(&self) -> AppResult<AggregateScan> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, genre, content_id,
                   COUNT(*) AS total,
                   COALESCE(SUM(reward), 0)::BIGINT AS successes
            FROM interactions
            GROUP BY user_id, genre, content_id
            ORDER BY user_id, genre, content_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scan = AggregateScan::default();
        for row in &rows {
            match decode_aggregate(row) {
                Ok(aggregate) => scan.aggregates.push(aggregate),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable interaction aggregate");
                    scan.undecodable += 1;
                }
            }
        }

        Ok(scan)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
