use std::collections::HashMap;

use crate::{
    error::{AppError, AppResult},
    models::{
        AggregateScan, BanditStat, ContentId, ContentItem, InteractionEvent, NewInteraction,
        SearchHit, UserId,
    },
};

pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::MemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};
pub use self::redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};

/// Persistent store shared by the recommender components
///
/// Content rows are written only through `upsert_content`, bandit statistics
/// only through `upsert_stat` (by the trainer), and interaction events only
/// through `append_event` (by the feedback recorder).
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommenderStore: Send + Sync {
    /// Inserts search hits for a genre, ignoring any `(genre, url)` already present.
    ///
    /// Returns the number of rows actually inserted.
    async fn upsert_content(&self, genre: &str, hits: &[SearchHit]) -> AppResult<usize>;

    /// All content items for a genre, ordered by id
    async fn content_by_genre(&self, genre: &str) -> AppResult<Vec<ContentItem>>;

    /// Insert-or-replace a statistics row keyed by its triple.
    ///
    /// A stored row derived from more events than `stat` is kept, so an
    /// overlapping pass working from an older snapshot cannot roll it back.
    /// Returns whether `stat` was written.
    async fn upsert_stat(&self, stat: &BanditStat) -> AppResult<bool>;

    /// Every statistics row for one user within one genre, in a single lookup
    async fn stats_for(
        &self,
        user_id: UserId,
        genre: &str,
    ) -> AppResult<HashMap<ContentId, BanditStat>>;

    /// Appends one interaction event and returns it with its assigned id.
    ///
    /// The content must exist (`NotFound`) and belong to the event's genre
    /// (`InvalidInput`).
    async fn append_event(&self, event: NewInteraction) -> AppResult<InteractionEvent>;

    /// Event counts grouped by (user, genre, content)
    async fn aggregate_events(&self) -> AppResult<AggregateScan>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Checks that feedback names an existing item of the same genre
pub(crate) fn check_content_genre(
    content_id: ContentId,
    owner: Option<&str>,
    genre: &str,
) -> AppResult<()> {
    match owner {
        None => Err(AppError::NotFound(format!("content {}", content_id))),
        Some(owner) if owner != genre => Err(AppError::InvalidInput(format!(
            "content {} belongs to genre '{}', not '{}'",
            content_id, owner, genre
        ))),
        Some(_) => Ok(()),
    }
}
