use std::sync::Arc;
use std::time::Duration;

use crate::{
    db::RecommenderStore,
    error::{AppError, AppResult},
    models::ContentItem,
    services::providers::ContentSearcher,
};

/// Number of videos fetched for a genre seen for the first time
pub const DEFAULT_POOL_SIZE: u32 = 5;

/// Upper bound on one external search call
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Supplies the candidate pool for a genre
///
/// Pools are populated lazily: the first request for a genre with no stored
/// items searches the external catalog and persists the results. Persisting
/// goes through the store's `(genre, url)` upsert guard, so concurrent misses
/// on the same genre converge on one set of rows.
#[derive(Clone)]
pub struct CandidateProvider {
    store: Arc<dyn RecommenderStore>,
    searcher: Arc<dyn ContentSearcher>,
    pool_size: u32,
    fetch_timeout: Duration,
}

impl CandidateProvider {
    pub fn new(store: Arc<dyn RecommenderStore>, searcher: Arc<dyn ContentSearcher>) -> Self {
        Self {
            store,
            searcher,
            pool_size: DEFAULT_POOL_SIZE,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Returns the non-empty candidate pool for a genre, ordered by content id
    pub async fn get_candidates(&self, genre: &str) -> AppResult<Vec<ContentItem>> {
        if genre.trim().is_empty() {
            return Err(AppError::InvalidInput("Genre cannot be empty".to_string()));
        }

        let existing = self.store.content_by_genre(genre).await?;
        if !existing.is_empty() {
            tracing::debug!(genre = %genre, candidates = existing.len(), "Candidate pool hit");
            return Ok(existing);
        }

        tracing::info!(
            genre = %genre,
            provider = self.searcher.name(),
            max_results = self.pool_size,
            "Candidate pool empty, searching external catalog"
        );

        let hits = match tokio::time::timeout(
            self.fetch_timeout,
            self.searcher.search(genre, self.pool_size),
        )
        .await
        {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                tracing::error!(genre = %genre, error = %e, "External content search failed");
                return Err(match e {
                    AppError::ContentFetchFailed(_) | AppError::InvalidInput(_) => e,
                    other => AppError::ContentFetchFailed(other.to_string()),
                });
            }
            Err(_) => {
                tracing::error!(
                    genre = %genre,
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "External content search timed out"
                );
                return Err(AppError::ContentFetchFailed(format!(
                    "search for '{}' timed out after {:?}",
                    genre, self.fetch_timeout
                )));
            }
        };

        if hits.is_empty() {
            tracing::warn!(genre = %genre, "External content search returned no results");
            return Err(AppError::NoContentAvailable(genre.to_string()));
        }

        // Never persist more than the pool size, whatever the upstream returned
        let hits = &hits[..hits.len().min(self.pool_size as usize)];
        let inserted = self.store.upsert_content(genre, hits).await?;

        let candidates = self.store.content_by_genre(genre).await?;
        if candidates.is_empty() {
            return Err(AppError::NoContentAvailable(genre.to_string()));
        }

        tracing::info!(
            genre = %genre,
            inserted,
            candidates = candidates.len(),
            "Candidate pool populated"
        );

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::SearchHit;
    use crate::services::providers::MockContentSearcher;

    fn hits(n: usize) -> Vec<SearchHit> {
        (1..=n)
            .map(|i| {
                SearchHit::new(
                    format!("Video {}", i),
                    format!("https://example.com/{}", i),
                )
            })
            .collect()
    }

    fn searcher_returning(result: Vec<SearchHit>, times: usize) -> MockContentSearcher {
        let mut searcher = MockContentSearcher::new();
        searcher.expect_name().return_const("mock");
        searcher
            .expect_search()
            .times(times)
            .returning(move |_, _| Ok(result.clone()));
        searcher
    }

    #[tokio::test]
    async fn test_miss_populates_then_memoizes() {
        let store = Arc::new(MemoryStore::new());
        let searcher = Arc::new(searcher_returning(hits(5), 1));
        let provider = CandidateProvider::new(store.clone(), searcher);

        let first = provider.get_candidates("Tech").await.unwrap();
        assert_eq!(first.len(), 5);
        assert!(first.iter().all(|item| item.genre == "Tech"));

        // Second call must be served from the store; the mock allows one search only
        let second = provider.get_candidates("Tech").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_search_is_bounded_by_pool_size() {
        let mut searcher = MockContentSearcher::new();
        searcher.expect_name().return_const("mock");
        searcher
            .expect_search()
            .withf(|genre, max_results| genre == "Music" && *max_results == 3)
            .times(1)
            .returning(|_, _| Ok(hits(8)));

        let provider =
            CandidateProvider::new(Arc::new(MemoryStore::new()), Arc::new(searcher))
                .with_pool_size(3);

        let candidates = provider.get_candidates("Music").await.unwrap();
        assert_eq!(candidates.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_search_is_no_content_available() {
        let provider = CandidateProvider::new(
            Arc::new(MemoryStore::new()),
            Arc::new(searcher_returning(vec![], 1)),
        );

        let result = provider.get_candidates("Obscure").await;
        assert!(matches!(result, Err(AppError::NoContentAvailable(genre)) if genre == "Obscure"));
    }

    #[tokio::test]
    async fn test_search_failure_is_content_fetch_failed() {
        let mut searcher = MockContentSearcher::new();
        searcher.expect_name().return_const("mock");
        searcher
            .expect_search()
            .returning(|_, _| Err(AppError::Internal("quota exceeded".to_string())));

        let store = Arc::new(MemoryStore::new());
        let provider = CandidateProvider::new(store.clone(), Arc::new(searcher));

        let result = provider.get_candidates("Tech").await;
        assert!(matches!(result, Err(AppError::ContentFetchFailed(_))));
        assert!(store.content_by_genre("Tech").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_genre_is_rejected_without_search() {
        let provider = CandidateProvider::new(
            Arc::new(MemoryStore::new()),
            Arc::new(searcher_returning(hits(1), 0)),
        );
        assert!(matches!(
            provider.get_candidates("  ").await,
            Err(AppError::InvalidInput(_))
        ));
    }

    struct SlowSearcher;

    #[async_trait::async_trait]
    impl ContentSearcher for SlowSearcher {
        async fn search(&self, _genre: &str, _max_results: u32) -> AppResult<Vec<SearchHit>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(hits(1))
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_search_timeout_is_content_fetch_failed() {
        let provider =
            CandidateProvider::new(Arc::new(MemoryStore::new()), Arc::new(SlowSearcher))
                .with_fetch_timeout(Duration::from_millis(20));

        let result = provider.get_candidates("Tech").await;
        assert!(matches!(result, Err(AppError::ContentFetchFailed(_))));
    }

    #[tokio::test]
    async fn test_concurrent_misses_do_not_duplicate_content() {
        let store = Arc::new(MemoryStore::new());
        let mut searcher = MockContentSearcher::new();
        searcher.expect_name().return_const("mock");
        searcher.expect_search().returning(|_, _| Ok(hits(5)));
        let provider = CandidateProvider::new(store.clone(), Arc::new(searcher));

        let (a, b) = tokio::join!(
            provider.get_candidates("Tech"),
            provider.get_candidates("Tech")
        );
        assert_eq!(a.unwrap().len(), 5);
        assert_eq!(b.unwrap().len(), 5);
        assert_eq!(store.content_by_genre("Tech").await.unwrap().len(), 5);
    }
}
