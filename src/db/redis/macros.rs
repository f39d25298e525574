/// Cache-aside helper over [`Cache`](crate::db::Cache).
///
/// Returns the cached value for `$key` when present. Otherwise awaits
/// `$block`, queues the result for a background write with `$ttl` seconds to
/// live, and returns it. With `keep_if = <predicate>` only values the
/// predicate accepts are written. Errors from the block are propagated with
/// `?`, so the macro must be used inside a function returning `AppResult`.
///
/// # Example
/// ```rust,ignore
/// async fn search(&self, key: CacheKey) -> AppResult<Vec<SearchHit>> {
///     cached!(self.cache, key, 3600, self.fetch_from_api(), keep_if = |hits: &Vec<SearchHit>| {
///         !hits.is_empty()
///     })
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr, keep_if = $keep:expr) => {{
        let key = $key;
        match $cache.lookup(&key).await {
            Some(hit) => Ok(hit),
            None => {
                let value = $block.await?;
                if ($keep)(&value) {
                    $cache.store_in_background(&key, &value, $ttl);
                }
                Ok(value)
            }
        }
    }};
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {
        $crate::cached!($cache, $key, $ttl, $block, keep_if = |_| true)
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde::{de::DeserializeOwned, Serialize};

    use crate::{db::CacheKey, error::AppResult};

    /// Records writes instead of talking to Redis; every lookup misses
    #[derive(Default)]
    struct RecordingCache {
        writes: Mutex<Vec<String>>,
    }

    impl RecordingCache {
        async fn lookup<T: DeserializeOwned>(&self, _key: &CacheKey) -> Option<T> {
            None
        }

        fn store_in_background<T: Serialize>(&self, key: &CacheKey, value: &T, _ttl: u64) {
            let payload = serde_json::to_string(value).unwrap();
            self.writes
                .lock()
                .unwrap()
                .push(format!("{}={}", key, payload));
        }
    }

    fn key() -> CacheKey {
        CacheKey::VideoSearch {
            genre: "Tech".to_string(),
            max_results: 5,
        }
    }

    async fn load(cache: &RecordingCache, result: Vec<u32>) -> AppResult<Vec<u32>> {
        cached!(cache, key(), 60, async move { AppResult::Ok(result) })
    }

    async fn load_non_empty(cache: &RecordingCache, result: Vec<u32>) -> AppResult<Vec<u32>> {
        cached!(
            cache,
            key(),
            60,
            async move { AppResult::Ok(result) },
            keep_if = |values: &Vec<u32>| !values.is_empty()
        )
    }

    #[tokio::test]
    async fn test_miss_writes_fetched_value() {
        let cache = RecordingCache::default();
        assert_eq!(load(&cache, vec![1, 2]).await.unwrap(), vec![1, 2]);
        assert_eq!(
            *cache.writes.lock().unwrap(),
            vec!["reel:search:tech:5=[1,2]".to_string()]
        );
    }

    #[tokio::test]
    async fn test_rejected_value_is_returned_but_not_written() {
        let cache = RecordingCache::default();
        assert!(load_non_empty(&cache, vec![]).await.unwrap().is_empty());
        assert!(cache.writes.lock().unwrap().is_empty());

        load_non_empty(&cache, vec![3]).await.unwrap();
        assert_eq!(cache.writes.lock().unwrap().len(), 1);
    }
}
