use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    db::{check_content_genre, RecommenderStore},
    error::{AppError, AppResult},
    models::{
        AggregateScan, BanditStat, ContentId, ContentItem, EventAggregate, InteractionEvent,
        NewInteraction, SearchHit, TripleKey, UserId,
    },
};

/// In-process store with the same contract as the Postgres store
///
/// Used for local runs (`STORE_BACKEND=memory`) and tests. State is lost on
/// restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    content: Vec<ContentItem>,
    events: Vec<InteractionEvent>,
    stats: HashMap<TripleKey, BanditStat>,
    next_content_id: ContentId,
    next_event_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of appended interaction events
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.events.len()
    }

    /// Statistics row for a triple, if one has been trained
    pub async fn stat(&self, key: &TripleKey) -> Option<BanditStat> {
        self.inner.read().await.stats.get(key).cloned()
    }
}

#[async_trait::async_trait]
impl RecommenderStore for MemoryStore {
    async fn upsert_content(&self, genre: &str, hits: &[SearchHit]) -> AppResult<usize> {
        let mut inner = self.inner.write().await;
        let mut inserted = 0;

        for hit in hits {
            let exists = inner
                .content
                .iter()
                .any(|item| item.genre == genre && item.url == hit.url);
            if exists {
                continue;
            }

            inner.next_content_id += 1;
            let id = inner.next_content_id;
            inner.content.push(ContentItem {
                id,
                genre: genre.to_string(),
                title: hit.title.clone(),
                url: hit.url.clone(),
            });
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn content_by_genre(&self, genre: &str) -> AppResult<Vec<ContentItem>> {
        let inner = self.inner.read().await;
        // Ids are assigned monotonically, so insertion order is id order
        Ok(inner
            .content
            .iter()
            .filter(|item| item.genre == genre)
            .cloned()
            .collect())
    }

    async fn upsert_stat(&self, stat: &BanditStat) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if !inner.content.iter().any(|item| item.id == stat.content_id) {
            return Err(AppError::NotFound(format!("content {}", stat.content_id)));
        }

        let key = stat.key();
        if let Some(stored) = inner.stats.get(&key) {
            if stored.observations() > stat.observations() {
                return Ok(false);
            }
        }
        inner.stats.insert(key, stat.clone());
        Ok(true)
    }

    async fn stats_for(
        &self,
        user_id: UserId,
        genre: &str,
    ) -> AppResult<HashMap<ContentId, BanditStat>> {
        let inner = self.inner.read().await;
        Ok(inner
            .stats
            .values()
            .filter(|stat| stat.user_id == user_id && stat.genre == genre)
            .map(|stat| (stat.content_id, stat.clone()))
            .collect())
    }

    async fn append_event(&self, event: NewInteraction) -> AppResult<InteractionEvent> {
        let mut inner = self.inner.write().await;
        let owner = inner
            .content
            .iter()
            .find(|item| item.id == event.content_id)
            .map(|item| item.genre.as_str());
        check_content_genre(event.content_id, owner, &event.genre)?;

        inner.next_event_id += 1;
        let appended = InteractionEvent::from_new(inner.next_event_id, event);
        inner.events.push(appended.clone());
        Ok(appended)
    }

    async fn aggregate_events(&self) -> AppResult<AggregateScan> {
        let inner = self.inner.read().await;
        let mut grouped: BTreeMap<TripleKey, (i64, i64)> = BTreeMap::new();

        for event in &inner.events {
            let key = TripleKey::new(event.user_id, event.genre.clone(), event.content_id);
            let counts = grouped.entry(key).or_insert((0, 0));
            counts.0 += 1;
            counts.1 += event.reward.as_i64();
        }

        let aggregates: Vec<EventAggregate> = grouped
            .into_iter()
            .map(|(key, (total, successes))| EventAggregate {
                key,
                total,
                successes,
            })
            .collect();

        Ok(aggregates.into())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Reward;
    use chrono::Utc;

    fn hits(urls: &[&str]) -> Vec<SearchHit> {
        urls.iter()
            .map(|url| SearchHit::new(format!("Video {}", url), *url))
            .collect()
    }

    fn interaction(user_id: UserId, content_id: ContentId, reward: Reward) -> NewInteraction {
        NewInteraction {
            user_id,
            content_id,
            genre: "Tech".to_string(),
            policy: "thompson".to_string(),
            reward,
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_content_dedupes_on_genre_and_url() {
        let store = MemoryStore::new();
        assert_eq!(store.upsert_content("Tech", &hits(&["a", "b"])).await.unwrap(), 2);
        assert_eq!(store.upsert_content("Tech", &hits(&["b", "c"])).await.unwrap(), 1);
        // Same url in another genre is a different item
        assert_eq!(store.upsert_content("Music", &hits(&["a"])).await.unwrap(), 1);

        let tech = store.content_by_genre("Tech").await.unwrap();
        let ids: Vec<ContentId> = tech.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.content_by_genre("Music").await.unwrap().len(), 1);
        assert!(store.content_by_genre("News").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_event_requires_known_content() {
        let store = MemoryStore::new();
        let result = store.append_event(interaction(1, 99, Reward::Positive)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_append_event_rejects_genre_mismatch() {
        let store = MemoryStore::new();
        store.upsert_content("Music", &hits(&["a"])).await.unwrap();

        let result = store.append_event(interaction(1, 1, Reward::Positive)).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_aggregate_groups_by_triple() {
        let store = MemoryStore::new();
        store.upsert_content("Tech", &hits(&["a", "b"])).await.unwrap();

        store.append_event(interaction(1, 1, Reward::Positive)).await.unwrap();
        store.append_event(interaction(1, 1, Reward::Negative)).await.unwrap();
        store.append_event(interaction(1, 2, Reward::Positive)).await.unwrap();
        store.append_event(interaction(2, 1, Reward::Negative)).await.unwrap();

        let scan = store.aggregate_events().await.unwrap();
        assert_eq!(scan.undecodable, 0);
        assert_eq!(
            scan.aggregates,
            vec![
                EventAggregate {
                    key: TripleKey::new(1, "Tech", 1),
                    total: 2,
                    successes: 1,
                },
                EventAggregate {
                    key: TripleKey::new(1, "Tech", 2),
                    total: 1,
                    successes: 1,
                },
                EventAggregate {
                    key: TripleKey::new(2, "Tech", 1),
                    total: 1,
                    successes: 0,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_upsert_stat_replaces_row() {
        let store = MemoryStore::new();
        store.upsert_content("Tech", &hits(&["a"])).await.unwrap();

        let mut stat = BanditStat {
            user_id: 7,
            genre: "Tech".to_string(),
            content_id: 1,
            alpha: 2,
            beta: 1,
            last_trained_at: Utc::now(),
        };
        assert!(store.upsert_stat(&stat).await.unwrap());
        stat.alpha = 5;
        assert!(store.upsert_stat(&stat).await.unwrap());

        let stats = store.stats_for(7, "Tech").await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[&1].alpha, 5);
        assert!(store.stats_for(7, "Music").await.unwrap().is_empty());
        assert!(store.stats_for(8, "Tech").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_stat_keeps_row_with_more_evidence() {
        let store = MemoryStore::new();
        store.upsert_content("Tech", &hits(&["a"])).await.unwrap();

        let newer = BanditStat {
            user_id: 7,
            genre: "Tech".to_string(),
            content_id: 1,
            alpha: 3,
            beta: 1,
            last_trained_at: Utc::now(),
        };
        let stale = BanditStat {
            alpha: 2,
            ..newer.clone()
        };

        assert!(store.upsert_stat(&newer).await.unwrap());
        assert!(!store.upsert_stat(&stale).await.unwrap());

        let stored = store.stat(&newer.key()).await.unwrap();
        assert_eq!((stored.alpha, stored.beta), (3, 1));
    }
}
