use std::fmt::Display;

use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::error::AppResult;

const KEY_PREFIX: &str = "reel";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Raw video search results for a genre and result count
    VideoSearch { genre: String, max_results: u32 },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::VideoSearch { genre, max_results } => write!(
                f,
                "{}:search:{}:{}",
                KEY_PREFIX,
                genre.trim().to_lowercase(),
                max_results
            ),
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// A serialized value waiting to be written
#[derive(Debug, PartialEq)]
struct PendingWrite {
    key: String,
    payload: String,
    ttl_secs: u64,
}

impl PendingWrite {
    fn encode<T: Serialize>(key: &CacheKey, value: &T, ttl_secs: u64) -> Option<Self> {
        match serde_json::to_string(value) {
            Ok(payload) => Some(Self {
                key: key.to_string(),
                payload,
                ttl_secs,
            }),
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Cache serialization error");
                None
            }
        }
    }
}

/// Read-through response cache backed by Redis
///
/// Reads go straight to Redis. Writes are queued to a background task so a
/// request never waits on storing the response it just fetched. Redis
/// failures degrade to a cache miss.
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
    queue: mpsc::UnboundedSender<PendingWrite>,
}

/// Stops the background writer after flushing queued writes
pub struct CacheWriterHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
    }
}

impl Cache {
    /// Connects to Redis and starts the background writer
    pub async fn connect(client: Client) -> AppResult<(Self, CacheWriterHandle)> {
        let conn = ConnectionManager::new(client).await?;
        let (queue, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(run_writer(conn.clone(), rx, stop_rx));

        Ok((Self { conn, queue }, CacheWriterHandle { stop_tx, task }))
    }

    /// Cached value for `key`, or `None` on a miss or any cache failure
    pub async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = match conn.get(key.to_string()).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let raw = raw?;
        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Queues `value` to be stored under `key` for `ttl_secs`
    pub fn store_in_background<T: Serialize>(&self, key: &CacheKey, value: &T, ttl_secs: u64) {
        let Some(write) = PendingWrite::encode(key, value, ttl_secs) else {
            return;
        };

        if self.queue.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer stopped, dropping write");
        }
    }
}

async fn run_writer(
    mut conn: ConnectionManager,
    mut rx: mpsc::UnboundedReceiver<PendingWrite>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    tracing::info!("Cache writer started");

    loop {
        tokio::select! {
            Some(write) = rx.recv() => write_entry(&mut conn, write).await,
            _ = &mut stop_rx => break,
        }
    }

    // Senders live on in cloned caches, so close before draining
    rx.close();
    let mut flushed = 0usize;
    while let Some(write) = rx.recv().await {
        write_entry(&mut conn, write).await;
        flushed += 1;
    }

    tracing::info!(flushed, "Cache writer stopped");
}

async fn write_entry(conn: &mut ConnectionManager, write: PendingWrite) {
    let result: redis::RedisResult<()> = conn
        .set_ex(&write.key, write.payload, write.ttl_secs)
        .await;
    if let Err(e) = result {
        tracing::error!(key = %write.key, error = %e, "Failed to write to Redis cache");
    }
}
