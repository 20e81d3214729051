use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::TrendingMovie;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    MovieDetails(u64),
    TrendingCounts,
    TrendingEntry(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::MovieDetails(id) => write!(f, "details:{}", id),
            CacheKey::TrendingCounts => write!(f, "trending:counts"),
            CacheKey::TrendingEntry(term) => {
                write!(f, "trending:entry:{}", normalize_term(term))
            }
        }
    }
}

/// Search terms are counted case- and whitespace-insensitively
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for the detail cache and the trending store.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Writes queued for the background writer
#[derive(Debug)]
enum CacheWrite {
    Set { key: String, value: String, ttl: u64 },
    /// Bumps the search count for `term` and stores its latest top result
    SearchHit { term: String, entry: String },
}

/// Handle to Redis for cached lookups and fire-and-forget writes
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWrite>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Asks the writer task to flush queued writes and waits for it to stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task failed");
        }
    }
}

impl Cache {
    /// Creates a new Cache instance with an async write background task
    ///
    /// Writes are processed off the request path so that recording a search
    /// or caching a detail record never delays a response.
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        let task = tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        let handle = CacheWriterHandle { shutdown_tx, task };

        (cache, handle)
    }

    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis");
                    }
                }
                _ = shutdown_rx.recv() => {
                    // Senders live inside every Cache clone, so drain what is
                    // already queued instead of waiting for the channel to close.
                    let mut flushed = 0usize;
                    while let Ok(msg) = write_rx.try_recv() {
                        flushed += 1;
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush write during shutdown");
                        }
                    }

                    tracing::info!(flushed, "Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write_to_redis(client: &Client, msg: CacheWrite) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        match msg {
            CacheWrite::Set { key, value, ttl } => {
                let _: () = conn.set_ex(key, value, ttl).await?;
            }
            CacheWrite::SearchHit { term, entry } => {
                let _: () = redis::pipe()
                    .atomic()
                    .zincr(CacheKey::TrendingCounts.to_string(), &term, 1)
                    .ignore()
                    .set(CacheKey::TrendingEntry(term.clone()).to_string(), entry)
                    .ignore()
                    .query_async(&mut conn)
                    .await?;
            }
        }
        Ok(())
    }

    /// Retrieves a value from the cache by key
    ///
    /// Returns `None` when the key is absent.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(format!("{}", key)).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Stores a value in the cache without waiting for the write
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        self.enqueue(CacheWrite::Set {
            key: format!("{}", key),
            value: json,
            ttl,
        });
    }

    /// Counts a search for `term` and remembers `entry` as its latest top result
    pub fn record_search_in_background(&self, term: &str, entry: &TrendingMovie) -> AppResult<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| AppError::Internal(format!("Trending serialization error: {}", e)))?;

        self.enqueue(CacheWrite::SearchHit {
            term: normalize_term(term),
            entry: json,
        });
        Ok(())
    }

    /// Reads the `limit` most searched terms, highest count first
    ///
    /// Terms whose entry is missing or unreadable are skipped and the next
    /// ranked terms fill their place.
    pub async fn top_searches(&self, limit: usize) -> AppResult<Vec<TrendingMovie>> {
        let mut trending = Vec::with_capacity(limit);
        if limit == 0 {
            return Ok(trending);
        }

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let mut start = 0isize;

        while trending.len() < limit {
            let stop = start + limit as isize - 1;
            let ranked: Vec<(String, f64)> = conn
                .zrevrange_withscores(CacheKey::TrendingCounts.to_string(), start, stop)
                .await?;
            if ranked.is_empty() {
                break;
            }
            let exhausted = ranked.len() < limit;

            let keys: Vec<String> = ranked
                .iter()
                .map(|(term, _)| CacheKey::TrendingEntry(term.clone()).to_string())
                .collect();
            let entries: Vec<Option<String>> = redis::cmd("MGET")
                .arg(&keys)
                .query_async(&mut conn)
                .await?;

            trending.extend(assemble_trending(ranked, entries));
            if exhausted {
                break;
            }
            start = stop + 1;
        }

        trending.truncate(limit);
        Ok(trending)
    }

    fn enqueue(&self, msg: CacheWrite) {
        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to queue cache write");
        }
    }
}

/// Pairs ranked terms with their stored entries, skipping unreadable ones
fn assemble_trending(ranked: Vec<(String, f64)>, entries: Vec<Option<String>>) -> Vec<TrendingMovie> {
    ranked
        .into_iter()
        .zip(entries)
        .filter_map(|((term, score), raw)| {
            let raw = raw?;
            match serde_json::from_str::<TrendingMovie>(&raw) {
                Ok(mut movie) => {
                    movie.count = score as u64;
                    Some(movie)
                }
                Err(e) => {
                    tracing::warn!(term = %term, error = %e, "Skipping malformed trending entry");
                    None
                }
            }
        })
        .collect()
}
