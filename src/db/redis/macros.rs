/// Read-through caching against Redis.
///
/// Evaluates to `Ok` with the cached value for `$key` when present.
/// Otherwise awaits `$block`, queues the result for a background write with
/// `$ttl` seconds to live, and evaluates to `Ok` with it. A failed cache
/// read is logged and treated as a miss; errors from the block propagate
/// with `?`, so the surrounding function must return `AppResult`.
///
/// ```rust,ignore
/// async fn movie_details(&self, id: u64) -> AppResult<MovieDetails> {
///     cached!(self.cache, CacheKey::MovieDetails(id), DETAILS_CACHE_TTL, async move {
///         self.fetch_details_uncached(id).await
///     })
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        let hit = match $cache.get_from_cache(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, fetching uncached");
                None
            }
        };
        match hit {
            Some(hit) => {
                tracing::debug!(key = %key, "Cache hit");
                Ok(hit)
            }
            None => {
                let value = $block.await?;
                $cache.set_in_background(&key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
