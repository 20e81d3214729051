use crate::{
    db::{normalize_term, Cache},
    error::AppResult,
    models::{Movie, TrendingMovie},
};

/// Store of popular searches, independent of the live browse session
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TrendingStore: Send + Sync {
    /// Most searched terms with their latest top result, highest count first
    async fn top_searches(&self) -> AppResult<Vec<TrendingMovie>>;

    /// Count a search for `term` whose best result was `top_result`
    ///
    /// Best-effort: callers log failures and carry on.
    async fn record_search(&self, term: &str, top_result: &Movie) -> AppResult<()>;
}

/// Trending store backed by a Redis sorted set of search counts
#[derive(Clone)]
pub struct RedisTrendingStore {
    cache: Cache,
    image_base_url: String,
    limit: usize,
}

impl RedisTrendingStore {
    pub fn new(cache: Cache, image_base_url: String, limit: usize) -> Self {
        Self {
            cache,
            image_base_url: image_base_url.trim_end_matches('/').to_string(),
            limit,
        }
    }

    fn entry_for(&self, term: &str, movie: &Movie) -> TrendingMovie {
        TrendingMovie {
            id: normalize_term(term),
            title: movie.title.clone(),
            movie_id: movie.id,
            poster_url: poster_url(&self.image_base_url, movie.poster_path.as_deref()),
            count: 0,
        }
    }
}

/// Full image URL for a TMDB poster path
pub fn poster_url(image_base_url: &str, poster_path: Option<&str>) -> Option<String> {
    poster_path
        .filter(|p| !p.is_empty())
        .map(|p| format!("{}{}", image_base_url.trim_end_matches('/'), p))
}

#[async_trait::async_trait]
impl TrendingStore for RedisTrendingStore {
    async fn top_searches(&self) -> AppResult<Vec<TrendingMovie>> {
        let trending = self.cache.top_searches(self.limit).await?;
        tracing::info!(count = trending.len(), "Trending searches loaded");
        Ok(trending)
    }

    async fn record_search(&self, term: &str, top_result: &Movie) -> AppResult<()> {
        let entry = self.entry_for(term, top_result);
        self.cache.record_search_in_background(term, &entry)?;
        tracing::debug!(term = %entry.id, movie_id = entry.movie_id, "Search queued for trending");
        Ok(())
    }
}
