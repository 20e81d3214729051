/// TMDB (The Movie Database) provider
///
/// API Flow:
/// 1. Listing: /search/movie (term given) or /discover/movie (no term)
/// 2. Details: /movie/{id}?append_to_response=videos,credits,reviews
///
/// Authenticates with the v4 read access token as a bearer token.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{MovieDetails, MovieQuery, PageResponse, TmdbPageResponse},
    services::providers::MovieQueryClient,
};
use reqwest::{header::ACCEPT, Client as HttpClient, StatusCode};

const DETAILS_CACHE_TTL: u64 = 3600; // 1 hour
const DETAILS_APPEND: &str = "videos,credits,reviews";

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
    }

    async fn fetch_details_uncached(&self, movie_id: u64) -> AppResult<MovieDetails> {
        let response = self
            .get(&format!("/movie/{}", movie_id))
            .query(&[("append_to_response", DETAILS_APPEND)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Movie {} not found", movie_id)));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB returned status {}: {}",
                status, body
            )));
        }

        let details: MovieDetails = response.json().await?;

        tracing::info!(
            movie_id,
            title = %details.title,
            provider = "tmdb",
            "Movie details fetched"
        );

        Ok(details)
    }
}

#[async_trait::async_trait]
impl MovieQueryClient for TmdbProvider {
    async fn fetch_page(&self, query: &MovieQuery) -> AppResult<PageResponse> {
        let response = self
            .get(query.path())
            .query(&query.params())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB returned status {}: {}",
                status, body
            )));
        }

        let raw: TmdbPageResponse = response.json().await?;
        let page = PageResponse::from(raw);

        match &page {
            PageResponse::Page(movies) => tracing::info!(
                term = %query.term,
                page = query.page,
                mode = ?query.mode(),
                results = movies.results.len(),
                total_pages = ?movies.total_pages,
                provider = "tmdb",
                "Movie page fetched"
            ),
            PageResponse::Rejected { message } => tracing::warn!(
                term = %query.term,
                page = query.page,
                message = ?message,
                provider = "tmdb",
                "Movie query rejected"
            ),
        }

        Ok(page)
    }

    async fn movie_details(&self, movie_id: u64) -> AppResult<MovieDetails> {
        cached!(
            self.cache,
            CacheKey::MovieDetails(movie_id),
            DETAILS_CACHE_TTL,
            async move { self.fetch_details_uncached(movie_id).await }
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
