/// Movie metadata provider abstraction
///
/// The browse session only needs two things from the metadata service: a
/// page of results for a query and the detail record for one title.
use crate::{
    error::AppResult,
    models::{MovieDetails, MovieQuery, PageResponse},
};

pub mod tmdb;

/// Trait for movie metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieQueryClient: Send + Sync {
    /// Fetch one page of search (non-empty term) or discover (empty term) results
    ///
    /// `Err` means the request failed in transport or came back non-2xx.
    /// `Ok(PageResponse::Rejected)` means the service answered but reported
    /// the query as failed.
    async fn fetch_page(&self, query: &MovieQuery) -> AppResult<PageResponse>;

    /// Fetch the detail record for one title, including videos, credits and reviews
    async fn movie_details(&self, movie_id: u64) -> AppResult<MovieDetails>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
