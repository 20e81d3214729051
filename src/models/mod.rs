use serde::{Deserialize, Serialize};

pub mod details;
pub mod movie;
pub mod trending;

pub use details::{
    CastMember, MovieDetailView, MovieDetails, ReviewExcerpt, TmdbCastMember, TmdbCredits,
    TmdbGenre, TmdbReview, TmdbReviews, TmdbSpokenLanguage, TmdbVideo, TmdbVideos,
};
pub use movie::{Movie, MoviePage, PageResponse, TmdbPageResponse};
pub use trending::TrendingMovie;

/// How a query is sent to the metadata service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Ranked title search for a non-empty term
    Search,
    /// Unranked popularity browse when the term is empty
    Discover,
}

const SORT_ORDER: &str = "popularity.desc";

/// A single page request against the metadata service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieQuery {
    pub term: String,
    pub page: u32,
}

impl MovieQuery {
    pub fn new(term: impl Into<String>, page: u32) -> Self {
        Self {
            term: term.into(),
            page,
        }
    }

    pub fn mode(&self) -> QueryMode {
        if self.term.is_empty() {
            QueryMode::Discover
        } else {
            QueryMode::Search
        }
    }

    /// Endpoint path relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self.mode() {
            QueryMode::Search => "/search/movie",
            QueryMode::Discover => "/discover/movie",
        }
    }

    /// Query-string parameters; the term is only sent in search mode
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(4);
        if self.mode() == QueryMode::Search {
            params.push(("query", self.term.clone()));
        }
        params.push(("sort_by", SORT_ORDER.to_string()));
        params.push(("include_adult", "false".to_string()));
        params.push(("page", self.page.to_string()));
        params
    }
}
