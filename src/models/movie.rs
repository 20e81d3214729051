use serde::{Deserialize, Serialize};

/// A movie as listed in search and discover results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub genre_ids: Option<Vec<u32>>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
}

impl Movie {
    /// Minimal listing entry, mostly useful for fixtures
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            genre_ids: None,
            release_date: None,
            vote_average: None,
            poster_path: None,
            overview: None,
            original_language: None,
        }
    }
}

/// One successful page of results
#[derive(Debug, Clone, PartialEq)]
pub struct MoviePage {
    pub results: Vec<Movie>,
    pub total_pages: Option<u32>,
}

/// Outcome of a page request that reached the service
#[derive(Debug, Clone, PartialEq)]
pub enum PageResponse {
    Page(MoviePage),
    /// The service answered 2xx but flagged the request as failed
    Rejected { message: Option<String> },
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Raw list response from `/search/movie` and `/discover/movie`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPageResponse {
    #[serde(rename = "Response", default)]
    pub response: Option<String>,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<Movie>>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

impl From<TmdbPageResponse> for PageResponse {
    fn from(raw: TmdbPageResponse) -> Self {
        if raw.response.as_deref() == Some("False") {
            return PageResponse::Rejected {
                message: raw.error.filter(|e| !e.is_empty()),
            };
        }

        PageResponse::Page(MoviePage {
            results: raw.results.unwrap_or_default(),
            total_pages: raw.total_pages,
        })
    }
}
