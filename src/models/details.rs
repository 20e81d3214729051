use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw TMDB response from `/movie/{id}?append_to_response=videos,credits,reviews`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub spoken_languages: Vec<TmdbSpokenLanguage>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub budget: Option<u64>,
    #[serde(default)]
    pub revenue: Option<u64>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub videos: Option<TmdbVideos>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
    #[serde(default)]
    pub reviews: Option<TmdbReviews>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbGenre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbSpokenLanguage {
    #[serde(default)]
    pub english_name: Option<String>,
    #[serde(default)]
    pub iso_639_1: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbVideos {
    #[serde(default)]
    pub results: Vec<TmdbVideo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbVideo {
    pub key: String,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(rename = "type", default)]
    pub video_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCastMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbCastMember {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbReviews {
    #[serde(default)]
    pub results: Vec<TmdbReview>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbReview {
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub content: String,
}

// ============================================================================
// Detail view returned to the client
// ============================================================================

/// Everything the detail page shows for one title
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovieDetailView {
    pub id: u64,
    pub title: String,
    pub release_date: Option<String>,
    pub release_year: Option<String>,
    /// Human-readable runtime, e.g. "2h 5m"
    pub runtime: Option<String>,
    pub rating: Option<f64>,
    pub vote_count: u64,
    pub poster_url: Option<String>,
    pub trailer_url: Option<String>,
    pub genres: Vec<String>,
    pub overview: Option<String>,
    pub status: Option<String>,
    pub languages: String,
    pub tagline: Option<String>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    pub homepage: Option<String>,
    pub top_cast: Vec<CastMember>,
    pub top_reviews: Vec<ReviewExcerpt>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewExcerpt {
    pub author: String,
    pub excerpt: String,
}
