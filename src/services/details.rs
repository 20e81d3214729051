use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult, FETCH_DETAILS_FAILED},
    models::{CastMember, MovieDetailView, MovieDetails, ReviewExcerpt},
    services::{providers::MovieQueryClient, trending::poster_url},
};

const TOP_CAST: usize = 6;
const TOP_REVIEWS: usize = 2;
const REVIEW_EXCERPT_CHARS: usize = 180;
const TRAILER_EMBED_URL: &str = "https://www.youtube.com/embed";

/// Builds the detail page for a single title
#[derive(Clone)]
pub struct DetailsService {
    client: Arc<dyn MovieQueryClient>,
    image_base_url: String,
}

impl DetailsService {
    pub fn new(client: Arc<dyn MovieQueryClient>, image_base_url: String) -> Self {
        Self {
            client,
            image_base_url,
        }
    }

    pub async fn movie_detail(&self, movie_id: u64) -> AppResult<MovieDetailView> {
        let details = self
            .client
            .movie_details(movie_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(msg) => AppError::NotFound(msg),
                other => {
                    tracing::error!(error = %other, movie_id, "Error fetching movie details");
                    AppError::ExternalApi(FETCH_DETAILS_FAILED.to_string())
                }
            })?;

        Ok(build_view(details, &self.image_base_url))
    }
}

fn build_view(details: MovieDetails, image_base_url: &str) -> MovieDetailView {
    let release_year = details
        .release_date
        .as_deref()
        .and_then(|date| date.split('-').next())
        .filter(|year| !year.is_empty())
        .map(str::to_string);

    let languages = details
        .spoken_languages
        .iter()
        .filter_map(|lang| lang.english_name.as_deref())
        .collect::<Vec<_>>()
        .join(", ");

    let trailer_url = details
        .videos
        .as_ref()
        .and_then(|videos| videos.results.first())
        .map(|video| format!("{}/{}", TRAILER_EMBED_URL, video.key));

    let top_cast = details
        .credits
        .map(|credits| {
            credits
                .cast
                .into_iter()
                .take(TOP_CAST)
                .map(|actor| CastMember {
                    name: actor.name,
                    character: actor.character.filter(|c| !c.is_empty()),
                })
                .collect()
        })
        .unwrap_or_default();

    let top_reviews = details
        .reviews
        .map(|reviews| {
            reviews
                .results
                .into_iter()
                .take(TOP_REVIEWS)
                .map(|review| ReviewExcerpt {
                    author: review.author,
                    excerpt: excerpt(&review.content),
                })
                .collect()
        })
        .unwrap_or_default();

    MovieDetailView {
        id: details.id,
        poster_url: poster_url(image_base_url, details.poster_path.as_deref()),
        title: details.title,
        release_date: details.release_date,
        release_year,
        runtime: details.runtime.and_then(runtime_label),
        rating: details.vote_average,
        vote_count: details.vote_count.unwrap_or(0),
        trailer_url,
        genres: details.genres.into_iter().map(|g| g.name).collect(),
        overview: details.overview,
        status: details.status,
        languages,
        tagline: details.tagline.filter(|t| !t.is_empty()),
        budget: details.budget,
        revenue: details.revenue,
        homepage: details.homepage.filter(|h| !h.is_empty()),
        top_cast,
        top_reviews,
        fetched_at: Utc::now(),
    }
}

/// "2h 57m" style label; zero runtime means unknown
fn runtime_label(minutes: u32) -> Option<String> {
    (minutes > 0).then(|| format!("{}h {}m", minutes / 60, minutes % 60))
}

fn excerpt(content: &str) -> String {
    let head: String = content.chars().take(REVIEW_EXCERPT_CHARS).collect();
    format!("{}...", head)
}
