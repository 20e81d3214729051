use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::Movie,
};

/// Client-side filters over the accumulated results
///
/// Unset fields match everything. Never sent to the metadata service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    pub genre: Option<u32>,
    pub year: Option<String>,
    pub min_rating: Option<f64>,
}

/// Filter fields as typed into the form; blank means unset
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterFields {
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
}

fn non_blank(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

impl FilterSet {
    /// Parses raw form fields
    pub fn from_fields(fields: &FilterFields) -> AppResult<Self> {
        let genre = non_blank(fields.genre.as_deref())
            .map(|g| {
                g.parse::<u32>()
                    .map_err(|_| AppError::InvalidInput(format!("Invalid genre id: {}", g)))
            })
            .transpose()?;

        let min_rating = non_blank(fields.rating.as_deref())
            .map(|r| match r.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(value),
                _ => Err(AppError::InvalidInput(format!("Invalid rating: {}", r))),
            })
            .transpose()?;

        Ok(Self {
            genre,
            year: non_blank(fields.year.as_deref()).map(str::to_string),
            min_rating,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.genre.is_none() && self.year.is_none() && self.min_rating.is_none()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// An absent optional field only fails the filter that needs it
    pub fn matches(&self, movie: &Movie) -> bool {
        let genre_ok = self.genre.map_or(true, |genre| {
            movie
                .genre_ids
                .as_ref()
                .is_some_and(|ids| ids.contains(&genre))
        });

        let year_ok = self.year.as_deref().map_or(true, |year| {
            movie
                .release_date
                .as_deref()
                .is_some_and(|date| date.starts_with(year))
        });

        let rating_ok = self.min_rating.map_or(true, |min| {
            movie.vote_average.is_some_and(|rating| rating >= min)
        });

        genre_ok && year_ok && rating_ok
    }
}

/// Returns the items that pass `filters`, in their original order
pub fn apply_filters(items: &[Movie], filters: &FilterSet) -> Vec<Movie> {
    items
        .iter()
        .filter(|movie| filters.matches(movie))
        .cloned()
        .collect()
}
