use serde::{Deserialize, Serialize};

/// A popular search as recorded in the trending store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingMovie {
    /// Normalised search term the entry is keyed by
    pub id: String,
    pub title: String,
    pub movie_id: u64,
    pub poster_url: Option<String>,
    /// Number of recorded searches, filled in when read back
    #[serde(default)]
    pub count: u64,
}
