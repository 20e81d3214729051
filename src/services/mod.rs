pub mod controller;
pub mod debounce;
pub mod details;
pub mod filter;
pub mod providers;
pub mod trending;

pub use controller::{FetchOutcome, LoadMore, SearchController, SessionSnapshot, TrendingSnapshot};
pub use debounce::{spawn_session_driver, Debouncer};
pub use details::DetailsService;
pub use filter::{apply_filters, FilterFields, FilterSet};
pub use providers::{tmdb::TmdbProvider, MovieQueryClient};
pub use trending::{RedisTrendingStore, TrendingStore};
