use std::sync::Arc;

use tokio::sync::RwLock;

use crate::services::{Debouncer, DetailsService, FilterSet, SearchController};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: SearchController,
    pub search_input: Debouncer,
    pub details: DetailsService,
    /// Client-side filters applied to every browse read
    pub filters: Arc<RwLock<FilterSet>>,
}

impl AppState {
    pub fn new(
        controller: SearchController,
        search_input: Debouncer,
        details: DetailsService,
    ) -> Self {
        Self {
            controller,
            search_input,
            details,
            filters: Arc::new(RwLock::new(FilterSet::default())),
        }
    }
}
