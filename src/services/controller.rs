/// Browse/search session controller
///
/// Owns the live session (effective term, page, accumulated items, total
/// pages) and decides when to reset, when to append and when to stop.
///
/// Every page fetch is tagged with the session counter at dispatch time; a
/// response that arrives after a newer session started is dropped without
/// touching state. Fetches run on their own task so that `is_loading` is
/// cleared even when the caller goes away mid-request.
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::{
    error::{AppResult, FETCH_MOVIES_FAILED, FETCH_MOVIES_FALLBACK, FETCH_TRENDING_FAILED},
    models::{Movie, MovieQuery, PageResponse, QueryMode, TrendingMovie},
    services::{providers::MovieQueryClient, trending::TrendingStore},
};

/// Result of a single page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Loaded { count: usize },
    /// Service answered but reported the query as failed
    Rejected,
    /// Transport failure or non-2xx response
    Failed,
    /// Response belonged to a superseded session and was dropped
    Stale,
}

/// Result of a `load_more` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadMore {
    Fetched { page: u32, outcome: FetchOutcome },
    /// A fetch for this session is already in flight
    Busy,
    /// No further pages exist for this session
    Exhausted,
}

/// Point-in-time copy of the live session
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSnapshot {
    pub effective_term: String,
    pub mode: QueryMode,
    pub page: u32,
    pub items: Vec<Movie>,
    pub total_pages: Option<u32>,
    pub has_more: bool,
    pub is_loading: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TrendingSnapshot {
    pub movies: Vec<TrendingMovie>,
    pub error_message: Option<String>,
}

#[derive(Debug)]
struct SessionState {
    session: u64,
    effective_term: String,
    page: u32,
    items: Vec<Movie>,
    total_pages: Option<u32>,
    has_more: bool,
    is_loading: bool,
    error_message: Option<String>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            session: 0,
            effective_term: String::new(),
            page: 1,
            items: Vec::new(),
            total_pages: None,
            has_more: true,
            is_loading: false,
            error_message: None,
        }
    }

    /// Supersedes the current session and returns the new session id
    fn begin_session(&mut self, term: &str) -> u64 {
        self.session += 1;
        self.effective_term = term.to_string();
        self.page = 1;
        self.items.clear();
        self.total_pages = None;
        self.has_more = true;
        // Keeps load_more out until the first page lands.
        self.is_loading = true;
        self.error_message = None;
        self.session
    }

    /// Folds a page response into the session
    ///
    /// Returns the outcome and, for the first page of a search that found
    /// something, the top result to report as trending.
    fn apply(
        &mut self,
        result: AppResult<PageResponse>,
        query: &MovieQuery,
        append: bool,
    ) -> (FetchOutcome, Option<Movie>) {
        match result {
            Ok(PageResponse::Page(page)) => {
                let count = page.results.len();
                let top_result = if query.mode() == QueryMode::Search && query.page == 1 {
                    page.results.first().cloned()
                } else {
                    None
                };

                if append {
                    self.items.extend(page.results);
                } else {
                    self.items = page.results;
                }
                self.total_pages = page.total_pages;

                (FetchOutcome::Loaded { count }, top_result)
            }
            Ok(PageResponse::Rejected { message }) => {
                tracing::warn!(
                    term = %query.term,
                    page = query.page,
                    message = ?message,
                    "Movie query rejected by provider"
                );
                self.error_message =
                    Some(message.unwrap_or_else(|| FETCH_MOVIES_FALLBACK.to_string()));
                if !append {
                    self.items.clear();
                }
                (FetchOutcome::Rejected, None)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    term = %query.term,
                    page = query.page,
                    "Error fetching movies"
                );
                self.error_message = Some(FETCH_MOVIES_FAILED.to_string());
                if !append {
                    self.items.clear();
                }
                (FetchOutcome::Failed, None)
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            effective_term: self.effective_term.clone(),
            mode: MovieQuery::new(self.effective_term.clone(), self.page).mode(),
            page: self.page,
            items: self.items.clone(),
            total_pages: self.total_pages,
            has_more: self.has_more,
            is_loading: self.is_loading,
            error_message: self.error_message.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SearchController {
    client: Arc<dyn MovieQueryClient>,
    trending_store: Arc<dyn TrendingStore>,
    state: Arc<RwLock<SessionState>>,
    trending: Arc<RwLock<TrendingSnapshot>>,
}

impl SearchController {
    pub fn new(client: Arc<dyn MovieQueryClient>, trending_store: Arc<dyn TrendingStore>) -> Self {
        Self {
            client,
            trending_store,
            state: Arc::new(RwLock::new(SessionState::new())),
            trending: Arc::new(RwLock::new(TrendingSnapshot::default())),
        }
    }

    /// Starts a new session for `term` and fetches its first page
    ///
    /// Items, page and total pages are reset before the request goes out.
    pub async fn start_session(&self, term: &str) -> FetchOutcome {
        let session = self.state.write().await.begin_session(term);

        tracing::info!(
            session,
            term = %term,
            provider = self.client.name(),
            "Starting browse session"
        );

        let handle = self.dispatch(session, MovieQuery::new(term, 1), false);
        self.join(session, handle).await
    }

    /// Fetches and appends the next page of the live session
    ///
    /// Ignored while another fetch is in flight. Once the next page would
    /// pass the known total, the session is marked exhausted and nothing is
    /// fetched.
    pub async fn load_more(&self) -> LoadMore {
        let (session, query) = {
            let mut state = self.state.write().await;

            if state.is_loading {
                tracing::debug!(session = state.session, "Load more ignored, fetch in flight");
                return LoadMore::Busy;
            }
            if !state.has_more {
                return LoadMore::Exhausted;
            }

            let next_page = state.page + 1;
            if let Some(total_pages) = state.total_pages {
                if next_page > total_pages {
                    state.has_more = false;
                    tracing::info!(
                        session = state.session,
                        total_pages,
                        "No more pages for session"
                    );
                    return LoadMore::Exhausted;
                }
            }

            // Claimed under the same lock as the check above.
            state.is_loading = true;
            (
                state.session,
                MovieQuery::new(state.effective_term.clone(), next_page),
            )
        };

        let page = query.page;
        let handle = self.dispatch(session, query, true);
        let outcome = self.join(session, handle).await;

        LoadMore::Fetched { page, outcome }
    }

    /// Loads the trending list once; failures leave it empty and are not retried
    pub async fn load_trending(&self) -> Vec<TrendingMovie> {
        match self.trending_store.top_searches().await {
            Ok(movies) => {
                let mut trending = self.trending.write().await;
                trending.movies = movies.clone();
                trending.error_message = None;
                movies
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching trending movies");
                {
                    let mut trending = self.trending.write().await;
                    trending.movies.clear();
                    trending.error_message = Some(FETCH_TRENDING_FAILED.to_string());
                }
                self.state.write().await.error_message = Some(FETCH_TRENDING_FAILED.to_string());
                Vec::new()
            }
        }
    }

    /// Start-up load: the discover listing, then trending
    ///
    /// Trending goes second so that its failure message is not wiped by the
    /// session reset.
    pub async fn initial_load(&self) -> FetchOutcome {
        let outcome = self.start_session("").await;
        self.load_trending().await;
        outcome
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn trending(&self) -> TrendingSnapshot {
        self.trending.read().await.clone()
    }

    pub async fn effective_term(&self) -> String {
        self.state.read().await.effective_term.clone()
    }

    /// Spawns the fetch so that it completes even if the caller is dropped
    fn dispatch(&self, session: u64, query: MovieQuery, append: bool) -> JoinHandle<FetchOutcome> {
        let this = self.clone();
        tokio::spawn(async move { this.fetch_page(session, query, append).await })
    }

    async fn join(&self, session: u64, handle: JoinHandle<FetchOutcome>) -> FetchOutcome {
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, session, "Page fetch task failed");
                let mut state = self.state.write().await;
                if state.session == session {
                    state.is_loading = false;
                    state.error_message = Some(FETCH_MOVIES_FAILED.to_string());
                }
                FetchOutcome::Failed
            }
        }
    }

    async fn fetch_page(&self, session: u64, query: MovieQuery, append: bool) -> FetchOutcome {
        {
            let mut state = self.state.write().await;
            if state.session != session {
                return FetchOutcome::Stale;
            }
            state.is_loading = true;
            state.error_message = None;
        }

        let result = self.client.fetch_page(&query).await;

        let (outcome, top_result) = {
            let mut state = self.state.write().await;
            if state.session != session {
                tracing::debug!(
                    session,
                    current_session = state.session,
                    term = %query.term,
                    page = query.page,
                    "Discarding response for superseded session"
                );
                return FetchOutcome::Stale;
            }

            let applied = state.apply(result, &query, append);
            if append {
                state.page = query.page;
            }
            state.is_loading = false;
            applied
        };

        if let Some(top_result) = top_result {
            if let Err(e) = self
                .trending_store
                .record_search(&query.term, &top_result)
                .await
            {
                tracing::warn!(error = %e, term = %query.term, "Failed to record search");
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::MoviePage,
        services::{providers::MockMovieQueryClient, trending::MockTrendingStore},
    };
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::{mpsc, oneshot};

    fn page(movies: Vec<Movie>, total_pages: u32) -> AppResult<PageResponse> {
        Ok(PageResponse::Page(MoviePage {
            results: movies,
            total_pages: Some(total_pages),
        }))
    }

    fn batman() -> Movie {
        let mut movie = Movie::new(1, "Batman");
        movie.genre_ids = Some(vec![28]);
        movie.release_date = Some("2022-03-04".to_string());
        movie.vote_average = Some(7.8);
        movie
    }

    fn quiet_trending() -> MockTrendingStore {
        let mut trending = MockTrendingStore::new();
        trending.expect_record_search().returning(|_, _| Ok(()));
        trending
    }

    fn controller(client: MockMovieQueryClient, trending: MockTrendingStore) -> SearchController {
        SearchController::new(Arc::new(client), Arc::new(trending))
    }

    fn mock_client() -> MockMovieQueryClient {
        let mut client = MockMovieQueryClient::new();
        client.expect_name().return_const("mock");
        client
    }

    /// Client whose responses are handed over by the test, one gate per (term, page)
    #[derive(Default)]
    struct GatedClient {
        started: StdMutex<Option<mpsc::UnboundedSender<MovieQuery>>>,
        gates: StdMutex<HashMap<(String, u32), oneshot::Receiver<AppResult<PageResponse>>>>,
    }

    impl GatedClient {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MovieQuery>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let client = Self::default();
            *client.started.lock().unwrap() = Some(tx);
            (Arc::new(client), rx)
        }

        fn gate(&self, term: &str, page: u32) -> oneshot::Sender<AppResult<PageResponse>> {
            let (tx, rx) = oneshot::channel();
            self.gates
                .lock()
                .unwrap()
                .insert((term.to_string(), page), rx);
            tx
        }
    }

    #[async_trait::async_trait]
    impl MovieQueryClient for GatedClient {
        async fn fetch_page(&self, query: &MovieQuery) -> AppResult<PageResponse> {
            let gate = self
                .gates
                .lock()
                .unwrap()
                .remove(&(query.term.clone(), query.page))
                .expect("no gate registered for query");
            if let Some(started) = self.started.lock().unwrap().as_ref() {
                let _ = started.send(query.clone());
            }
            gate.await
                .unwrap_or_else(|_| Err(AppError::Internal("gate dropped".to_string())))
        }

        async fn movie_details(&self, movie_id: u64) -> AppResult<crate::models::MovieDetails> {
            Err(AppError::NotFound(movie_id.to_string()))
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    #[tokio::test]
    async fn test_first_search_page_loads_and_reports_trending() {
        let mut client = mock_client();
        client
            .expect_fetch_page()
            .withf(|q| q.term == "batman" && q.page == 1)
            .times(1)
            .returning(|_| page(vec![batman()], 5));

        let mut trending = MockTrendingStore::new();
        trending
            .expect_record_search()
            .withf(|term, movie| term == "batman" && *movie == batman())
            .times(1)
            .returning(|_, _| Ok(()));

        let controller = controller(client, trending);
        let outcome = controller.start_session("batman").await;

        assert_eq!(outcome, FetchOutcome::Loaded { count: 1 });
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.items, vec![batman()]);
        assert_eq!(snapshot.total_pages, Some(5));
        assert!(snapshot.has_more);
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.page, 1);
        assert_eq!(snapshot.mode, QueryMode::Search);
        assert_eq!(snapshot.error_message, None);
    }

    #[tokio::test]
    async fn test_empty_discover_exhausts_on_load_more() {
        let mut client = mock_client();
        client
            .expect_fetch_page()
            .withf(|q| q.mode() == QueryMode::Discover && q.page == 1)
            .times(1)
            .returning(|_| page(vec![], 0));

        // Discover results are never reported as trending.
        let controller = controller(client, MockTrendingStore::new());

        assert_eq!(
            controller.start_session("").await,
            FetchOutcome::Loaded { count: 0 }
        );
        assert!(controller.snapshot().await.items.is_empty());

        assert_eq!(controller.load_more().await, LoadMore::Exhausted);
        let snapshot = controller.snapshot().await;
        assert!(!snapshot.has_more);
        assert_eq!(snapshot.page, 1);

        // Terminal for the session: still no fetch.
        assert_eq!(controller.load_more().await, LoadMore::Exhausted);
    }

    #[tokio::test]
    async fn test_load_more_past_total_pages_issues_no_fetch() {
        let mut client = mock_client();
        client
            .expect_fetch_page()
            .times(1)
            .returning(|_| page(vec![batman()], 1));

        let controller = controller(client, quiet_trending());
        controller.start_session("batman").await;

        assert_eq!(controller.load_more().await, LoadMore::Exhausted);
        assert!(!controller.snapshot().await.has_more);
    }

    #[tokio::test]
    async fn test_pages_append_in_order_without_dedup() {
        let mut client = mock_client();
        client
            .expect_fetch_page()
            .withf(|q| q.page == 1)
            .times(1)
            .returning(|_| page(vec![Movie::new(1, "A"), Movie::new(2, "B")], 3));
        client
            .expect_fetch_page()
            .withf(|q| q.page == 2)
            .times(1)
            .returning(|_| page(vec![Movie::new(2, "B"), Movie::new(3, "C")], 3));

        let controller = controller(client, quiet_trending());
        controller.start_session("abc").await;

        assert_eq!(
            controller.load_more().await,
            LoadMore::Fetched {
                page: 2,
                outcome: FetchOutcome::Loaded { count: 2 }
            }
        );

        let snapshot = controller.snapshot().await;
        let ids: Vec<u64> = snapshot.items.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 2, 3]);
        assert_eq!(snapshot.page, 2);
        assert!(snapshot.has_more);
    }

    #[tokio::test]
    async fn test_transport_failure_clears_items_on_first_page() {
        let mut client = mock_client();
        client
            .expect_fetch_page()
            .withf(|q| q.term == "good")
            .returning(|_| page(vec![batman()], 5));
        client
            .expect_fetch_page()
            .withf(|q| q.term == "bad")
            .returning(|_| Err(AppError::ExternalApi("TMDB returned status 500".to_string())));

        let controller = controller(client, quiet_trending());
        controller.start_session("good").await;

        assert_eq!(controller.start_session("bad").await, FetchOutcome::Failed);
        let snapshot = controller.snapshot().await;
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.error_message.as_deref(), Some(FETCH_MOVIES_FAILED));
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_items_when_appending() {
        let mut client = mock_client();
        client
            .expect_fetch_page()
            .withf(|q| q.page == 1)
            .returning(|_| page(vec![batman()], 5));
        client
            .expect_fetch_page()
            .withf(|q| q.page == 2)
            .returning(|_| Err(AppError::ExternalApi("TMDB returned status 500".to_string())));

        let controller = controller(client, quiet_trending());
        controller.start_session("batman").await;

        assert_eq!(
            controller.load_more().await,
            LoadMore::Fetched {
                page: 2,
                outcome: FetchOutcome::Failed
            }
        );
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.items, vec![batman()]);
        assert_eq!(snapshot.error_message.as_deref(), Some(FETCH_MOVIES_FAILED));
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_domain_failure_uses_payload_message_or_fallback() {
        let mut client = mock_client();
        client
            .expect_fetch_page()
            .withf(|q| q.term == "zzz")
            .returning(|_| {
                Ok(PageResponse::Rejected {
                    message: Some("Movie not found!".to_string()),
                })
            });
        client
            .expect_fetch_page()
            .withf(|q| q.term == "yyy")
            .returning(|_| Ok(PageResponse::Rejected { message: None }));

        let controller = controller(client, MockTrendingStore::new());

        assert_eq!(controller.start_session("zzz").await, FetchOutcome::Rejected);
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.error_message.as_deref(), Some("Movie not found!"));
        assert!(snapshot.items.is_empty());

        controller.start_session("yyy").await;
        assert_eq!(
            controller.snapshot().await.error_message.as_deref(),
            Some(FETCH_MOVIES_FALLBACK)
        );
    }

    #[tokio::test]
    async fn test_new_session_clears_previous_error() {
        let mut client = mock_client();
        client
            .expect_fetch_page()
            .withf(|q| q.term == "bad")
            .returning(|_| Err(AppError::ExternalApi("down".to_string())));
        client
            .expect_fetch_page()
            .withf(|q| q.term == "good")
            .returning(|_| page(vec![batman()], 1));

        let controller = controller(client, quiet_trending());
        controller.start_session("bad").await;
        controller.start_session("good").await;

        assert_eq!(controller.snapshot().await.error_message, None);
    }

    #[tokio::test]
    async fn test_trending_record_failure_is_ignored() {
        let mut client = mock_client();
        client
            .expect_fetch_page()
            .returning(|_| page(vec![batman()], 2));

        let mut trending = MockTrendingStore::new();
        trending
            .expect_record_search()
            .times(1)
            .returning(|_, _| Err(AppError::Internal("store down".to_string())));

        let controller = controller(client, trending);
        assert_eq!(
            controller.start_session("batman").await,
            FetchOutcome::Loaded { count: 1 }
        );

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.error_message, None);
    }

    #[tokio::test]
    async fn test_trending_not_recorded_for_later_pages_or_empty_results() {
        let mut client = mock_client();
        client
            .expect_fetch_page()
            .withf(|q| q.term == "none")
            .returning(|_| page(vec![], 0));
        client
            .expect_fetch_page()
            .withf(|q| q.term == "many" && q.page == 1)
            .returning(|_| page(vec![Movie::new(1, "A")], 3));
        client
            .expect_fetch_page()
            .withf(|q| q.term == "many" && q.page == 2)
            .returning(|_| page(vec![Movie::new(2, "B")], 3));

        let mut trending = MockTrendingStore::new();
        trending
            .expect_record_search()
            .withf(|term, movie| term == "many" && movie.id == 1)
            .times(1)
            .returning(|_, _| Ok(()));

        let controller = controller(client, trending);
        assert_eq!(
            controller.start_session("none").await,
            FetchOutcome::Loaded { count: 0 }
        );
        assert_eq!(
            controller.start_session("many").await,
            FetchOutcome::Loaded { count: 1 }
        );
        assert_eq!(
            controller.load_more().await,
            LoadMore::Fetched {
                page: 2,
                outcome: FetchOutcome::Loaded { count: 1 }
            }
        );
    }

    #[tokio::test]
    async fn test_load_trending_success_and_failure() {
        let mut ok_store = MockTrendingStore::new();
        ok_store.expect_top_searches().times(1).returning(|| {
            Ok(vec![TrendingMovie {
                id: "batman".to_string(),
                title: "The Batman".to_string(),
                movie_id: 414906,
                poster_url: None,
                count: 3,
            }])
        });
        let ok = controller(mock_client(), ok_store);
        assert_eq!(ok.load_trending().await.len(), 1);
        assert_eq!(ok.trending().await.movies[0].movie_id, 414906);

        let mut failing_store = MockTrendingStore::new();
        failing_store
            .expect_top_searches()
            .times(1)
            .returning(|| Err(AppError::Internal("redis down".to_string())));
        let failing = controller(mock_client(), failing_store);

        assert!(failing.load_trending().await.is_empty());
        let trending = failing.trending().await;
        assert!(trending.movies.is_empty());
        assert_eq!(trending.error_message.as_deref(), Some(FETCH_TRENDING_FAILED));
        assert_eq!(
            failing.snapshot().await.error_message.as_deref(),
            Some(FETCH_TRENDING_FAILED)
        );
    }

    #[tokio::test]
    async fn test_initial_load_keeps_trending_error_visible() {
        let mut client = mock_client();
        client
            .expect_fetch_page()
            .withf(|q| q.term.is_empty() && q.page == 1)
            .times(1)
            .returning(|_| page(vec![Movie::new(10, "Dune")], 3));
        let mut trending = MockTrendingStore::new();
        trending
            .expect_top_searches()
            .times(1)
            .returning(|| Err(AppError::Internal("redis down".to_string())));

        let controller = controller(client, trending);
        assert_eq!(
            controller.initial_load().await,
            FetchOutcome::Loaded { count: 1 }
        );

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.mode, QueryMode::Discover);
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.error_message.as_deref(), Some(FETCH_TRENDING_FAILED));
        assert_eq!(
            controller.trending().await.error_message.as_deref(),
            Some(FETCH_TRENDING_FAILED)
        );
    }

    #[tokio::test]
    async fn test_new_session_resets_before_first_response() {
        let (client, mut started) = GatedClient::new();
        let controller = SearchController::new(client.clone(), Arc::new(quiet_trending()));

        let first = client.gate("one", 1);
        let second = client.gate("one", 2);
        let fresh = client.gate("two", 1);

        let c = controller.clone();
        let task = tokio::spawn(async move { c.start_session("one").await });
        started.recv().await.unwrap();
        first
            .send(page(vec![Movie::new(1, "A")], 4))
            .unwrap();
        task.await.unwrap();

        let c = controller.clone();
        let task = tokio::spawn(async move { c.load_more().await });
        started.recv().await.unwrap();
        second.send(page(vec![Movie::new(2, "B")], 4)).unwrap();
        task.await.unwrap();
        assert_eq!(controller.snapshot().await.page, 2);

        let c = controller.clone();
        let task = tokio::spawn(async move { c.start_session("two").await });
        started.recv().await.unwrap();

        let pending = controller.snapshot().await;
        assert_eq!(pending.effective_term, "two");
        assert_eq!(pending.page, 1);
        assert!(pending.items.is_empty());
        assert_eq!(pending.total_pages, None);
        assert!(pending.has_more);
        assert!(pending.is_loading);

        fresh.send(page(vec![Movie::new(9, "Z")], 1)).unwrap();
        task.await.unwrap();
        assert_eq!(controller.snapshot().await.items, vec![Movie::new(9, "Z")]);
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let (client, mut started) = GatedClient::new();
        let controller = SearchController::new(client.clone(), Arc::new(quiet_trending()));

        let old_gate = client.gate("old", 1);
        let new_gate = client.gate("new", 1);

        let c = controller.clone();
        let old = tokio::spawn(async move { c.start_session("old").await });
        assert_eq!(started.recv().await.unwrap().term, "old");

        let c = controller.clone();
        let new = tokio::spawn(async move { c.start_session("new").await });
        assert_eq!(started.recv().await.unwrap().term, "new");

        new_gate.send(page(vec![Movie::new(2, "New")], 1)).unwrap();
        assert_eq!(new.await.unwrap(), FetchOutcome::Loaded { count: 1 });

        old_gate
            .send(page(vec![Movie::new(1, "Old")], 9))
            .unwrap();
        assert_eq!(old.await.unwrap(), FetchOutcome::Stale);

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.effective_term, "new");
        assert_eq!(snapshot.items, vec![Movie::new(2, "New")]);
        assert_eq!(snapshot.total_pages, Some(1));
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_load_more_rejected_while_loading() {
        let (client, mut started) = GatedClient::new();
        let controller = SearchController::new(client.clone(), Arc::new(quiet_trending()));

        let first = client.gate("q", 1);
        let c = controller.clone();
        let task = tokio::spawn(async move { c.start_session("q").await });
        started.recv().await.unwrap();
        first.send(page(vec![Movie::new(1, "A")], 3)).unwrap();
        task.await.unwrap();

        let second = client.gate("q", 2);
        let c = controller.clone();
        let in_flight = tokio::spawn(async move { c.load_more().await });
        started.recv().await.unwrap();

        // The gated client panics on an unregistered page 3, so Busy also
        // proves no second fetch was issued.
        assert_eq!(controller.load_more().await, LoadMore::Busy);

        second.send(page(vec![Movie::new(2, "B")], 3)).unwrap();
        assert!(matches!(
            in_flight.await.unwrap(),
            LoadMore::Fetched { page: 2, .. }
        ));
        assert_eq!(controller.snapshot().await.items.len(), 2);
    }

    #[tokio::test]
    async fn test_loading_cleared_when_caller_is_dropped() {
        let (client, mut started) = GatedClient::new();
        let controller = SearchController::new(client.clone(), Arc::new(quiet_trending()));

        let gate = client.gate("q", 1);
        let c = controller.clone();
        let caller = tokio::spawn(async move { c.start_session("q").await });
        started.recv().await.unwrap();
        caller.abort();
        let _ = caller.await;

        gate.send(page(vec![Movie::new(1, "A")], 1)).unwrap();

        let mut snapshot = controller.snapshot().await;
        for _ in 0..100 {
            if !snapshot.is_loading {
                break;
            }
            tokio::task::yield_now().await;
            snapshot = controller.snapshot().await;
        }
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.items.len(), 1);
    }

    #[test]
    fn test_apply_keeps_items_on_rejected_append() {
        let mut state = SessionState::new();
        state.items = vec![Movie::new(1, "A")];

        let (outcome, top) = state.apply(
            Ok(PageResponse::Rejected { message: None }),
            &MovieQuery::new("a", 2),
            true,
        );

        assert_eq!(outcome, FetchOutcome::Rejected);
        assert!(top.is_none());
        assert_eq!(state.items.len(), 1);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(LoadMore::Fetched {
            page: 2,
            outcome: FetchOutcome::Loaded { count: 20 },
        })
        .unwrap();
        assert_eq!(json["status"], "fetched");
        assert_eq!(json["outcome"]["status"], "loaded");
        assert_eq!(json["outcome"]["count"], 20);

        assert_eq!(
            serde_json::to_value(LoadMore::Busy).unwrap()["status"],
            "busy"
        );
    }
}
