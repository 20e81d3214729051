use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use movie_finder::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, Cache},
    services::{
        spawn_session_driver, Debouncer, DetailsService, MovieQueryClient, RedisTrendingStore,
        SearchController, TmdbProvider, TrendingStore,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "movie_finder=info,tower_http=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_writer) = Cache::new(redis_client);

    let provider: Arc<dyn MovieQueryClient> = Arc::new(TmdbProvider::new(
        cache.clone(),
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
    ));
    let trending_store: Arc<dyn TrendingStore> = Arc::new(RedisTrendingStore::new(
        cache,
        config.tmdb_image_url.clone(),
        config.trending_limit,
    ));

    let controller = SearchController::new(provider.clone(), trending_store);
    let (search_input, effective_terms) = Debouncer::spawn(config.search_debounce());
    let _driver = spawn_session_driver(controller.clone(), effective_terms);

    controller.initial_load().await;

    let details = DetailsService::new(provider, config.tmdb_image_url.clone());
    let app = create_router(AppState::new(controller, search_input, details));

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    cache_writer.shutdown().await;
    Ok(())
}
