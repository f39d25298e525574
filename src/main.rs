use std::sync::Arc;

use anyhow::Context;

use reel_bandit::{
    api::{create_router, AppState},
    config::{Config, StoreBackend},
    db::{
        create_pool, create_redis_client, run_migrations, Cache, MemoryStore, PgStore,
        RecommenderStore,
    },
    logging,
    services::{spawn_periodic, YouTubeSearcher},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let config = Config::from_env()?;

    let store: Arc<dyn RecommenderStore> = match config.backend()? {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database_url)
                .await
                .context("Failed to connect to Postgres")?;
            run_migrations(&pool).await.context("Failed to run migrations")?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, all data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let mut searcher =
        YouTubeSearcher::new(config.youtube_api_key.clone(), config.youtube_api_url.clone());
    let mut cache_writer = None;
    if let Some(redis_url) = &config.redis_url {
        let client = create_redis_client(redis_url)?;
        match Cache::connect(client).await {
            Ok((cache, handle)) => {
                searcher = searcher.with_cache(cache, config.search_cache_ttl_secs);
                cache_writer = Some(handle);
                tracing::info!("Search response cache enabled");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unreachable, running without search cache")
            }
        }
    }

    let state = AppState::from_config(&config, store.clone(), Arc::new(searcher));
    let trainer = spawn_periodic(state.trainer.clone(), config.train_interval());

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        address = %addr,
        store = store.name(),
        epsilon = config.epsilon,
        train_interval_secs = config.train_interval_secs,
        "Server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    trainer.shutdown().await;
    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
