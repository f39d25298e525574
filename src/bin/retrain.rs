//! Runs a single training pass against Postgres and exits.
//!
//! The server retrains on its own schedule; this binary is for cron jobs and
//! for rebuilding `user_models` by hand after dropping it.

use std::sync::Arc;

use anyhow::Context;

use reel_bandit::{
    config::TrainerConfig,
    db::{create_pool, run_migrations, PgStore},
    logging,
    services::Trainer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let config = TrainerConfig::from_env()?;
    let pool = create_pool(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;
    run_migrations(&pool).await.context("Failed to run migrations")?;

    let report = Trainer::new(Arc::new(PgStore::new(pool.clone())))
        .retrain()
        .await
        .context("Training pass failed")?;

    pool.close().await;

    println!(
        "Bandit statistics updated: {} triples ({} skipped, {} superseded)",
        report.updated, report.skipped, report.superseded
    );

    Ok(())
}
