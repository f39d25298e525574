use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{
    db::RecommenderStore,
    error::{AppError, AppResult},
    models::BanditStat,
};

/// Outcome of one training pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrainReport {
    /// Triples whose statistics were written
    pub updated: usize,
    /// Aggregate rows left untouched because decoding, validation or the
    /// upsert failed
    pub skipped: usize,
    /// Triples already holding a row derived from more events, written by an
    /// overlapping pass
    pub superseded: usize,
}

/// Rebuilds bandit statistics from the full interaction log
///
/// Every pass recomputes each triple from scratch, so running it again over an
/// unchanged log writes the same alpha/beta values.
#[derive(Clone)]
pub struct Trainer {
    store: Arc<dyn RecommenderStore>,
}

impl Trainer {
    pub fn new(store: Arc<dyn RecommenderStore>) -> Self {
        Self { store }
    }

    pub async fn retrain(&self) -> AppResult<TrainReport> {
        let start = Instant::now();
        let scan = self.store.aggregate_events().await?;
        let trained_at = Utc::now();
        let mut report = TrainReport {
            skipped: scan.undecodable,
            ..TrainReport::default()
        };

        for aggregate in &scan.aggregates {
            let stat = match BanditStat::from_aggregate(aggregate, trained_at) {
                Ok(stat) => stat,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed aggregate");
                    report.skipped += 1;
                    continue;
                }
            };

            match self.store.upsert_stat(&stat).await {
                Ok(true) => report.updated += 1,
                Ok(false) => {
                    tracing::debug!(
                        user_id = stat.user_id,
                        genre = %stat.genre,
                        content_id = stat.content_id,
                        "Stored stat is newer, keeping it"
                    );
                    report.superseded += 1;
                }
                Err(e @ AppError::StoreUnavailable(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        user_id = stat.user_id,
                        genre = %stat.genre,
                        content_id = stat.content_id,
                        error = %e,
                        "Failed to upsert bandit stat"
                    );
                    report.skipped += 1;
                }
            }
        }

        tracing::info!(
            store = self.store.name(),
            triples = scan.aggregates.len(),
            updated = report.updated,
            skipped = report.skipped,
            superseded = report.superseded,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Bandit statistics retrained"
        );

        Ok(report)
    }
}

/// Handle for stopping the periodic trainer
pub struct TrainerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl TrainerHandle {
    /// Signals the trainer task to stop and waits for an in-flight pass to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Trainer task join error");
        }
        tracing::info!("Trainer task stopped");
    }
}

/// Spawns a background task that retrains every `interval`
///
/// The first pass runs immediately. A failed pass is logged and retried on the
/// next tick.
pub fn spawn_periodic(trainer: Trainer, interval: Duration) -> TrainerHandle {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

    let task = tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "Trainer task started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = trainer.retrain().await {
                        tracing::error!(error = %e, "Training pass failed");
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    });

    TrainerHandle { shutdown_tx, task }
}
