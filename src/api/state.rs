use std::sync::Arc;

use crate::config::Config;
use crate::db::RecommenderStore;
use crate::services::{
    CandidateProvider, ContentSearcher, FeedbackRecorder, RandomSource, RecommendationEngine,
    Trainer,
};

/// Shared application state
///
/// Holds only shared service handles; no per-user or per-request state lives
/// here between calls.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub feedback: Arc<FeedbackRecorder>,
    pub trainer: Trainer,
}

impl AppState {
    /// Wires the services over a store and a content searcher with default tuning
    pub fn new(store: Arc<dyn RecommenderStore>, searcher: Arc<dyn ContentSearcher>) -> Self {
        let candidates = CandidateProvider::new(store.clone(), searcher);
        Self::from_parts(
            RecommendationEngine::new(candidates, store.clone()),
            store,
        )
    }

    /// Wires the services with the tuning from configuration
    pub fn from_config(
        config: &Config,
        store: Arc<dyn RecommenderStore>,
        searcher: Arc<dyn ContentSearcher>,
    ) -> Self {
        let candidates = CandidateProvider::new(store.clone(), searcher)
            .with_pool_size(config.candidate_pool_size)
            .with_fetch_timeout(config.content_fetch_timeout());

        let engine = RecommendationEngine::new(candidates, store.clone())
            .with_epsilon(config.epsilon)
            .with_random_source(RandomSource::from_seed(config.rng_seed));

        Self::from_parts(engine, store)
    }

    pub fn from_parts(engine: RecommendationEngine, store: Arc<dyn RecommenderStore>) -> Self {
        Self {
            engine: Arc::new(engine),
            feedback: Arc::new(FeedbackRecorder::new(store.clone())),
            trainer: Trainer::new(store),
        }
    }
}
