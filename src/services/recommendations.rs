use std::collections::HashMap;
use std::sync::Arc;

use rand::RngCore;

use crate::{
    db::RecommenderStore,
    error::{AppError, AppResult},
    models::{BanditStat, ContentId, ContentItem, UserId, PRIOR_ALPHA, PRIOR_BETA},
    services::{
        candidates::CandidateProvider,
        scoring::{Policy, RandomSource, DEFAULT_EPSILON},
    },
};

/// The arm chosen for a request
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub content: ContentItem,
    pub score: f64,
    pub policy: Policy,
}

/// Picks one video per request from a genre's candidate pool
///
/// Reads bandit statistics but never writes them, and never records rewards.
pub struct RecommendationEngine {
    candidates: CandidateProvider,
    store: Arc<dyn RecommenderStore>,
    epsilon: f64,
    random: RandomSource,
}

impl RecommendationEngine {
    pub fn new(candidates: CandidateProvider, store: Arc<dyn RecommenderStore>) -> Self {
        Self {
            candidates,
            store,
            epsilon: DEFAULT_EPSILON,
            random: RandomSource::default(),
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_random_source(mut self, random: RandomSource) -> Self {
        self.random = random;
        self
    }

    /// Resolves a policy name with this engine's exploration settings
    pub fn policy(&self, name: &str) -> AppResult<Policy> {
        Policy::from_name(name, self.epsilon)
    }

    pub async fn recommend(
        &self,
        user_id: UserId,
        genre: &str,
        policy_name: &str,
    ) -> AppResult<Recommendation> {
        let policy = self.policy(policy_name)?;

        let candidates = self.candidates.get_candidates(genre).await?;
        let stats = self.store.stats_for(user_id, genre).await?;

        let recommendation = self
            .random
            .with_rng(|rng| select_arm(policy, candidates, &stats, rng))?;

        tracing::info!(
            user_id,
            genre = %genre,
            policy = %policy,
            content_id = recommendation.content.id,
            score = recommendation.score,
            known_arms = stats.len(),
            "Recommendation selected"
        );

        Ok(recommendation)
    }
}

/// Scores every candidate and returns the highest-scoring one.
///
/// Candidates without statistics use the Beta(1, 1) prior. Ties keep the
/// earliest candidate.
pub fn select_arm(
    policy: Policy,
    candidates: Vec<ContentItem>,
    stats: &HashMap<ContentId, BanditStat>,
    rng: &mut dyn RngCore,
) -> AppResult<Recommendation> {
    let mut best: Option<(ContentItem, f64)> = None;

    for candidate in candidates {
        let (alpha, beta) = stats
            .get(&candidate.id)
            .map(|stat| (stat.alpha, stat.beta))
            .unwrap_or((PRIOR_ALPHA, PRIOR_BETA));

        let score = policy.score(alpha as f64, beta as f64, &mut *rng);

        tracing::trace!(content_id = candidate.id, alpha, beta, score, "Scored arm");

        let improves = best
            .as_ref()
            .map_or(true, |(_, best_score)| score > *best_score);
        if improves {
            best = Some((candidate, score));
        }
    }

    let (content, score) = best.ok_or_else(|| {
        AppError::Internal("Cannot select from an empty candidate pool".to_string())
    })?;

    Ok(Recommendation {
        content,
        score,
        policy,
    })
}
