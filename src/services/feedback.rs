use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    db::RecommenderStore,
    error::{AppError, AppResult},
    models::{ContentId, NewInteraction, Reward, UserId},
    services::scoring::{Policy, DEFAULT_EPSILON},
};

/// Acknowledgment of a recorded reward
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeedbackAck {
    pub event_id: i64,
    pub recorded_at: DateTime<Utc>,
}

/// The only path through which rewards enter the system
///
/// Each call appends exactly one event. Calls are not deduplicated: a repeated
/// submission counts as further evidence when the trainer next runs. The
/// content must belong to the genre the feedback is filed under, otherwise the
/// trainer would build statistics for an arm that genre never offers.
pub struct FeedbackRecorder {
    store: Arc<dyn RecommenderStore>,
}

impl FeedbackRecorder {
    pub fn new(store: Arc<dyn RecommenderStore>) -> Self {
        Self { store }
    }

    pub async fn record_feedback(
        &self,
        user_id: UserId,
        content_id: ContentId,
        genre: &str,
        policy_name: &str,
        reward: i64,
    ) -> AppResult<FeedbackAck> {
        let reward = Reward::try_from(reward)?;
        // Epsilon does not matter here, only the canonical name is stored
        let policy = Policy::from_name(policy_name, DEFAULT_EPSILON)?;
        if genre.trim().is_empty() {
            return Err(AppError::InvalidInput("Genre cannot be empty".to_string()));
        }

        let event = self
            .store
            .append_event(NewInteraction {
                user_id,
                content_id,
                genre: genre.to_string(),
                policy: policy.name().to_string(),
                reward,
                recorded_at: Utc::now(),
            })
            .await?;

        tracing::info!(
            event_id = event.id,
            user_id,
            content_id,
            genre = %genre,
            policy = %policy,
            reward = reward.as_i64(),
            "Feedback recorded"
        );

        Ok(FeedbackAck {
            event_id: event.id,
            recorded_at: event.recorded_at,
        })
    }
}
