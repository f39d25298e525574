use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContentId, UserId};

/// A binary reward observed for a recommended item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Reward {
    Negative,
    Positive,
}

impl Reward {
    pub fn as_i64(self) -> i64 {
        match self {
            Reward::Negative => 0,
            Reward::Positive => 1,
        }
    }
}

impl TryFrom<i64> for Reward {
    type Error = crate::error::AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Reward::Negative),
            1 => Ok(Reward::Positive),
            other => Err(crate::error::AppError::InvalidReward(other)),
        }
    }
}

impl From<Reward> for i64 {
    fn from(reward: Reward) -> Self {
        reward.as_i64()
    }
}

/// An event about to be appended to the interaction log
#[derive(Debug, Clone, PartialEq)]
pub struct NewInteraction {
    pub user_id: UserId,
    pub content_id: ContentId,
    pub genre: String,
    pub policy: String,
    pub reward: Reward,
    pub recorded_at: DateTime<Utc>,
}

/// An appended, immutable interaction event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionEvent {
    pub id: i64,
    pub user_id: UserId,
    pub content_id: ContentId,
    pub genre: String,
    pub policy: String,
    pub reward: Reward,
    pub recorded_at: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn from_new(id: i64, event: NewInteraction) -> Self {
        Self {
            id,
            user_id: event.user_id,
            content_id: event.content_id,
            genre: event.genre,
            policy: event.policy,
            reward: event.reward,
            recorded_at: event.recorded_at,
        }
    }
}
