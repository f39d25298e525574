use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContentId, UserId};
use crate::error::{AppError, AppResult};

/// Uniform Beta(1, 1) prior used for any triple without training data
pub const PRIOR_ALPHA: i64 = 1;
pub const PRIOR_BETA: i64 = 1;

/// Key of one bandit statistics row: (user, genre, content)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TripleKey {
    pub user_id: UserId,
    pub genre: String,
    pub content_id: ContentId,
}

impl TripleKey {
    pub fn new(user_id: UserId, genre: impl Into<String>, content_id: ContentId) -> Self {
        Self {
            user_id,
            genre: genre.into(),
            content_id,
        }
    }
}

/// Posterior Beta parameters for one triple, derived from the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BanditStat {
    pub user_id: UserId,
    pub genre: String,
    pub content_id: ContentId,
    pub alpha: i64,
    pub beta: i64,
    pub last_trained_at: DateTime<Utc>,
}

impl BanditStat {
    pub fn key(&self) -> TripleKey {
        TripleKey::new(self.user_id, self.genre.clone(), self.content_id)
    }

    /// Number of events this row was derived from
    ///
    /// The event log only grows, so a row built from more events is never
    /// older than one built from fewer.
    pub fn observations(&self) -> i64 {
        self.alpha + self.beta - PRIOR_ALPHA - PRIOR_BETA
    }

    /// Derives `alpha = successes + 1` and `beta = failures + 1` from an aggregate.
    ///
    /// Rejects aggregates whose counts cannot come from a well-formed event log.
    pub fn from_aggregate(
        aggregate: &EventAggregate,
        trained_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let EventAggregate {
            key,
            total,
            successes,
        } = aggregate;

        if *total <= 0 || *successes < 0 || successes > total {
            return Err(AppError::InvalidInput(format!(
                "malformed aggregate for user {} genre '{}' content {}: total={} successes={}",
                key.user_id, key.genre, key.content_id, total, successes
            )));
        }

        let failures = total - successes;

        Ok(Self {
            user_id: key.user_id,
            genre: key.genre.clone(),
            content_id: key.content_id,
            alpha: successes + PRIOR_ALPHA,
            beta: failures + PRIOR_BETA,
            last_trained_at: trained_at,
        })
    }
}

/// Event counts grouped by triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAggregate {
    pub key: TripleKey,
    pub total: i64,
    pub successes: i64,
}

/// Result of grouping the event log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateScan {
    pub aggregates: Vec<EventAggregate>,
    /// Grouped rows the store could not decode
    pub undecodable: usize,
}

impl From<Vec<EventAggregate>> for AggregateScan {
    fn from(aggregates: Vec<EventAggregate>) -> Self {
        Self {
            aggregates,
            undecodable: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate(total: i64, successes: i64) -> EventAggregate {
        EventAggregate {
            key: TripleKey::new(7, "Tech", 3),
            total,
            successes,
        }
    }

    #[test]
    fn test_from_aggregate_adds_prior() {
        let stat = BanditStat::from_aggregate(&aggregate(5, 2), Utc::now()).unwrap();
        assert_eq!(stat.alpha, 3);
        assert_eq!(stat.beta, 4);
        assert_eq!(stat.observations(), 5);
        assert_eq!(stat.key(), TripleKey::new(7, "Tech", 3));
    }

    #[test]
    fn test_from_aggregate_all_successes() {
        let stat = BanditStat::from_aggregate(&aggregate(2, 2), Utc::now()).unwrap();
        assert_eq!((stat.alpha, stat.beta), (3, 1));
    }

    #[test]
    fn test_from_aggregate_rejects_malformed_counts() {
        assert!(BanditStat::from_aggregate(&aggregate(0, 0), Utc::now()).is_err());
        assert!(BanditStat::from_aggregate(&aggregate(2, 3), Utc::now()).is_err());
        assert!(BanditStat::from_aggregate(&aggregate(2, -1), Utc::now()).is_err());
    }
}
