pub mod bandit_stat;
pub mod content;
pub mod interaction;

pub use bandit_stat::{
    AggregateScan, BanditStat, EventAggregate, TripleKey, PRIOR_ALPHA, PRIOR_BETA,
};
pub use content::{ContentId, ContentItem, SearchHit};
pub use interaction::{InteractionEvent, NewInteraction, Reward};

/// Identifier of an authenticated user, resolved by the identity service
pub type UserId = i64;
