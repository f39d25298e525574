//! External video search abstraction
//!
//! The candidate provider only needs "give me up to N videos for this genre".
//! Each implementation wraps one upstream catalog API behind that call.

use crate::{error::AppResult, models::SearchHit};

pub mod youtube;

pub use youtube::YouTubeSearcher;

/// Trait for external content search collaborators
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContentSearcher: Send + Sync {
    /// Search for up to `max_results` videos matching a genre
    ///
    /// Results carry a title and a canonical watch URL; ids are assigned when
    /// they are persisted.
    async fn search(&self, genre: &str, max_results: u32) -> AppResult<Vec<SearchHit>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
