pub mod candidates;
pub mod feedback;
pub mod providers;
pub mod recommendations;
pub mod scoring;
pub mod trainer;

pub use candidates::CandidateProvider;
pub use feedback::{FeedbackAck, FeedbackRecorder};
pub use providers::{ContentSearcher, YouTubeSearcher};
pub use recommendations::{Recommendation, RecommendationEngine};
pub use scoring::{Policy, RandomSource};
pub use trainer::{spawn_periodic, TrainReport, Trainer, TrainerHandle};
