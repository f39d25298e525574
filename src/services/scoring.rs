//! Exploration policies for the bandit.
//!
//! Each arm carries a Beta(alpha, beta) belief about its success rate. A
//! policy turns that belief into a score; the engine picks the arm with the
//! highest score.

use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};

use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
use rand_distr::{Beta, Distribution};

use crate::error::{AppError, AppResult};

/// Exploration probability used when none is configured
pub const DEFAULT_EPSILON: f64 = 0.2;

/// A scoring policy selectable by name per request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Policy {
    /// Sample once from the posterior
    Thompson,
    /// Uniform score with probability `epsilon`, posterior mean otherwise
    EpsilonGreedy { epsilon: f64 },
}

impl Policy {
    /// Resolves a wire policy name.
    ///
    /// Accepts `thompson` and `epsilon` (or `epsilon_greedy`), case-insensitive.
    pub fn from_name(name: &str, epsilon: f64) -> AppResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "thompson" => Ok(Policy::Thompson),
            "epsilon" | "epsilon_greedy" | "epsilon-greedy" => {
                Ok(Policy::EpsilonGreedy { epsilon })
            }
            _ => Err(AppError::UnknownPolicy(name.to_string())),
        }
    }

    /// Canonical name, as stored with interaction events
    pub fn name(&self) -> &'static str {
        match self {
            Policy::Thompson => "thompson",
            Policy::EpsilonGreedy { .. } => "epsilon",
        }
    }

    pub fn score<R: Rng + ?Sized>(&self, alpha: f64, beta: f64, rng: &mut R) -> f64 {
        match self {
            Policy::Thompson => thompson_sample(alpha, beta, rng),
            Policy::EpsilonGreedy { epsilon } => epsilon_greedy(alpha, beta, *epsilon, rng),
        }
    }
}

impl Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Mean of Beta(alpha, beta)
pub fn posterior_mean(alpha: f64, beta: f64) -> f64 {
    alpha / (alpha + beta)
}

/// One draw from Beta(alpha, beta)
///
/// Falls back to the posterior mean for parameters the distribution rejects,
/// which stored statistics (alpha, beta >= 1) never produce.
pub fn thompson_sample<R: Rng + ?Sized>(alpha: f64, beta: f64, rng: &mut R) -> f64 {
    match Beta::new(alpha, beta) {
        Ok(dist) => dist.sample(rng),
        Err(e) => {
            tracing::warn!(alpha, beta, error = %e, "Invalid Beta parameters, using mean");
            posterior_mean(alpha, beta)
        }
    }
}

pub fn epsilon_greedy<R: Rng + ?Sized>(alpha: f64, beta: f64, epsilon: f64, rng: &mut R) -> f64 {
    if rng.gen::<f64>() < epsilon {
        rng.gen::<f64>()
    } else {
        posterior_mean(alpha, beta)
    }
}

/// Source of randomness for policy sampling
///
/// Production uses the thread-local RNG. A seeded source makes every draw
/// reproducible across runs, which tests and offline replays rely on.
#[derive(Clone, Default)]
pub enum RandomSource {
    #[default]
    Thread,
    Seeded(Arc<Mutex<StdRng>>),
}

impl RandomSource {
    pub fn seeded(seed: u64) -> Self {
        RandomSource::Seeded(Arc::new(Mutex::new(StdRng::seed_from_u64(seed))))
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_default()
    }

    /// Runs `f` with exclusive access to the generator
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut dyn RngCore) -> T) -> T {
        match self {
            RandomSource::Thread => f(&mut rand::thread_rng()),
            RandomSource::Seeded(rng) => {
                let mut guard = rng.lock().unwrap_or_else(PoisonError::into_inner);
                f(&mut *guard)
            }
        }
    }
}

impl std::fmt::Debug for RandomSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RandomSource::Thread => write!(f, "RandomSource::Thread"),
            RandomSource::Seeded(_) => write!(f, "RandomSource::Seeded"),
        }
    }
}
