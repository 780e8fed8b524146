//! Probabilistic outcome resolution
//!
//! The engine never draws randomness itself; it asks an injected resolver,
//! so a fixed seed (or a stub) replays a run exactly.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Decides whether a chance-based interaction happens
pub trait OutcomeResolver {
    /// `probability <= 0` never succeeds, `probability >= 1` always does
    fn succeeds(&mut self, probability: f32) -> bool;
}

impl<R: OutcomeResolver + ?Sized> OutcomeResolver for Box<R> {
    fn succeeds(&mut self, probability: f32) -> bool {
        (**self).succeeds(probability)
    }
}

/// Uniform draws from a seeded generator
#[derive(Debug, Clone)]
pub struct RngResolver<G = Pcg32> {
    rng: G,
}

impl RngResolver<Pcg32> {
    /// Reproducible resolver for a run seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl<G: Rng> RngResolver<G> {
    pub fn from_rng(rng: G) -> Self {
        Self { rng }
    }
}

impl<G: Rng> OutcomeResolver for RngResolver<G> {
    fn succeeds(&mut self, probability: f32) -> bool {
        if probability.is_nan() || probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.rng.random::<f32>() < probability
    }
}

/// Stub that always gives the same answer, whatever the probability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedOutcome(pub bool);

impl OutcomeResolver for FixedOutcome {
    fn succeeds(&mut self, _probability: f32) -> bool {
        self.0
    }
}
