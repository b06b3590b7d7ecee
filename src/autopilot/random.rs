//! Randomness used by the stuck-recovery maneuver.

use rand::Rng;

use crate::control::Movement;

/// Source of the random choices the decision engine makes.
pub trait RandomSource {
    /// Pick a travel direction, each with equal probability.
    fn movement(&mut self) -> Movement;

    /// Uniform integer in `min..=max`.
    fn altitude_offset(&mut self, min: i32, max: i32) -> i32;
}

/// Production source backed by any `rand` generator.
pub struct RngSource<R: Rng> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<rand::rngs::ThreadRng> {
    pub fn thread_local() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn movement(&mut self) -> Movement {
        if self.rng.gen_bool(0.5) { Movement::Forward } else { Movement::Reverse }
    }

    fn altitude_offset(&mut self, min: i32, max: i32) -> i32 {
        self.rng.gen_range(min..=max)
    }
}
