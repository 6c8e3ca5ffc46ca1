//! Seeded, reproducible choice primitive

use crate::{BackdropError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic chooser backed by ChaCha8.
///
/// Entropy use: `next_int` with `min < max` performs one `gen_range` sample;
/// `min >= max` consumes nothing. `choice` is exactly one `next_int(0, len)`.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    seed: u64,
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Create a generator from a seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed this generator was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Integer in `[min, max)`, or `min` when the range is empty
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    /// Uniformly pick one element of a non-empty slice
    pub fn choice<'a, T>(&mut self, items: &'a [T]) -> Result<&'a T> {
        if items.is_empty() {
            return Err(BackdropError::EmptyInput(
                "cannot choose from an empty sequence".to_string(),
            ));
        }
        let index = self.next_int(0, items.len() as i64) as usize;
        Ok(&items[index])
    }
}
