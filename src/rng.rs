//! # RandomNumberGenerator
//!
//! The `RandomNumberGenerator` struct is the single source of randomness used by
//! the ranking code: the only random decision the core makes is which members of
//! an over-full last layer survive the population cap. Seed it for reproducible
//! runs and tests.
//!
//! ## Example
//!
//! ```rust
//! use paretosynth::rng::RandomNumberGenerator;
//!
//! let mut rng = RandomNumberGenerator::from_seed(7);
//! let kept = rng.sample_subset(&[10, 11, 12, 13, 14], 2);
//! assert_eq!(kept.len(), 2);
//! ```
//!
//! ## Thread-local RNG
//!
//! `ThreadLocalRng` gives cheap unsynchronised access to the thread's RNG:
//!
//! ```rust
//! use paretosynth::rng::ThreadLocalRng;
//!
//! let x: u64 = ThreadLocalRng::gen_range(0..100);
//! assert!(x < 100);
//! ```

use rand::{rngs::StdRng, seq::index, thread_rng, Rng, SeedableRng};

/// A thread-local random number generator that can be used without synchronization.
///
/// It uses the built-in `ThreadRng` from the `rand` crate, which is automatically
/// seeded from the system entropy and is thread-local.
pub struct ThreadLocalRng;

impl ThreadLocalRng {
    /// Generates a random number in the given range.
    pub fn gen_range<T, R>(range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        thread_rng().gen_range(range)
    }
}

/// A wrapper around the `rand` crate's `StdRng`.
#[derive(Clone)]
pub struct RandomNumberGenerator {
    pub rng: StdRng,
}

impl RandomNumberGenerator {
    /// Creates a new `RandomNumberGenerator` instance seeded from the system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a new `RandomNumberGenerator` instance with a specific seed.
    ///
    /// This is useful for reproducible tests and benchmarks.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws `amount` distinct elements of `items` uniformly at random,
    /// without replacement.
    ///
    /// The result keeps the relative order of `items`. If `amount` is at least
    /// `items.len()`, every element is returned.
    pub fn sample_subset<T: Copy>(&mut self, items: &[T], amount: usize) -> Vec<T> {
        if amount >= items.len() {
            return items.to_vec();
        }
        let mut picked = index::sample(&mut self.rng, items.len(), amount).into_vec();
        picked.sort_unstable();
        picked.into_iter().map(|i| items[i]).collect()
    }
}

impl Default for RandomNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sample_subset_size_and_membership() {
        let mut rng = RandomNumberGenerator::new();
        let items: Vec<usize> = (100..120).collect();
        let picked = rng.sample_subset(&items, 7);

        assert_eq!(picked.len(), 7);
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 7);
        assert!(picked.iter().all(|p| items.contains(p)));
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sample_subset_larger_than_input() {
        let mut rng = RandomNumberGenerator::new();
        assert_eq!(rng.sample_subset(&[1, 2, 3], 5), vec![1, 2, 3]);
        assert!(rng.sample_subset::<u8>(&[], 0).is_empty());
    }

    #[test]
    fn test_seeded_clone_is_reproducible() {
        let mut rng1 = RandomNumberGenerator::from_seed(42);
        let mut rng2 = rng1.clone();
        let items: Vec<usize> = (0..50).collect();

        assert_eq!(
            rng1.sample_subset(&items, 10),
            rng2.sample_subset(&items, 10)
        );
    }

    #[test]
    fn test_thread_local_rng() {
        for _ in 0..10 {
            let x: f64 = ThreadLocalRng::gen_range(0.0..1.0);
            assert!((0.0..1.0).contains(&x));
        }
    }
}
