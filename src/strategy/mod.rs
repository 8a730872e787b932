//! # SolutionStrategy
//!
//! Run-level settings of an age-layered search: how large each age layer may
//! grow, how many layers there are, how the age limits of the layers are
//! spaced, and which nondominated sorter ranks the survivors.
//!
//! ## Example
//!
//! ```rust
//! use paretosynth::strategy::{AgeGapScheme, SolutionStrategy};
//! use paretosynth::sorting::SortAlgorithm;
//!
//! let strategy = SolutionStrategy::builder()
//!     .num_inds_per_age_layer(20)
//!     .max_num_age_layers(4)
//!     .age_gap(3)
//!     .age_gap_scheme(AgeGapScheme::Polynomial)
//!     .sort_algorithm(SortAlgorithm::Merge)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(strategy.max_num_inds(), 80);
//! assert_eq!(strategy.max_age_for_layer(1), Some(12));
//! assert_eq!(strategy.max_age_for_layer(3), None);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};
use crate::genotype::Genotype;
use crate::rng::RandomNumberGenerator;
use crate::sorting::{NondominatedSorter, SortAlgorithm, SortOptions};

/// Spacing of the age limits of consecutive age layers.
///
/// Layer `i` admits individuals up to `age_gap * f(i + 1)` generations old,
/// where `f` is the scheme's sequence. The last layer has no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AgeGapScheme {
    /// 1, 2, 3, 4, ...
    #[default]
    Linear,
    /// 1, 4, 9, 16, ...
    Polynomial,
    /// 1, 2, 3, 5, 8, ...
    Fibonacci,
    /// 1, 2, 4, 8, ...
    Exponential,
}

impl AgeGapScheme {
    fn multiplier(&self, k: u32) -> u64 {
        let k = u64::from(k);
        match self {
            AgeGapScheme::Linear => k,
            AgeGapScheme::Polynomial => k.saturating_mul(k),
            AgeGapScheme::Fibonacci => {
                let (mut a, mut b) = (1u64, 2u64);
                for _ in 1..k {
                    let next = a.saturating_add(b);
                    a = b;
                    b = next;
                }
                a
            }
            AgeGapScheme::Exponential => {
                let shift = u32::try_from(k.saturating_sub(1)).unwrap_or(u32::MAX);
                1u64.checked_shl(shift).unwrap_or(u64::MAX)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionStrategy {
    num_inds_per_age_layer: usize,
    max_num_age_layers: usize,
    age_gap: u32,
    age_gap_scheme: AgeGapScheme,
    sort_algorithm: SortAlgorithm,
    rng_seed: Option<u64>,
}

impl SolutionStrategy {
    pub fn builder() -> SolutionStrategyBuilder {
        SolutionStrategyBuilder::default()
    }

    /// Checks that the settings describe a usable run.
    ///
    /// # Errors
    ///
    /// `Configuration` if any layer size, the layer count or the age gap is
    /// zero.
    pub fn validate(&self) -> Result<()> {
        if self.num_inds_per_age_layer == 0 {
            return Err(SynthError::Configuration(
                "num_inds_per_age_layer must be positive".to_string(),
            ));
        }
        if self.max_num_age_layers == 0 {
            return Err(SynthError::Configuration(
                "max_num_age_layers must be positive".to_string(),
            ));
        }
        if self.age_gap == 0 {
            return Err(SynthError::Configuration("age_gap must be positive".to_string()));
        }
        Ok(())
    }

    pub fn num_inds_per_age_layer(&self) -> usize {
        self.num_inds_per_age_layer
    }

    pub fn max_num_age_layers(&self) -> usize {
        self.max_num_age_layers
    }

    pub fn age_gap(&self) -> u32 {
        self.age_gap
    }

    pub fn age_gap_scheme(&self) -> AgeGapScheme {
        self.age_gap_scheme
    }

    pub fn sort_algorithm(&self) -> SortAlgorithm {
        self.sort_algorithm
    }

    pub fn rng_seed(&self) -> Option<u64> {
        self.rng_seed
    }

    /// Oldest genetic age admitted to `layer`, or `None` for the last
    /// (unbounded) layer and anything past it.
    pub fn max_age_for_layer(&self, layer: usize) -> Option<u64> {
        if layer + 1 >= self.max_num_age_layers {
            return None;
        }
        let k = u32::try_from(layer + 1).unwrap_or(u32::MAX);
        Some(u64::from(self.age_gap).saturating_mul(self.age_gap_scheme.multiplier(k)))
    }

    /// Population cap over all age layers.
    pub fn max_num_inds(&self) -> usize {
        self.num_inds_per_age_layer
            .saturating_mul(self.max_num_age_layers)
    }

    /// The configured sorter.
    pub fn sorter<G: Genotype>(&self) -> Box<dyn NondominatedSorter<G>> {
        self.sort_algorithm.sorter()
    }

    /// Sort options for selecting the survivors of one age layer.
    pub fn layer_sort_options(&self) -> SortOptions {
        SortOptions::new(Some(self.num_inds_per_age_layer), None)
    }

    /// Seeded generator if a seed is configured, entropy otherwise.
    pub fn rng(&self) -> RandomNumberGenerator {
        match self.rng_seed {
            Some(seed) => RandomNumberGenerator::from_seed(seed),
            None => RandomNumberGenerator::new(),
        }
    }
}

impl Default for SolutionStrategy {
    fn default() -> Self {
        Self {
            num_inds_per_age_layer: 50,
            max_num_age_layers: 5,
            age_gap: 10,
            age_gap_scheme: AgeGapScheme::Linear,
            sort_algorithm: SortAlgorithm::Deb,
            rng_seed: None,
        }
    }
}

/// Builder for `SolutionStrategy`.
#[derive(Debug, Clone, Default)]
pub struct SolutionStrategyBuilder {
    num_inds_per_age_layer: Option<usize>,
    max_num_age_layers: Option<usize>,
    age_gap: Option<u32>,
    age_gap_scheme: Option<AgeGapScheme>,
    sort_algorithm: Option<SortAlgorithm>,
    rng_seed: Option<u64>,
}

impl SolutionStrategyBuilder {
    pub fn num_inds_per_age_layer(mut self, value: usize) -> Self {
        self.num_inds_per_age_layer = Some(value);
        self
    }

    pub fn max_num_age_layers(mut self, value: usize) -> Self {
        self.max_num_age_layers = Some(value);
        self
    }

    pub fn age_gap(mut self, value: u32) -> Self {
        self.age_gap = Some(value);
        self
    }

    pub fn age_gap_scheme(mut self, value: AgeGapScheme) -> Self {
        self.age_gap_scheme = Some(value);
        self
    }

    pub fn sort_algorithm(mut self, value: SortAlgorithm) -> Self {
        self.sort_algorithm = Some(value);
        self
    }

    pub fn rng_seed(mut self, value: u64) -> Self {
        self.rng_seed = Some(value);
        self
    }

    /// Fills unset fields with the defaults and validates the result.
    pub fn build(self) -> Result<SolutionStrategy> {
        let defaults = SolutionStrategy::default();
        let strategy = SolutionStrategy {
            num_inds_per_age_layer: self
                .num_inds_per_age_layer
                .unwrap_or(defaults.num_inds_per_age_layer),
            max_num_age_layers: self
                .max_num_age_layers
                .unwrap_or(defaults.max_num_age_layers),
            age_gap: self.age_gap.unwrap_or(defaults.age_gap),
            age_gap_scheme: self.age_gap_scheme.unwrap_or(defaults.age_gap_scheme),
            sort_algorithm: self.sort_algorithm.unwrap_or(defaults.sort_algorithm),
            rng_seed: self.rng_seed,
        };
        strategy.validate()?;
        Ok(strategy)
    }
}
