//! # SortOptions
//!
//! The `SortOptions` struct configures one nondominated sort: how many
//! individuals and layers to keep, how to weigh constraint violations, and when
//! to spread the pairwise dominance pass over the rayon thread pool.
//!
//! ## Example
//!
//! ```rust
//! use paretosynth::sorting::SortOptions;
//!
//! // Keep at most 50 individuals from at most the first 4 layers (0..4).
//! let options = SortOptions::builder()
//!     .max_num_inds(50)
//!     .max_layer_index(4)
//!     .build();
//!
//! assert_eq!(options.get_max_num_inds(), Some(50));
//!
//! // Unlimited, unweighted.
//! let default_options = SortOptions::default();
//! assert_eq!(default_options.get_max_num_inds(), None);
//! ```

use crate::minmax::MetricWeights;

/// Default population size from which the dominance pass runs in parallel.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct SortOptions {
    max_num_inds: Option<usize>,
    max_layer_index: Option<usize>,
    metric_weights: Option<MetricWeights>,
    /// Minimum population size to process in parallel
    parallel_threshold: usize,
}

impl SortOptions {
    pub fn new(max_num_inds: Option<usize>, max_layer_index: Option<usize>) -> Self {
        Self {
            max_num_inds,
            max_layer_index,
            metric_weights: None,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    /// Stop once this many individuals have been placed; the last layer is
    /// randomly thinned to fit exactly.
    pub fn get_max_num_inds(&self) -> Option<usize> {
        self.max_num_inds
    }

    /// Number of layers after which sorting stops (layers
    /// `0..max_layer_index`).
    pub fn get_max_layer_index(&self) -> Option<usize> {
        self.max_layer_index
    }

    pub fn get_metric_weights(&self) -> Option<&MetricWeights> {
        self.metric_weights.as_ref()
    }

    pub fn get_parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    pub fn set_max_num_inds(&mut self, max_num_inds: Option<usize>) {
        self.max_num_inds = max_num_inds;
    }

    pub fn set_max_layer_index(&mut self, max_layer_index: Option<usize>) {
        self.max_layer_index = max_layer_index;
    }

    pub fn set_metric_weights(&mut self, metric_weights: Option<MetricWeights>) {
        self.metric_weights = metric_weights;
    }

    pub fn set_parallel_threshold(&mut self, threshold: usize) {
        self.parallel_threshold = threshold;
    }

    /// Returns a builder for creating a `SortOptions` instance.
    pub fn builder() -> SortOptionsBuilder {
        SortOptionsBuilder::default()
    }
}

impl Default for SortOptions {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Builder for `SortOptions`.
#[derive(Debug, Clone, Default)]
pub struct SortOptionsBuilder {
    max_num_inds: Option<usize>,
    max_layer_index: Option<usize>,
    metric_weights: Option<MetricWeights>,
    parallel_threshold: Option<usize>,
}

impl SortOptionsBuilder {
    pub fn max_num_inds(mut self, value: usize) -> Self {
        self.max_num_inds = Some(value);
        self
    }

    pub fn max_layer_index(mut self, value: usize) -> Self {
        self.max_layer_index = Some(value);
        self
    }

    pub fn metric_weights(mut self, value: MetricWeights) -> Self {
        self.metric_weights = Some(value);
        self
    }

    pub fn parallel_threshold(mut self, value: usize) -> Self {
        self.parallel_threshold = Some(value);
        self
    }

    pub fn build(self) -> SortOptions {
        SortOptions {
            max_num_inds: self.max_num_inds,
            max_layer_index: self.max_layer_index,
            metric_weights: self.metric_weights,
            parallel_threshold: self
                .parallel_threshold
                .unwrap_or(DEFAULT_PARALLEL_THRESHOLD),
        }
    }
}
