//! # Nondominated sorting
//!
//! Partitions a population into Pareto layers under constrained dominance:
//! layer 0 is the nondominated set, layer `k` is what is nondominated once
//! layers `0..k` are removed. Two interchangeable algorithms implement the
//! [`NondominatedSorter`] trait and must agree on layer membership for every
//! input:
//!
//! - [`DebSort`]: the fast nondominated sort of Deb et al. (2002), O(M·N²).
//! - [`MergeSort`]: peels each layer with a divide-and-conquer nondominated
//!   filter.
//!
//! Both share the same capping policy. With `max_num_inds` set, sorting stops
//! once that many individuals are placed; if the last layer overshoots, a
//! uniform random subset of it is kept (never a positional prefix). With
//! `max_layer_index` set, sorting stops once that many layers exist.
//!
//! ```rust
//! use paretosynth::rng::RandomNumberGenerator;
//! use paretosynth::sorting::{DebSort, NondominatedSorter, SortOptions};
//! # use std::sync::Arc;
//! # use paretosynth::genotype::Genotype;
//! # use paretosynth::individual::Individual;
//! # use paretosynth::minmax::min_max_metrics;
//! # use paretosynth::problem::*;
//! # #[derive(Clone, Debug)]
//! # struct Design(u64);
//! # impl Genotype for Design { fn id(&self) -> u64 { self.0 } }
//! # let problem = Arc::new(ProblemSetup::new(vec![Analysis::new(
//! #     AnalysisId(0),
//! #     vec![EnvPoint::new(EnvPointId(0))],
//! #     vec![Metric::maximize("gain", 0.0, true)],
//! # )]).unwrap());
//! # let mut population: Vec<Individual<Design>> = (0..3)
//! #     .map(|i| {
//! #         let mut ind = Individual::new(Design(i), Arc::clone(&problem));
//! #         ind.report_sim_request(AnalysisId(0), EnvPointId(0)).unwrap();
//! #         ind.set_sim_results([("gain", i as f64)], AnalysisId(0), EnvPointId(0), None).unwrap();
//! #         ind
//! #     })
//! #     .collect();
//! let minmax = min_max_metrics(&problem, &population);
//! let mut rng = RandomNumberGenerator::from_seed(1);
//! let layers = DebSort.sort(&mut population, &minmax, &SortOptions::default(), &mut rng);
//!
//! assert_eq!(layers, vec![vec![2], vec![1], vec![0]]);
//! assert_eq!(population[0].rank(), Some(2));
//! ```

mod deb;
mod merge;
pub mod options;
#[cfg(test)]
mod tests_support;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::genotype::Genotype;
use crate::individual::{CacheToken, Individual};
use crate::minmax::{MetricWeights, MinMaxMetrics};
use crate::rng::RandomNumberGenerator;

pub use deb::DebSort;
pub use merge::MergeSort;
pub use options::{SortOptions, SortOptionsBuilder};

/// A nondominated sorting algorithm.
///
/// Layers are returned as indices into the population slice. An empty
/// population, or a cap that leaves nothing, yields a single empty layer.
pub trait NondominatedSorter<G: Genotype>: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Computes the layers without touching the population.
    ///
    /// Constraint violations are cached on the individuals under `token`, so
    /// the token must be fresh unless `minmax` and the weights are unchanged.
    fn sort_layers(
        &self,
        population: &[Individual<G>],
        minmax: &MinMaxMetrics,
        options: &SortOptions,
        token: CacheToken,
        rng: &mut RandomNumberGenerator,
    ) -> Vec<Vec<usize>>;

    /// Sorts `population` with a fresh cache token and writes every
    /// individual's rank: its layer index, or `None` if the caps left it out.
    fn sort(
        &self,
        population: &mut [Individual<G>],
        minmax: &MinMaxMetrics,
        options: &SortOptions,
        rng: &mut RandomNumberGenerator,
    ) -> Vec<Vec<usize>> {
        let layers = self.sort_layers(population, minmax, options, CacheToken::fresh(), rng);
        assign_ranks(population, &layers);
        debug!(
            algorithm = self.name(),
            population = population.len(),
            layers = layers.len(),
            placed = layers.iter().map(Vec::len).sum::<usize>(),
            "nondominated sort finished"
        );
        layers
    }
}

/// Which sorter a strategy runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortAlgorithm {
    #[default]
    Deb,
    Merge,
}

impl SortAlgorithm {
    pub fn sorter<G: Genotype>(&self) -> Box<dyn NondominatedSorter<G>> {
        match self {
            SortAlgorithm::Deb => Box::new(DebSort),
            SortAlgorithm::Merge => Box::new(MergeSort),
        }
    }
}

/// Resolves index layers into references.
pub fn layers_of<'a, G: Genotype>(
    population: &'a [Individual<G>],
    layers: &[Vec<usize>],
) -> Vec<Vec<&'a Individual<G>>> {
    layers
        .iter()
        .map(|layer| layer.iter().map(|&i| &population[i]).collect())
        .collect()
}

/// Sorts `population` with `sorter`, writing ranks, and returns the layers as
/// references into it.
pub fn nondominated_layers<'a, G, S>(
    sorter: &S,
    population: &'a mut [Individual<G>],
    minmax: &MinMaxMetrics,
    options: &SortOptions,
    rng: &mut RandomNumberGenerator,
) -> Vec<Vec<&'a Individual<G>>>
where
    G: Genotype,
    S: NondominatedSorter<G> + ?Sized,
{
    let layers = sorter.sort(population, minmax, options, rng);
    layers_of(population, &layers)
}

fn assign_ranks<G: Genotype>(population: &mut [Individual<G>], layers: &[Vec<usize>]) {
    population.iter_mut().for_each(|ind| ind.set_rank(None));
    for (rank, layer) in layers.iter().enumerate() {
        for &i in layer {
            population[i].set_rank(Some(rank));
        }
    }
}

/// Constrained dominance between population members under one sort call's
/// ranges, weights and cache token.
#[derive(Debug, Clone, Copy)]
struct DominanceView<'a> {
    minmax: &'a MinMaxMetrics,
    weights: Option<&'a MetricWeights>,
    token: CacheToken,
}

impl<'a> DominanceView<'a> {
    fn new(minmax: &'a MinMaxMetrics, options: &'a SortOptions, token: CacheToken) -> Self {
        Self {
            minmax,
            weights: options.get_metric_weights(),
            token,
        }
    }

    fn dominates<G: Genotype>(&self, population: &[Individual<G>], p: usize, q: usize) -> bool {
        population[p].constrained_dominates(&population[q], self.minmax, self.weights, Some(self.token))
    }
}

/// Accumulates layers while enforcing the layer-index and individual caps.
struct LayerCollector<'a> {
    options: &'a SortOptions,
    rng: &'a mut RandomNumberGenerator,
    layers: Vec<Vec<usize>>,
    placed: usize,
}

impl<'a> LayerCollector<'a> {
    fn new(options: &'a SortOptions, rng: &'a mut RandomNumberGenerator) -> Self {
        Self {
            options,
            rng,
            layers: Vec::new(),
            placed: 0,
        }
    }

    /// Adds the next layer. Returns `false` once no further layer may follow.
    fn push(&mut self, mut layer: Vec<usize>) -> bool {
        if let Some(max_layer_index) = self.options.get_max_layer_index() {
            if self.layers.len() >= max_layer_index {
                return false;
            }
        }

        if let Some(cap) = self.options.get_max_num_inds() {
            let room = cap.saturating_sub(self.placed);
            if layer.len() > room {
                // Canonical order first, so every sorter draws the same sample.
                layer.sort_unstable();
                debug!(
                    layer = self.layers.len(),
                    size = layer.len(),
                    kept = room,
                    "truncating last layer to fit the cap"
                );
                layer = self.rng.sample_subset(&layer, room);
            }
        }

        trace!(layer = self.layers.len(), size = layer.len(), "layer placed");
        self.placed += layer.len();
        if !layer.is_empty() {
            self.layers.push(layer);
        }

        let cap_reached = self
            .options
            .get_max_num_inds()
            .map_or(false, |cap| self.placed >= cap);
        let layers_full = self
            .options
            .get_max_layer_index()
            .map_or(false, |max| self.layers.len() >= max);
        !(cap_reached || layers_full)
    }

    fn finish(self) -> Vec<Vec<usize>> {
        if self.layers.is_empty() {
            vec![Vec::new()]
        } else {
            self.layers
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn collect(options: SortOptions, layers: Vec<Vec<usize>>, seed: u64) -> Vec<Vec<usize>> {
        let mut rng = RandomNumberGenerator::from_seed(seed);
        let mut collector = LayerCollector::new(&options, &mut rng);
        for layer in layers {
            if !collector.push(layer) {
                break;
            }
        }
        collector.finish()
    }

    #[test]
    fn test_collector_without_caps() {
        let layers = vec![vec![0, 1], vec![2], vec![3, 4]];
        assert_eq!(collect(SortOptions::default(), layers.clone(), 0), layers);
    }

    #[test]
    fn test_collector_layer_count_cap() {
        let layers = vec![vec![0, 1], vec![2], vec![3, 4]];
        let options = SortOptions::builder().max_layer_index(1).build();
        assert_eq!(collect(options, layers.clone(), 0), vec![vec![0, 1]]);

        let options = SortOptions::builder().max_layer_index(2).build();
        assert_eq!(collect(options, layers, 0), vec![vec![0, 1], vec![2]]);

        let options = SortOptions::builder().max_layer_index(0).build();
        assert_eq!(collect(options, vec![vec![5, 6]], 0), vec![Vec::<usize>::new()]);
    }

    #[test]
    fn test_collector_exact_fill_stops() {
        let layers = vec![vec![0, 1], vec![2], vec![3, 4]];
        let options = SortOptions::builder().max_num_inds(3).build();
        assert_eq!(collect(options, layers, 0), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_collector_truncates_last_layer_randomly() {
        let layers = vec![vec![0, 1], vec![9, 8, 7, 6, 5]];
        let options = SortOptions::builder().max_num_inds(4).build();
        let mut seen = HashSet::new();
        for seed in 0..20 {
            let result = collect(options.clone(), layers.clone(), seed);
            assert_eq!(result.len(), 2);
            assert_eq!(result[0], vec![0, 1]);
            assert_eq!(result[1].len(), 2);
            assert!(result[1].iter().all(|i| (5..=9).contains(i)));
            seen.insert(result[1].clone());
        }
        // not a positional prefix
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_collector_zero_cap_yields_one_empty_layer() {
        let options = SortOptions::builder().max_num_inds(0).build();
        assert_eq!(collect(options, vec![vec![0, 1]], 0), vec![Vec::<usize>::new()]);
    }
}
