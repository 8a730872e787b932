use rayon::prelude::*;
use tracing::trace;

use super::{DominanceView, LayerCollector, NondominatedSorter, SortOptions};
use crate::genotype::Genotype;
use crate::individual::{CacheToken, Individual};
use crate::minmax::MinMaxMetrics;
use crate::rng::RandomNumberGenerator;

/// Fast nondominated sorting (Deb et al., 2002).
///
/// Every ordered pair is tested once. For each individual `p` we keep the set
/// `S_p` of individuals it dominates and the count `n_p` of individuals that
/// dominate it. Layer 0 is everything with `n_p == 0`; each following layer
/// is what reaches `n == 0` after decrementing the counts of the previous
/// layer's `S` sets.
///
/// # Complexity
///
/// O(M·N²) dominance work for M metrics and N individuals.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebSort;

impl<G: Genotype> NondominatedSorter<G> for DebSort {
    fn name(&self) -> &'static str {
        "deb"
    }

    fn sort_layers(
        &self,
        population: &[Individual<G>],
        minmax: &MinMaxMetrics,
        options: &SortOptions,
        token: CacheToken,
        rng: &mut RandomNumberGenerator,
    ) -> Vec<Vec<usize>> {
        let n = population.len();
        if n == 0 {
            return vec![Vec::new()];
        }

        let view = DominanceView::new(minmax, options, token);
        let dominated_by_p = |p: usize| -> Vec<usize> {
            (0..n)
                .filter(|&q| q != p && view.dominates(population, p, q))
                .collect()
        };

        // S_p for every p
        let dominated_sets: Vec<Vec<usize>> = if n >= options.get_parallel_threshold() {
            (0..n).into_par_iter().map(dominated_by_p).collect()
        } else {
            (0..n).map(dominated_by_p).collect()
        };

        // n_p for every p
        let mut domination_count = vec![0usize; n];
        for set in &dominated_sets {
            for &q in set {
                domination_count[q] += 1;
            }
        }

        let mut collector = LayerCollector::new(options, rng);
        let mut current: Vec<usize> = (0..n).filter(|&p| domination_count[p] == 0).collect();

        while !current.is_empty() {
            let mut next = Vec::new();
            for &p in &current {
                for &q in &dominated_sets[p] {
                    domination_count[q] -= 1;
                    if domination_count[q] == 0 {
                        next.push(q);
                    }
                }
            }
            if !collector.push(current) {
                break;
            }
            current = next;
        }

        let unplaced = domination_count.iter().filter(|&&c| c > 0).count();
        if unplaced > 0 {
            trace!(unplaced, "individuals left in dominance cycles");
        }
        collector.finish()
    }
}
