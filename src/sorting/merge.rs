use std::collections::HashSet;

use tracing::warn;

use super::{DominanceView, LayerCollector, NondominatedSorter, SortOptions};
use crate::genotype::Genotype;
use crate::individual::{CacheToken, Individual};
use crate::minmax::MinMaxMetrics;
use crate::rng::RandomNumberGenerator;

/// Layer peeling with a divide-and-conquer nondominated filter.
///
/// Each layer is the nondominated subset of the individuals not yet placed.
/// That subset is found by halving the pool, reducing each half to its own
/// nondominated subset recursively, and filtering the union of the two with a
/// flat pairwise pass. Because constrained dominance is transitive, anything
/// dominated within a half is also dominated by a survivor of that half, so
/// the reduced halves lose nothing.
///
/// Produces the same layer membership as [`DebSort`](super::DebSort).
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeSort;

impl<G: Genotype> NondominatedSorter<G> for MergeSort {
    fn name(&self) -> &'static str {
        "merge"
    }

    fn sort_layers(
        &self,
        population: &[Individual<G>],
        minmax: &MinMaxMetrics,
        options: &SortOptions,
        token: CacheToken,
        rng: &mut RandomNumberGenerator,
    ) -> Vec<Vec<usize>> {
        if population.is_empty() {
            return vec![Vec::new()];
        }

        let view = DominanceView::new(minmax, options, token);
        let threshold = options.get_parallel_threshold();
        let mut remaining: Vec<usize> = (0..population.len()).collect();
        let mut collector = LayerCollector::new(options, rng);

        while !remaining.is_empty() {
            let layer = merge_nondominated(&view, population, &remaining, threshold);
            if layer.is_empty() {
                warn!(
                    remaining = remaining.len(),
                    "no nondominated individual left; dominance is cyclic"
                );
                break;
            }
            let placed: HashSet<usize> = layer.iter().copied().collect();
            remaining.retain(|i| !placed.contains(i));
            if !collector.push(layer) {
                break;
            }
        }

        collector.finish()
    }
}

/// Nondominated subset of `pool`, computed by recursive halving.
fn merge_nondominated<G: Genotype>(
    view: &DominanceView<'_>,
    population: &[Individual<G>],
    pool: &[usize],
    parallel_threshold: usize,
) -> Vec<usize> {
    if pool.len() <= 1 {
        return pool.to_vec();
    }

    let (left, right) = pool.split_at(pool.len() / 2);
    let (mut merged, right) = if pool.len() >= parallel_threshold {
        rayon::join(
            || merge_nondominated(view, population, left, parallel_threshold),
            || merge_nondominated(view, population, right, parallel_threshold),
        )
    } else {
        (
            merge_nondominated(view, population, left, parallel_threshold),
            merge_nondominated(view, population, right, parallel_threshold),
        )
    };
    merged.extend(right);
    nondominated_subset(view, population, &merged)
}

/// Flat O(N²) filter: keeps the members of `pool` no other member dominates.
fn nondominated_subset<G: Genotype>(
    view: &DominanceView<'_>,
    population: &[Individual<G>],
    pool: &[usize],
) -> Vec<usize> {
    pool.iter()
        .copied()
        .filter(|&p| !pool.iter().any(|&q| q != p && view.dominates(population, q, p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorting::tests_support::{layer_ids, scenario_population};

    #[test]
    fn test_reference_scenario() {
        let (population, minmax) = scenario_population();
        let mut rng = RandomNumberGenerator::from_seed(3);
        let layers = MergeSort.sort_layers(
            &population,
            &minmax,
            &SortOptions::default(),
            CacheToken::fresh(),
            &mut rng,
        );
        assert_eq!(
            layer_ids(&population, &layers),
            vec![vec![0, 5, 6], vec![1, 4], vec![2], vec![3]]
        );
    }

    #[test]
    fn test_nondominated_subset_of_whole_scenario() {
        let (population, minmax) = scenario_population();
        let options = SortOptions::default();
        let view = DominanceView::new(&minmax, &options, CacheToken::fresh());
        let all: Vec<usize> = (0..population.len()).collect();

        let mut flat = nondominated_subset(&view, &population, &all);
        let mut merged = merge_nondominated(&view, &population, &all, usize::MAX);
        let mut joined = merge_nondominated(&view, &population, &all, 2);
        flat.sort_unstable();
        merged.sort_unstable();
        joined.sort_unstable();

        assert_eq!(flat, vec![0, 5, 6]);
        assert_eq!(merged, flat);
        assert_eq!(joined, flat);
    }
}
