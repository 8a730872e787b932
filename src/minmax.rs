//! # Metric ranges
//!
//! Constraint violations of different metrics are only comparable after
//! normalizing each by the spread of that metric across the population being
//! ranked. [`min_max_metrics`] computes those spreads in one pass; the result is
//! population-relative and must be recomputed whenever the population changes.

use std::collections::HashMap;

use crate::genotype::Genotype;
use crate::individual::Individual;
use crate::problem::ProblemSetup;

/// Optional per-metric multipliers applied to normalized constraint
/// violations. Metrics without an entry weigh 1.0.
pub type MetricWeights = HashMap<String, f64>;

/// Per-metric `(min, max)` of worst-case values over a population.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MinMaxMetrics {
    ranges: HashMap<String, (f64, f64)>,
}

impl MinMaxMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the range of one metric by hand.
    pub fn insert<S: Into<String>>(&mut self, name: S, min: f64, max: f64) {
        self.ranges.insert(name.into(), (min, max));
    }

    pub fn get(&self, name: &str) -> Option<(f64, f64)> {
        self.ranges.get(name).copied()
    }

    /// Width of the range usable for normalization.
    ///
    /// `None` when the metric is unknown, the range is empty (no numeric value
    /// was seen) or has zero width; such metrics do not contribute to
    /// constraint violation.
    pub fn range(&self, name: &str) -> Option<f64> {
        let (min, max) = self.get(name)?;
        let width = max - min;
        (width.is_finite() && width > 0.0).then_some(width)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Scans `individuals` once and returns, for every metric of `problem`, the
/// smallest and largest worst-case value seen.
///
/// Ranges start at `(+inf, -inf)`; `Bad` values are skipped.
pub fn min_max_metrics<'a, G, I>(problem: &ProblemSetup, individuals: I) -> MinMaxMetrics
where
    G: Genotype + 'a,
    I: IntoIterator<Item = &'a Individual<G>>,
{
    let mut ranges: HashMap<String, (f64, f64)> = problem
        .flattened_metrics()
        .map(|m| (m.name().to_string(), (f64::INFINITY, f64::NEG_INFINITY)))
        .collect();

    for ind in individuals {
        for metric in problem.flattened_metrics() {
            if let Some(v) = ind.worst_case_of(metric).value() {
                if let Some((min, max)) = ranges.get_mut(metric.name()) {
                    *min = min.min(v);
                    *max = max.max(v);
                }
            }
        }
    }

    MinMaxMetrics { ranges }
}
