//! # Individual
//!
//! An `Individual` is the evaluation ledger of one candidate design. It records
//! which (analysis, env point) simulations have been requested, the metric
//! values that came back, and derives from them the quantities ranking needs:
//! worst-case metric values, feasibility, constraint violation and
//! (constrained) Pareto dominance.
//!
//! Every request slot and every result slot exists from construction on,
//! initialized to "not requested" / "no value". Each slot can be filled at most
//! once; filling it twice is a bug in the evaluation driver and is reported as
//! an error.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use paretosynth::genotype::Genotype;
//! use paretosynth::individual::Individual;
//! use paretosynth::problem::{Analysis, AnalysisId, EnvPoint, EnvPointId, Metric, ProblemSetup};
//!
//! #[derive(Clone, Debug)]
//! struct Design(u64);
//!
//! impl Genotype for Design {
//!     fn id(&self) -> u64 {
//!         self.0
//!     }
//! }
//!
//! let problem = Arc::new(
//!     ProblemSetup::new(vec![Analysis::new(
//!         AnalysisId(0),
//!         vec![EnvPoint::new(EnvPointId(0))],
//!         vec![Metric::maximize("gain", 60.0, true)],
//!     )])
//!     .unwrap(),
//! );
//!
//! let mut ind = Individual::new(Design(1), problem);
//! ind.report_sim_request(AnalysisId(0), EnvPointId(0)).unwrap();
//! ind.set_sim_results([("gain", 72.0)], AnalysisId(0), EnvPointId(0), None)
//!     .unwrap();
//!
//! assert!(ind.fully_evaluated());
//! assert!(ind.is_feasible());
//! ```

mod cache;
mod record;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::warn;

use crate::error::{OptionExt, Result, SynthError};
use crate::genotype::Genotype;
use crate::minmax::{MetricWeights, MinMaxMetrics};
use crate::problem::{AnalysisId, EnvPointId, Metric, MetricValue, ProblemSetup, BAD_METRIC_VALUE};

pub use cache::CacheToken;
pub use record::IndividualRecord;

use cache::{FrozenEvaluation, ViolationCache};

/// Raw waveform samples returned by a simulation, one vector per signal.
pub type Waveforms = Vec<Vec<f64>>;

/// Per-candidate evaluation ledger.
#[derive(Debug)]
pub struct Individual<G: Genotype> {
    genotype: G,
    problem: Arc<ProblemSetup>,
    sim_requests_made: BTreeMap<(AnalysisId, EnvPointId), bool>,
    sim_results: HashMap<String, BTreeMap<EnvPointId, Option<MetricValue>>>,
    sim_waveforms: HashMap<(AnalysisId, EnvPointId), Waveforms>,
    rank: Option<usize>,
    genetic_age: u32,
    fully_evaluated: AtomicBool,
    frozen: OnceLock<FrozenEvaluation>,
    violations: ViolationCache,
}

impl<G: Genotype> Individual<G> {
    /// Creates an unevaluated individual with one empty slot per declared
    /// (analysis, env point) pair and per (metric, env point) pair.
    pub fn new(genotype: G, problem: Arc<ProblemSetup>) -> Self {
        let mut sim_requests_made = BTreeMap::new();
        let mut sim_results = HashMap::new();

        for analysis in problem.analyses() {
            for env_point in analysis.env_points() {
                sim_requests_made.insert((analysis.id(), env_point.id()), false);
            }
            for metric in analysis.metrics() {
                let slots: BTreeMap<EnvPointId, Option<MetricValue>> = analysis
                    .env_points()
                    .iter()
                    .map(|e| (e.id(), None))
                    .collect();
                sim_results.insert(metric.name().to_string(), slots);
            }
        }

        Self {
            genotype,
            problem,
            sim_requests_made,
            sim_results,
            sim_waveforms: HashMap::new(),
            rank: None,
            genetic_age: 0,
            fully_evaluated: AtomicBool::new(false),
            frozen: OnceLock::new(),
            violations: ViolationCache::default(),
        }
    }

    pub fn id(&self) -> u64 {
        self.genotype.id()
    }

    pub fn genotype(&self) -> &G {
        &self.genotype
    }

    pub fn problem(&self) -> &Arc<ProblemSetup> {
        &self.problem
    }

    /// Pareto layer assigned by the most recent sort, if the individual made
    /// it into one.
    pub fn rank(&self) -> Option<usize> {
        self.rank
    }

    pub(crate) fn set_rank(&mut self, rank: Option<usize>) {
        self.rank = rank;
    }

    pub fn genetic_age(&self) -> u32 {
        self.genetic_age
    }

    pub fn set_genetic_age(&mut self, age: u32) {
        self.genetic_age = age;
    }

    /// Marks the simulation of `analysis` at `env_point` as requested.
    ///
    /// # Errors
    ///
    /// `AlreadyRequested` if the pair was requested before; `UnknownAnalysis`
    /// or `UnknownEnvPoint` if the pair is not declared by the problem.
    pub fn report_sim_request(&mut self, analysis: AnalysisId, env_point: EnvPointId) -> Result<()> {
        let slot = match self.sim_requests_made.get_mut(&(analysis, env_point)) {
            Some(slot) => slot,
            None => return Err(unknown_slot(&self.problem, analysis, env_point)),
        };
        if *slot {
            return Err(SynthError::AlreadyRequested {
                analysis,
                env_point,
            });
        }
        *slot = true;
        Ok(())
    }

    pub fn sim_request_made(&self, analysis: AnalysisId, env_point: EnvPointId) -> bool {
        self.sim_requests_made
            .get(&(analysis, env_point))
            .copied()
            .unwrap_or(false)
    }

    pub fn num_requests_made(&self) -> usize {
        self.sim_requests_made.values().filter(|&&r| r).count()
    }

    /// Stores the metric values (and optionally waveforms) produced by
    /// simulating `analysis` at `env_point`.
    ///
    /// Everything is validated before anything is written, so a failed call
    /// leaves the individual untouched.
    ///
    /// # Errors
    ///
    /// - `RequestNotYetMade` if the pair was never reported as requested
    /// - `UnknownMetric` if a name is not a metric of `analysis`
    /// - `ResultAlreadySet` if a metric already has a value at `env_point`
    ///   (or is named twice in `results`)
    /// - `InvalidNumericValue` for NaN/infinite values; report those as `Bad`
    /// - `WaveformAlreadySet` if waveforms were already stored for the pair
    pub fn set_sim_results<I, K, V>(
        &mut self,
        results: I,
        analysis: AnalysisId,
        env_point: EnvPointId,
        waveforms: Option<Waveforms>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<MetricValue>,
    {
        match self.sim_requests_made.get(&(analysis, env_point)) {
            None => return Err(unknown_slot(&self.problem, analysis, env_point)),
            Some(false) => {
                return Err(SynthError::RequestNotYetMade {
                    analysis,
                    env_point,
                })
            }
            Some(true) => {}
        }

        let results: Vec<(String, MetricValue)> =
            results.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

        let analysis_def = self.problem.analysis(analysis)?;
        let mut seen = HashSet::new();
        for (name, value) in &results {
            if !analysis_def.has_metric(name) {
                return Err(SynthError::UnknownMetric(name.clone()));
            }
            let already_set = self
                .sim_results
                .get(name)
                .and_then(|slots| slots.get(&env_point))
                .map_or(false, |v| v.is_some());
            if already_set || !seen.insert(name.as_str()) {
                return Err(SynthError::ResultAlreadySet {
                    metric: name.clone(),
                    env_point,
                });
            }
            if let MetricValue::Value(v) = value {
                if !v.is_finite() {
                    return Err(SynthError::InvalidNumericValue(format!(
                        "metric '{}' at env point {} is {}",
                        name, env_point, v
                    )));
                }
            }
        }
        if waveforms.is_some() && self.sim_waveforms.contains_key(&(analysis, env_point)) {
            return Err(SynthError::WaveformAlreadySet {
                analysis,
                env_point,
            });
        }

        for (name, value) in results {
            if let Some(slot) = self
                .sim_results
                .get_mut(&name)
                .and_then(|slots| slots.get_mut(&env_point))
            {
                *slot = Some(value);
            }
        }
        if let Some(waveforms) = waveforms {
            self.sim_waveforms.insert((analysis, env_point), waveforms);
        }
        self.invalidate_caches();
        Ok(())
    }

    pub fn sim_result(&self, metric: &str, env_point: EnvPointId) -> Option<MetricValue> {
        self.sim_results
            .get(metric)
            .and_then(|slots| slots.get(&env_point))
            .copied()
            .flatten()
    }

    pub fn sim_waveforms(&self, analysis: AnalysisId, env_point: EnvPointId) -> Option<&Waveforms> {
        self.sim_waveforms.get(&(analysis, env_point))
    }

    /// Marks every pair requested and every result `Bad`.
    ///
    /// Used when evaluation failed so badly that per-value bookkeeping is
    /// pointless. Afterwards the individual is fully evaluated, bad and
    /// infeasible.
    pub fn force_fully_bad(&mut self) {
        warn!(individual = self.id(), "forcing individual fully bad");
        self.sim_requests_made.values_mut().for_each(|r| *r = true);
        for slots in self.sim_results.values_mut() {
            slots.values_mut().for_each(|v| *v = Some(BAD_METRIC_VALUE));
        }
        self.invalidate_caches();
        self.fully_evaluated.store(true, Ordering::Relaxed);
    }

    /// Returns true if any recorded result is `Bad`.
    pub fn is_bad(&self) -> bool {
        self.sim_results
            .values()
            .flat_map(|slots| slots.values())
            .any(|v| matches!(v, Some(MetricValue::Bad)))
    }

    /// Returns true once every declared (analysis, env point) pair has been
    /// requested. Never reverts to false.
    pub fn fully_evaluated(&self) -> bool {
        if self.fully_evaluated.load(Ordering::Relaxed) {
            return true;
        }
        let done = self.sim_requests_made.values().all(|&r| r);
        if done {
            self.fully_evaluated.store(true, Ordering::Relaxed);
        }
        done
    }

    /// Worst value of metric `name` across the env points it was measured at.
    ///
    /// # Errors
    ///
    /// `UnknownMetric` if `name` is not part of the problem.
    pub fn worst_case_metric_value(&self, name: &str) -> Result<MetricValue> {
        let metric = self
            .problem
            .metric(name)
            .ok_or_else_synth(|| SynthError::UnknownMetric(name.to_string()))?;
        Ok(self.worst_case_of(metric))
    }

    pub(crate) fn worst_case_of(&self, metric: &Metric) -> MetricValue {
        match self.frozen() {
            Some(frozen) => frozen
                .worst_case
                .get(metric.name())
                .copied()
                .unwrap_or_else(|| self.compute_worst_case(metric)),
            None => self.compute_worst_case(metric),
        }
    }

    /// True iff every metric's worst-case value is feasible.
    pub fn is_feasible(&self) -> bool {
        match self.frozen() {
            Some(frozen) => frozen.feasible,
            None => self.compute_feasible(),
        }
    }

    /// Normalized, optionally weighted sum of constraint violations.
    ///
    /// Each metric contributes `violation / (max - min)` using the ranges in
    /// `minmax`, times its weight. Metrics weighted zero are skipped. Bad
    /// individuals have infinite violation.
    /// When `cache_token` is given, the result is cached under that token so
    /// several views (different ranges or weights) can coexist.
    pub fn constraint_violation(
        &self,
        minmax: &MinMaxMetrics,
        metric_weights: Option<&MetricWeights>,
        cache_token: Option<CacheToken>,
    ) -> f64 {
        if self.is_bad() {
            return f64::INFINITY;
        }
        if let Some(cached) = cache_token.and_then(|t| self.violations.get(t)) {
            return cached;
        }

        let mut violation = 0.0;
        for metric in self.problem.flattened_metrics() {
            let Some(range) = minmax.range(metric.name()) else {
                continue;
            };
            let weight = metric_weights
                .and_then(|w| w.get(metric.name()))
                .copied()
                .unwrap_or(1.0);
            // a zero weight silences the metric, even an unevaluated one
            if weight == 0.0 {
                continue;
            }
            violation += metric.constraint_violation(self.worst_case_of(metric)) / range * weight;
        }

        if let Some(token) = cache_token {
            if violation.is_finite() {
                self.violations.insert(token, violation);
            }
        }
        violation
    }

    /// Pareto dominance over the objectives (metrics with
    /// `improve_past_feasible`).
    ///
    /// Only meaningful when `self` is feasible; rank infeasible individuals
    /// through [`constrained_dominates`](Self::constrained_dominates).
    pub fn dominates(&self, other: &Self) -> bool {
        debug_assert!(
            self.is_feasible(),
            "dominates() called on infeasible individual {}",
            self.id()
        );
        let mut strictly_better = false;
        for metric in self.problem.flattened_metrics() {
            if !metric.improve_past_feasible() {
                continue;
            }
            let mine = self.worst_case_of(metric);
            let theirs = other.worst_case_of(metric);
            if metric.is_better(theirs, mine) {
                return false;
            }
            if metric.is_better(mine, theirs) {
                strictly_better = true;
            }
        }
        strictly_better
    }

    /// Constrained Pareto dominance.
    ///
    /// Feasible beats infeasible; among infeasible individuals the smaller
    /// constraint violation wins; among feasible ones plain dominance decides.
    pub fn constrained_dominates(
        &self,
        other: &Self,
        minmax: &MinMaxMetrics,
        metric_weights: Option<&MetricWeights>,
        cache_token: Option<CacheToken>,
    ) -> bool {
        match (self.is_feasible(), other.is_feasible()) {
            (true, false) => true,
            (false, false) => {
                self.constraint_violation(minmax, metric_weights, cache_token)
                    < other.constraint_violation(minmax, metric_weights, cache_token)
            }
            (true, true) => self.dominates(other),
            (false, true) => false,
        }
    }

    /// Canonical string of all worst-case metric values, keyed by metric name.
    ///
    /// Two individuals with equal signatures are indistinguishable to ranking.
    pub fn worst_case_signature(&self) -> String {
        let values: BTreeMap<&str, MetricValue> = self
            .problem
            .flattened_metrics()
            .map(|m| (m.name(), self.worst_case_of(m)))
            .collect();
        let mut signature = String::new();
        for (name, value) in values {
            let _ = write!(signature, "{}={};", name, value);
        }
        signature
    }

    /// The frozen evaluation, built on first use once fully evaluated.
    fn frozen(&self) -> Option<&FrozenEvaluation> {
        if !self.fully_evaluated() {
            return None;
        }
        Some(self.frozen.get_or_init(|| {
            let worst_case: BTreeMap<String, MetricValue> = self
                .problem
                .flattened_metrics()
                .map(|m| (m.name().to_string(), self.compute_worst_case(m)))
                .collect();
            let feasible = self
                .problem
                .flattened_metrics()
                .all(|m| m.is_feasible(worst_case[m.name()]));
            FrozenEvaluation {
                worst_case,
                feasible,
            }
        }))
    }

    fn compute_worst_case(&self, metric: &Metric) -> MetricValue {
        let values: Vec<MetricValue> = self
            .sim_results
            .get(metric.name())
            .map(|slots| slots.values().flatten().copied().collect())
            .unwrap_or_default();
        metric.worst_case_value(&values)
    }

    fn compute_feasible(&self) -> bool {
        self.problem
            .flattened_metrics()
            .all(|m| m.is_feasible(self.compute_worst_case(m)))
    }

    fn invalidate_caches(&mut self) {
        self.frozen = OnceLock::new();
        self.violations.clear();
    }

    #[cfg(test)]
    pub(crate) fn is_frozen(&self) -> bool {
        self.frozen.get().is_some()
    }
}

impl<G: Genotype> Clone for Individual<G> {
    fn clone(&self) -> Self {
        Self {
            genotype: self.genotype.clone(),
            problem: Arc::clone(&self.problem),
            sim_requests_made: self.sim_requests_made.clone(),
            sim_results: self.sim_results.clone(),
            sim_waveforms: self.sim_waveforms.clone(),
            rank: self.rank,
            genetic_age: self.genetic_age,
            fully_evaluated: AtomicBool::new(self.fully_evaluated.load(Ordering::Relaxed)),
            frozen: self.frozen.clone(),
            violations: self.violations.clone(),
        }
    }
}

fn unknown_slot(problem: &ProblemSetup, analysis: AnalysisId, env_point: EnvPointId) -> SynthError {
    match problem.analysis(analysis) {
        Ok(_) => SynthError::UnknownEnvPoint {
            analysis,
            env_point,
        },
        Err(e) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Analysis, EnvPoint, ProblemSetup};

    #[derive(Clone, Debug)]
    struct TestGenotype(u64);

    impl Genotype for TestGenotype {
        fn id(&self) -> u64 {
            self.0
        }
    }

    const A0: AnalysisId = AnalysisId(0);
    const A1: AnalysisId = AnalysisId(1);
    const E0: EnvPointId = EnvPointId(0);
    const E1: EnvPointId = EnvPointId(1);

    /// gain (max, >= 60, objective) and power (min, <= 1, objective) from
    /// analysis 0 at two corners; vout (in 0.4..0.6) from analysis 1 at one.
    fn problem() -> Arc<ProblemSetup> {
        Arc::new(
            ProblemSetup::new(vec![
                Analysis::new(
                    A0,
                    vec![EnvPoint::new(E0), EnvPoint::new(E1)],
                    vec![
                        Metric::maximize("gain", 60.0, true),
                        Metric::minimize("power", 1.0, true),
                    ],
                ),
                Analysis::new(A1, vec![EnvPoint::new(E0)], vec![Metric::in_range("vout", 0.4, 0.6)]),
            ])
            .unwrap(),
        )
    }

    fn evaluated(id: u64, gain: [f64; 2], power: [f64; 2], vout: f64) -> Individual<TestGenotype> {
        let mut ind = Individual::new(TestGenotype(id), problem());
        for (i, env) in [E0, E1].into_iter().enumerate() {
            ind.report_sim_request(A0, env).unwrap();
            ind.set_sim_results(
                [("gain", gain[i]), ("power", power[i])],
                A0,
                env,
                None,
            )
            .unwrap();
        }
        ind.report_sim_request(A1, E0).unwrap();
        ind.set_sim_results([("vout", vout)], A1, E0, None).unwrap();
        ind
    }

    fn full_range() -> MinMaxMetrics {
        let mut mm = MinMaxMetrics::new();
        mm.insert("gain", 0.0, 100.0);
        mm.insert("power", 0.0, 2.0);
        mm.insert("vout", 0.0, 1.0);
        mm
    }

    #[test]
    fn test_fresh_individual() {
        let ind = Individual::new(TestGenotype(1), problem());
        assert!(!ind.is_bad());
        assert!(!ind.fully_evaluated());
        assert_eq!(ind.num_requests_made(), 0);
        assert!(!ind.sim_request_made(A0, E0));
        assert_eq!(ind.rank(), None);
        assert_eq!(ind.sim_result("gain", E0), None);
    }

    #[test]
    fn test_request_twice_fails() {
        let mut ind = Individual::new(TestGenotype(1), problem());
        ind.report_sim_request(A0, E0).unwrap();
        assert!(ind.sim_request_made(A0, E0));
        assert!(matches!(
            ind.report_sim_request(A0, E0),
            Err(SynthError::AlreadyRequested { .. })
        ));
    }

    #[test]
    fn test_unknown_slots() {
        let mut ind = Individual::new(TestGenotype(1), problem());
        assert!(matches!(
            ind.report_sim_request(AnalysisId(5), E0),
            Err(SynthError::UnknownAnalysis(_))
        ));
        assert!(matches!(
            ind.report_sim_request(A1, E1),
            Err(SynthError::UnknownEnvPoint { .. })
        ));
    }

    #[test]
    fn test_results_require_request() {
        let mut ind = Individual::new(TestGenotype(1), problem());
        let err = ind
            .set_sim_results([("gain", 70.0)], A0, E0, None)
            .unwrap_err();
        assert!(matches!(err, SynthError::RequestNotYetMade { .. }));
    }

    #[test]
    fn test_results_set_at_most_once() {
        let mut ind = Individual::new(TestGenotype(1), problem());
        ind.report_sim_request(A0, E0).unwrap();
        ind.set_sim_results([("gain", 70.0)], A0, E0, None)
            .unwrap();

        let err = ind
            .set_sim_results([("power", 0.5), ("gain", 71.0)], A0, E0, None)
            .unwrap_err();
        assert!(matches!(err, SynthError::ResultAlreadySet { .. }));
        // the failed call wrote nothing
        assert_eq!(ind.sim_result("power", E0), None);
        assert_eq!(ind.sim_result("gain", E0), Some(70.0.into()));

        // a metric not yet set at this env point is still accepted
        ind.set_sim_results([("power", 0.5)], A0, E0, None)
            .unwrap();
    }

    #[test]
    fn test_results_validate_metric_and_value() {
        let mut ind = Individual::new(TestGenotype(1), problem());
        ind.report_sim_request(A0, E0).unwrap();
        assert!(matches!(
            ind.set_sim_results([("vout", 0.5)], A0, E0, None),
            Err(SynthError::UnknownMetric(_))
        ));
        assert!(matches!(
            ind.set_sim_results([("gain", f64::NAN)], A0, E0, None),
            Err(SynthError::InvalidNumericValue(_))
        ));
        assert!(matches!(
            ind.set_sim_results([("gain", 1.0), ("gain", 2.0)], A0, E0, None),
            Err(SynthError::ResultAlreadySet { .. })
        ));
    }

    #[test]
    fn test_waveforms_set_at_most_once() {
        let mut ind = Individual::new(TestGenotype(1), problem());
        ind.report_sim_request(A0, E0).unwrap();
        let waves = vec![vec![0.0, 0.5, 1.0]];
        ind.set_sim_results([("gain", 70.0)], A0, E0, Some(waves.clone()))
            .unwrap();
        assert_eq!(ind.sim_waveforms(A0, E0), Some(&waves));

        let err = ind
            .set_sim_results([("power", 0.3)], A0, E0, Some(waves))
            .unwrap_err();
        assert!(matches!(err, SynthError::WaveformAlreadySet { .. }));
    }

    #[test]
    fn test_force_fully_bad() {
        let mut ind = Individual::new(TestGenotype(1), problem());
        ind.force_fully_bad();

        assert!(ind.is_bad());
        assert!(ind.fully_evaluated());
        assert!(!ind.is_feasible());
        assert_eq!(
            ind.constraint_violation(&full_range(), None, None),
            f64::INFINITY
        );
        assert_eq!(ind.worst_case_metric_value("gain").unwrap(), BAD_METRIC_VALUE);
    }

    #[test]
    fn test_fully_evaluated_is_monotone() {
        let mut ind = Individual::new(TestGenotype(1), problem());
        ind.report_sim_request(A0, E0).unwrap();
        ind.report_sim_request(A0, E1).unwrap();
        assert!(!ind.fully_evaluated());
        ind.report_sim_request(A1, E0).unwrap();
        assert!(ind.fully_evaluated());
        ind.set_sim_results([("vout", 0.5)], A1, E0, None)
            .unwrap();
        assert!(ind.fully_evaluated());
    }

    #[test]
    fn test_worst_case_aggregation() {
        let ind = evaluated(1, [70.0, 65.0], [0.2, 0.8], 0.5);
        assert_eq!(ind.worst_case_metric_value("gain").unwrap(), 65.0.into());
        assert_eq!(ind.worst_case_metric_value("power").unwrap(), 0.8.into());
        assert!(matches!(
            ind.worst_case_metric_value("slew"),
            Err(SynthError::UnknownMetric(_))
        ));
    }

    #[test]
    fn test_bad_value_propagates() {
        let mut ind = Individual::new(TestGenotype(1), problem());
        ind.report_sim_request(A0, E0).unwrap();
        ind.set_sim_results(
            [("gain", MetricValue::Value(70.0)), ("power", BAD_METRIC_VALUE)],
            A0,
            E0,
            None,
        )
        .unwrap();
        assert!(ind.is_bad());
        assert_eq!(ind.worst_case_metric_value("power").unwrap(), BAD_METRIC_VALUE);
        assert!(!ind.is_feasible());
        assert_eq!(
            ind.constraint_violation(&full_range(), None, None),
            f64::INFINITY
        );
    }

    #[test]
    fn test_caching_only_once_fully_evaluated() {
        let mut ind = Individual::new(TestGenotype(1), problem());
        ind.report_sim_request(A0, E0).unwrap();
        ind.set_sim_results([("gain", 70.0), ("power", 0.5)], A0, E0, None)
            .unwrap();
        let before = ind.worst_case_metric_value("gain").unwrap();
        assert!(!ind.is_frozen());

        let ind = evaluated(2, [70.0, 65.0], [0.2, 0.8], 0.5);
        let first = ind.worst_case_metric_value("gain").unwrap();
        assert!(ind.is_frozen());
        let second = ind.worst_case_metric_value("gain").unwrap();
        assert_eq!(first, second);
        assert_eq!(before, 70.0.into());
    }

    #[test]
    fn test_write_after_freeze_invalidates() {
        let mut ind = Individual::new(TestGenotype(1), problem());
        for env in [E0, E1] {
            ind.report_sim_request(A0, env).unwrap();
        }
        ind.report_sim_request(A1, E0).unwrap();
        ind.set_sim_results([("gain", 70.0)], A0, E0, None)
            .unwrap();
        assert_eq!(ind.worst_case_metric_value("gain").unwrap(), 70.0.into());
        assert!(ind.is_frozen());

        ind.set_sim_results([("gain", 61.0)], A0, E1, None)
            .unwrap();
        assert!(!ind.is_frozen());
        assert_eq!(ind.worst_case_metric_value("gain").unwrap(), 61.0.into());
    }

    #[test]
    fn test_feasibility() {
        assert!(evaluated(1, [70.0, 65.0], [0.2, 0.8], 0.5).is_feasible());
        assert!(!evaluated(2, [70.0, 55.0], [0.2, 0.8], 0.5).is_feasible());
        assert!(!evaluated(3, [70.0, 65.0], [0.2, 0.8], 0.7).is_feasible());
    }

    #[test]
    fn test_constraint_violation_normalized_and_weighted() {
        // gain misses by 10 over a range of 100, vout by 0.2 over a range of 1
        let ind = evaluated(1, [70.0, 50.0], [0.2, 0.8], 0.8);
        let mm = full_range();
        let cv = ind.constraint_violation(&mm, None, None);
        assert!((cv - 0.3).abs() < 1e-9);

        let mut weights = MetricWeights::new();
        weights.insert("vout".to_string(), 2.0);
        let weighted = ind.constraint_violation(&mm, Some(&weights), None);
        assert!((weighted - 0.5).abs() < 1e-9);

        let mut flat = mm.clone();
        flat.insert("vout", 0.5, 0.5);
        let skipped = ind.constraint_violation(&flat, None, None);
        assert!((skipped - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_constraint_violation_cache_is_per_token() {
        let ind = evaluated(1, [70.0, 50.0], [0.2, 0.8], 0.5);
        let token = CacheToken::fresh();
        let wide = full_range();
        let first = ind.constraint_violation(&wide, None, Some(token));
        assert!((first - 0.1).abs() < 1e-9);

        // same token answers from the cache even though the ranges changed
        let mut narrow = wide.clone();
        narrow.insert("gain", 0.0, 20.0);
        assert_eq!(ind.constraint_violation(&narrow, None, Some(token)), first);

        // a different token computes its own view
        let other = ind.constraint_violation(&narrow, None, Some(CacheToken::fresh()));
        assert!((other - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_dominates_uses_objectives_only() {
        let a = evaluated(1, [80.0, 80.0], [0.5, 0.5], 0.45);
        let b = evaluated(2, [70.0, 70.0], [0.5, 0.5], 0.5);
        let c = evaluated(3, [80.0, 80.0], [0.5, 0.5], 0.55);

        assert!(a.dominates(&b));
        assert!(!b.dominates(&a));
        // vout is a pure constraint: a and c tie on all objectives
        assert!(!a.dominates(&c));
        assert!(!c.dominates(&a));
    }

    #[test]
    fn test_constrained_dominates() {
        let mm = full_range();
        let feasible = evaluated(1, [61.0, 61.0], [0.9, 0.9], 0.5);
        let slightly_off = evaluated(2, [90.0, 59.0], [0.1, 0.1], 0.5);
        let far_off = evaluated(3, [90.0, 30.0], [0.1, 0.1], 0.5);
        let mut bad = Individual::new(TestGenotype(4), problem());
        bad.force_fully_bad();

        assert!(feasible.constrained_dominates(&slightly_off, &mm, None, None));
        assert!(!slightly_off.constrained_dominates(&feasible, &mm, None, None));
        assert!(slightly_off.constrained_dominates(&far_off, &mm, None, None));
        assert!(!far_off.constrained_dominates(&slightly_off, &mm, None, None));
        assert!(far_off.constrained_dominates(&bad, &mm, None, None));

        let mut bad2 = Individual::new(TestGenotype(5), problem());
        bad2.force_fully_bad();
        assert!(!bad.constrained_dominates(&bad2, &mm, None, None));
        assert!(!bad2.constrained_dominates(&bad, &mm, None, None));
    }

    #[test]
    fn test_signature() {
        let a = evaluated(1, [70.0, 65.0], [0.2, 0.8], 0.5);
        let b = evaluated(2, [65.0, 90.0], [0.8, 0.1], 0.5);
        assert_eq!(a.worst_case_signature(), b.worst_case_signature());
        assert_eq!(a.worst_case_signature(), "gain=65.0;power=0.8;vout=0.5;");
    }

    #[test]
    fn test_clone_keeps_caches() {
        let ind = evaluated(1, [70.0, 65.0], [0.2, 0.8], 0.5);
        let token = CacheToken::fresh();
        ind.constraint_violation(&full_range(), None, Some(token));
        assert!(ind.is_feasible());

        let copy = ind.clone();
        assert!(copy.is_frozen());
        assert!(copy.fully_evaluated());
        assert_eq!(copy.violations.len(), 1);
    }
}
