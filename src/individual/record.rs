use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use super::cache::{CacheToken, FrozenEvaluation, ViolationCache};
use super::{Individual, Waveforms};
use crate::error::{Result, SynthError};
use crate::genotype::Genotype;
use crate::problem::{AnalysisId, EnvPointId, MetricValue, ProblemSetup};

/// Serializable snapshot of an [`Individual`].
///
/// It carries everything except the problem setup, which is supplied again
/// by [`Individual::from_record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualRecord<G> {
    pub genotype: G,
    pub sim_requests_made: Vec<(AnalysisId, EnvPointId, bool)>,
    pub sim_results: Vec<(String, EnvPointId, MetricValue)>,
    pub sim_waveforms: Vec<(AnalysisId, EnvPointId, Waveforms)>,
    pub rank: Option<usize>,
    pub genetic_age: u32,
    pub fully_evaluated: bool,
    pub worst_case_cache: Option<BTreeMap<String, MetricValue>>,
    pub feasible_cache: Option<bool>,
    pub violation_cache: Vec<(CacheToken, f64)>,
}

impl<G: Genotype> Individual<G> {
    pub fn to_record(&self) -> IndividualRecord<G> {
        let mut sim_results: Vec<(String, EnvPointId, MetricValue)> = self
            .sim_results
            .iter()
            .flat_map(|(name, slots)| {
                slots
                    .iter()
                    .filter_map(move |(env, v)| v.map(|v| (name.clone(), *env, v)))
            })
            .collect();
        sim_results.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));
        let mut sim_waveforms: Vec<(AnalysisId, EnvPointId, Waveforms)> = self
            .sim_waveforms
            .iter()
            .map(|(&(a, e), w)| (a, e, w.clone()))
            .collect();
        sim_waveforms.sort_by_key(|w| (w.0, w.1));
        let mut violation_cache = self.violations.entries();
        violation_cache.sort_by_key(|(token, _)| *token);
        let frozen = self.frozen.get();

        IndividualRecord {
            genotype: self.genotype.clone(),
            sim_requests_made: self
                .sim_requests_made
                .iter()
                .map(|(&(a, e), &made)| (a, e, made))
                .collect(),
            sim_results,
            sim_waveforms,
            rank: self.rank,
            genetic_age: self.genetic_age,
            fully_evaluated: self.fully_evaluated.load(Ordering::Relaxed),
            worst_case_cache: frozen.map(|f| f.worst_case.clone()),
            feasible_cache: frozen.map(|f| f.feasible),
            violation_cache,
        }
    }

    /// Rebuilds an individual from a snapshot against a live problem setup.
    ///
    /// # Errors
    ///
    /// `Configuration` if the snapshot names a request or result slot the
    /// problem does not declare.
    pub fn from_record(record: IndividualRecord<G>, problem: Arc<ProblemSetup>) -> Result<Self> {
        let mut ind = Individual::new(record.genotype, problem);

        for (analysis, env_point, made) in record.sim_requests_made {
            let slot = ind
                .sim_requests_made
                .get_mut(&(analysis, env_point))
                .ok_or_else(|| {
                    SynthError::Configuration(format!(
                        "Checkpoint requests undeclared slot ({}, {})",
                        analysis, env_point
                    ))
                })?;
            *slot = made;
        }
        for (name, env_point, value) in record.sim_results {
            let slot = ind
                .sim_results
                .get_mut(&name)
                .and_then(|slots| slots.get_mut(&env_point))
                .ok_or_else(|| {
                    SynthError::Configuration(format!(
                        "Checkpoint holds result for undeclared slot ({}, {})",
                        name, env_point
                    ))
                })?;
            *slot = Some(value);
        }
        ind.sim_waveforms = record
            .sim_waveforms
            .into_iter()
            .map(|(a, e, w)| ((a, e), w))
            .collect();

        ind.rank = record.rank;
        ind.genetic_age = record.genetic_age;
        ind.fully_evaluated = AtomicBool::new(record.fully_evaluated);
        ind.frozen = match (record.worst_case_cache, record.feasible_cache) {
            (Some(worst_case), Some(feasible)) => OnceLock::from(FrozenEvaluation {
                worst_case,
                feasible,
            }),
            _ => OnceLock::new(),
        };
        ind.violations = ViolationCache::from_entries(record.violation_cache);
        Ok(ind)
    }
}
