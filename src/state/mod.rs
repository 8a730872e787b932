//! # SynthState
//!
//! Checkpointable state of a synthesis run: generation counter, evaluation
//! counters and the age-layered population.
//!
//! The problem setup and the solution strategy are shared handles that are
//! not persisted. [`SynthState::save`] writes a [`SynthStateRecord`], which
//! has no field for either, and [`load_synth_state`] attaches the caller's
//! problem setup to the restored state and to every individual in it.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, IntoInnerError, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ResultExt};
use crate::genotype::Genotype;
use crate::individual::{Individual, IndividualRecord};
use crate::population::AgeLayeredPop;
use crate::problem::{AnalysisId, ProblemSetup};
use crate::strategy::SolutionStrategy;

#[derive(Debug, Clone)]
pub struct SynthState<G: Genotype> {
    generation: u64,
    tot_num_inds: u64,
    num_evaluations_per_analysis: BTreeMap<AnalysisId, u64>,
    pop: AgeLayeredPop<G>,
    problem: Arc<ProblemSetup>,
    strategy: Option<Arc<SolutionStrategy>>,
}

/// Serializable form of a [`SynthState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthStateRecord<G> {
    pub generation: u64,
    pub tot_num_inds: u64,
    pub num_evaluations_per_analysis: BTreeMap<AnalysisId, u64>,
    pub layers: Vec<Vec<IndividualRecord<G>>>,
}

impl<G: Genotype> SynthState<G> {
    /// Starts a run at generation 0 with an empty population and a zero
    /// evaluation count for every analysis of `problem`.
    pub fn new(problem: Arc<ProblemSetup>, strategy: Option<Arc<SolutionStrategy>>) -> Self {
        let num_evaluations_per_analysis = problem.analyses().iter().map(|a| (a.id(), 0)).collect();
        Self {
            generation: 0,
            tot_num_inds: 0,
            num_evaluations_per_analysis,
            pop: AgeLayeredPop::new(),
            problem,
            strategy,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tot_num_inds(&self) -> u64 {
        self.tot_num_inds
    }

    pub fn num_evaluations_per_analysis(&self) -> &BTreeMap<AnalysisId, u64> {
        &self.num_evaluations_per_analysis
    }

    pub fn num_evaluations(&self, analysis: AnalysisId) -> u64 {
        self.num_evaluations_per_analysis
            .get(&analysis)
            .copied()
            .unwrap_or(0)
    }

    pub fn pop(&self) -> &AgeLayeredPop<G> {
        &self.pop
    }

    pub fn pop_mut(&mut self) -> &mut AgeLayeredPop<G> {
        &mut self.pop
    }

    pub fn set_pop(&mut self, pop: AgeLayeredPop<G>) {
        self.pop = pop;
    }

    pub fn problem(&self) -> &Arc<ProblemSetup> {
        &self.problem
    }

    pub fn strategy(&self) -> Option<&Arc<SolutionStrategy>> {
        self.strategy.as_ref()
    }

    pub fn attach_strategy(&mut self, strategy: Arc<SolutionStrategy>) {
        self.strategy = Some(strategy);
    }

    /// Counts one simulation of `analysis`.
    pub fn record_evaluation(&mut self, analysis: AnalysisId) {
        *self.num_evaluations_per_analysis.entry(analysis).or_insert(0) += 1;
    }

    pub fn total_num_evaluations(&self) -> u64 {
        self.num_evaluations_per_analysis.values().sum()
    }

    pub fn advance_generation(&mut self) {
        self.generation += 1;
    }

    /// Counts `n` newly created individuals.
    pub fn note_new_individuals(&mut self, n: u64) {
        self.tot_num_inds += n;
    }

    pub fn to_record(&self) -> SynthStateRecord<G> {
        SynthStateRecord {
            generation: self.generation,
            tot_num_inds: self.tot_num_inds,
            num_evaluations_per_analysis: self.num_evaluations_per_analysis.clone(),
            layers: self
                .pop
                .layers()
                .iter()
                .map(|layer| layer.iter().map(Individual::to_record).collect())
                .collect(),
        }
    }

    /// Rebuilds a state from `record`, attaching `problem` to it and to every
    /// individual. No strategy is attached.
    pub fn from_record(record: SynthStateRecord<G>, problem: Arc<ProblemSetup>) -> Result<Self> {
        let layers = record
            .layers
            .into_iter()
            .map(|layer| {
                layer
                    .into_iter()
                    .map(|ind| Individual::from_record(ind, Arc::clone(&problem)))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            generation: record.generation,
            tot_num_inds: record.tot_num_inds,
            num_evaluations_per_analysis: record.num_evaluations_per_analysis,
            pop: AgeLayeredPop::from_layers(layers),
            problem,
            strategy: None,
        })
    }

    /// Writes the state to `path` as JSON.
    ///
    /// The record goes to a sibling `.tmp` file first, which is then renamed
    /// over `path`, so an existing checkpoint survives a failed save.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be created, written or renamed,
    /// `Serialization` if encoding fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>
    where
        G: Serialize,
    {
        let path = path.as_ref();
        let tmp = temp_path(path);
        if let Err(err) = self.write_record(&tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
        fs::rename(&tmp, path)?;
        info!(
            path = %path.display(),
            generation = self.generation,
            num_inds = self.pop.num_inds(),
            "saved synthesis state"
        );
        Ok(())
    }

    fn write_record(&self, path: &Path) -> Result<()>
    where
        G: Serialize,
    {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &self.to_record())?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(IntoInnerError::into_error)?
            .sync_all()?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Reads a state written by [`SynthState::save`] and attaches `problem`.
///
/// # Errors
///
/// `Io` or `Serialization` if the file cannot be read or decoded, and an
/// `Other` error naming the file if an individual does not fit `problem`.
pub fn load_synth_state<G, P>(path: P, problem: Arc<ProblemSetup>) -> Result<SynthState<G>>
where
    G: Genotype + DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let record: SynthStateRecord<G> = serde_json::from_reader(reader)?;
    let state = SynthState::from_record(record, problem)
        .context(format!("restoring {}", path.display()))?;
    info!(
        path = %path.display(),
        generation = state.generation,
        num_inds = state.pop.num_inds(),
        "loaded synthesis state"
    );
    Ok(state)
}
