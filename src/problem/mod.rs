//! # Problem Setup
//!
//! The description of what is being optimized: a list of analyses (testbenches),
//! each simulated at a list of environmental corners and producing a list of
//! metrics. The ranking core reads this structure but never builds netlists or
//! runs simulators itself.
//!
//! ```rust
//! use paretosynth::problem::{Analysis, AnalysisId, EnvPoint, EnvPointId, Metric, ProblemSetup};
//!
//! let ac = Analysis::new(
//!     AnalysisId(0),
//!     vec![EnvPoint::new(EnvPointId(0)), EnvPoint::new(EnvPointId(1))],
//!     vec![
//!         Metric::maximize("gain", 60.0, true),
//!         Metric::minimize("power", 1e-3, true),
//!     ],
//! );
//! let problem = ProblemSetup::new(vec![ac]).unwrap();
//! assert_eq!(problem.num_metrics(), 2);
//! assert!(problem.metric("gain").is_some());
//! ```

mod metric;

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result, SynthError};

pub use metric::{Metric, MetricAim, MetricValue, BAD_METRIC_VALUE};

/// Identifies an analysis within a problem setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnalysisId(pub u32);

/// Identifies an environmental/process corner within an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnvPointId(pub u32);

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EnvPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An environmental corner (temperature, supply, process) an analysis is run at.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvPoint {
    id: EnvPointId,
}

impl EnvPoint {
    pub fn new(id: EnvPointId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> EnvPointId {
        self.id
    }
}

/// One simulation setup, run at every one of its env points, yielding its metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    id: AnalysisId,
    env_points: Vec<EnvPoint>,
    metrics: Vec<Metric>,
}

impl Analysis {
    pub fn new(id: AnalysisId, env_points: Vec<EnvPoint>, metrics: Vec<Metric>) -> Self {
        Self {
            id,
            env_points,
            metrics,
        }
    }

    pub fn id(&self) -> AnalysisId {
        self.id
    }

    pub fn env_points(&self) -> &[EnvPoint] {
        &self.env_points
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn has_env_point(&self, env_point: EnvPointId) -> bool {
        self.env_points.iter().any(|e| e.id == env_point)
    }

    pub fn has_metric(&self, name: &str) -> bool {
        self.metrics.iter().any(|m| m.name() == name)
    }
}

/// The validated set of analyses an individual is evaluated against.
///
/// Shared between individuals as `Arc<ProblemSetup>`. It is deliberately not
/// serializable: checkpoints store individuals without it and reattach a live
/// problem on load.
#[derive(Debug, Clone)]
pub struct ProblemSetup {
    analyses: Vec<Analysis>,
    /// metric name -> (analysis index, metric index)
    metric_index: HashMap<String, (usize, usize)>,
}

impl ProblemSetup {
    /// Validates `analyses` and builds a problem setup.
    ///
    /// # Errors
    ///
    /// Returns `SynthError::Configuration` if there are no analyses, analysis
    /// ids repeat, an analysis has no env points or repeats one, metric names
    /// repeat across the problem, or any metric fails [`Metric::validate`].
    pub fn new(analyses: Vec<Analysis>) -> Result<Self> {
        if analyses.is_empty() {
            return Err(SynthError::Configuration(
                "Problem setup needs at least one analysis".to_string(),
            ));
        }

        let mut analysis_ids = HashSet::new();
        let mut metric_index = HashMap::new();

        for (a_idx, analysis) in analyses.iter().enumerate() {
            if !analysis_ids.insert(analysis.id) {
                return Err(SynthError::Configuration(format!(
                    "Duplicate analysis id {}",
                    analysis.id
                )));
            }
            if analysis.env_points.is_empty() {
                return Err(SynthError::Configuration(format!(
                    "Analysis {} has no env points",
                    analysis.id
                )));
            }
            let mut env_ids = HashSet::new();
            for env_point in &analysis.env_points {
                if !env_ids.insert(env_point.id) {
                    return Err(SynthError::Configuration(format!(
                        "Analysis {} repeats env point {}",
                        analysis.id, env_point.id
                    )));
                }
            }
            for (m_idx, metric) in analysis.metrics.iter().enumerate() {
                metric.validate()?;
                if metric_index
                    .insert(metric.name().to_string(), (a_idx, m_idx))
                    .is_some()
                {
                    return Err(SynthError::Configuration(format!(
                        "Metric '{}' is declared more than once",
                        metric.name()
                    )));
                }
            }
        }

        Ok(Self {
            analyses,
            metric_index,
        })
    }

    pub fn analyses(&self) -> &[Analysis] {
        &self.analyses
    }

    pub fn analysis(&self, id: AnalysisId) -> Result<&Analysis> {
        self.analyses
            .iter()
            .find(|a| a.id == id)
            .ok_or_else_synth(|| SynthError::UnknownAnalysis(id))
    }

    /// All metrics of all analyses, in analysis order then declaration order.
    pub fn flattened_metrics(&self) -> impl Iterator<Item = &Metric> + '_ {
        self.analyses.iter().flat_map(|a| a.metrics.iter())
    }

    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metric_index
            .get(name)
            .map(|&(a, m)| &self.analyses[a].metrics[m])
    }

    /// The analysis that produces metric `name`.
    pub fn analysis_of_metric(&self, name: &str) -> Option<&Analysis> {
        self.metric_index.get(name).map(|&(a, _)| &self.analyses[a])
    }

    pub fn num_metrics(&self) -> usize {
        self.metric_index.len()
    }

    /// Number of (analysis, env point) pairs an individual has to be simulated at.
    pub fn num_sim_slots(&self) -> usize {
        self.analyses.iter().map(|a| a.env_points.len()).sum()
    }
}
