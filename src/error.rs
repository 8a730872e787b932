//! # Error Types
//!
//! This module defines the error type shared by the whole crate.
//!
//! Errors fall into three groups:
//!
//! - **Precondition violations** raised by [`Individual`](crate::individual::Individual)
//!   bookkeeping (`AlreadyRequested`, `RequestNotYetMade`, `ResultAlreadySet`,
//!   `WaveformAlreadySet`). They signal a scheduling bug in whatever drives the
//!   evaluations and are never retried.
//! - **Construction errors** (`Configuration`, unknown ids) raised when a
//!   problem setup or strategy is malformed.
//! - **Persistence errors** (`Io`, `Serialization`) raised by checkpointing.
//!
//! A failed simulation is *not* an error: it is recorded as
//! [`MetricValue::Bad`](crate::problem::MetricValue::Bad) and flows through
//! aggregation and ranking as data.
//!
//! ## Examples
//!
//! Using the `Result` type:
//!
//! ```rust
//! use paretosynth::error::{Result, SynthError};
//!
//! fn check_layer_count(n: usize) -> Result<usize> {
//!     if n == 0 {
//!         return Err(SynthError::Configuration("need at least one layer".into()));
//!     }
//!     Ok(n)
//! }
//!
//! assert!(check_layer_count(0).is_err());
//! ```
//!
//! Using the `OptionExt` trait to convert `Option` to `Result`:
//!
//! ```rust
//! use paretosynth::error::{OptionExt, SynthError};
//!
//! fn first_name(names: &[&str]) -> paretosynth::error::Result<String> {
//!     names
//!         .first()
//!         .map(|s| s.to_string())
//!         .ok_or_else_synth(|| SynthError::UnknownMetric("<none>".into()))
//! }
//! ```

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

use crate::problem::{AnalysisId, EnvPointId};

/// Represents errors that can occur while tracking, ranking or persisting
/// individuals.
#[derive(Error, Debug)]
pub enum SynthError {
    /// A simulation request was reported twice for the same analysis/env point.
    #[error("Simulation already requested for analysis {analysis}, env point {env_point}")]
    AlreadyRequested {
        analysis: AnalysisId,
        env_point: EnvPointId,
    },

    /// Results were delivered for an analysis/env point that was never requested.
    #[error("No simulation request made for analysis {analysis}, env point {env_point}")]
    RequestNotYetMade {
        analysis: AnalysisId,
        env_point: EnvPointId,
    },

    /// A metric value was delivered twice for the same env point.
    #[error("Result for metric '{metric}' at env point {env_point} is already set")]
    ResultAlreadySet {
        metric: String,
        env_point: EnvPointId,
    },

    /// Waveforms were delivered twice for the same analysis/env point.
    #[error("Waveforms for analysis {analysis}, env point {env_point} are already set")]
    WaveformAlreadySet {
        analysis: AnalysisId,
        env_point: EnvPointId,
    },

    /// The analysis id is not part of the problem setup.
    #[error("Unknown analysis: {0}")]
    UnknownAnalysis(AnalysisId),

    /// The env point id is not part of the given analysis.
    #[error("Unknown env point {env_point} in analysis {analysis}")]
    UnknownEnvPoint {
        analysis: AnalysisId,
        env_point: EnvPointId,
    },

    /// The metric name is not part of the problem setup (or of the analysis
    /// it was reported for).
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Error that occurs when an invalid problem setup or strategy is provided.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error that occurs when NaN or infinity values are reported as metric values.
    #[error("Invalid numeric value: {0}")]
    InvalidNumericValue(String),

    /// Error that occurs when an I/O operation fails.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error that occurs when a checkpoint cannot be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A generic error with a custom message.
    #[error("{0}")]
    Other(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, SynthError>;

/// Extension trait for Result to add context to errors.
///
/// ## Examples
///
/// ```rust
/// use paretosynth::error::ResultExt;
/// use std::fs::File;
///
/// fn open_checkpoint(path: &str) -> paretosynth::error::Result<()> {
///     File::open(path).context("Failed to open checkpoint")?;
///     Ok(())
/// }
/// ```
pub trait ResultExt<T, E> {
    /// Converts the error to a `SynthError::Other` prefixed with `context`.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| SynthError::Other(format!("{}: {}", context, e)))
    }
}

/// Extension trait for Option to convert to Result with a custom error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, SynthError>` using
    /// a closure to generate the error.
    fn ok_or_else_synth<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> SynthError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_else_synth<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> SynthError,
    {
        self.ok_or_else(err_fn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_messages_name_the_slot() {
        let err = SynthError::AlreadyRequested {
            analysis: AnalysisId(3),
            env_point: EnvPointId(7),
        };
        let msg = err.to_string();
        assert!(msg.contains("analysis 3"));
        assert!(msg.contains("env point 7"));

        let err = SynthError::ResultAlreadySet {
            metric: "gain".into(),
            env_point: EnvPointId(1),
        };
        assert!(err.to_string().contains("'gain'"));
    }

    #[test]
    fn test_context_wraps_io_error() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = res.context("loading checkpoint").unwrap_err();
        assert_eq!(err.to_string(), "loading checkpoint: missing");
    }

    #[test]
    fn test_io_error_converts() {
        fn open() -> Result<std::fs::File> {
            Ok(std::fs::File::open("/definitely/not/here.json")?)
        }
        assert!(matches!(open(), Err(SynthError::Io(_))));
    }
}
