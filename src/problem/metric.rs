use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};

/// The outcome of measuring one metric at one environmental corner.
///
/// `Bad` marks an unusable outcome (simulator failure, non-convergence,
/// broken netlist). It is data, not an error: it compares worse than any
/// number, is never feasible and has infinite constraint violation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    Value(f64),
    Bad,
}

/// The sentinel stored for failed evaluations.
pub const BAD_METRIC_VALUE: MetricValue = MetricValue::Bad;

impl MetricValue {
    pub fn is_bad(&self) -> bool {
        matches!(self, MetricValue::Bad)
    }

    /// Returns the numeric value, or `None` for `Bad`.
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(*v),
            MetricValue::Bad => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Value(v)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Value(v) => write!(f, "{:?}", v),
            MetricValue::Bad => write!(f, "BAD_METRIC_VALUE"),
        }
    }
}

/// Direction a metric is pushed in, derived from its thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricAim {
    /// Only a lower threshold: bigger is better.
    Maximize,
    /// Only an upper threshold: smaller is better.
    Minimize,
    /// Both thresholds finite: anything inside the window is equally good.
    InRange,
}

/// A measured quantity with a feasibility window.
///
/// Every metric is a constraint (`min_threshold <= value <= max_threshold`).
/// When `improve_past_feasible` is set it is also an objective: once feasible,
/// better values still count for dominance.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    name: String,
    min_threshold: f64,
    max_threshold: f64,
    improve_past_feasible: bool,
}

impl Metric {
    pub fn new<S: Into<String>>(
        name: S,
        min_threshold: f64,
        max_threshold: f64,
        improve_past_feasible: bool,
    ) -> Self {
        Self {
            name: name.into(),
            min_threshold,
            max_threshold,
            improve_past_feasible,
        }
    }

    /// A metric that must be at least `threshold`; larger is better.
    pub fn maximize<S: Into<String>>(name: S, threshold: f64, improve_past_feasible: bool) -> Self {
        Self::new(name, threshold, f64::INFINITY, improve_past_feasible)
    }

    /// A metric that must be at most `threshold`; smaller is better.
    pub fn minimize<S: Into<String>>(name: S, threshold: f64, improve_past_feasible: bool) -> Self {
        Self::new(name, f64::NEG_INFINITY, threshold, improve_past_feasible)
    }

    /// A pure constraint that must land inside `[low, high]`.
    pub fn in_range<S: Into<String>>(name: S, low: f64, high: f64) -> Self {
        Self::new(name, low, high, false)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_threshold(&self) -> f64 {
        self.min_threshold
    }

    pub fn max_threshold(&self) -> f64 {
        self.max_threshold
    }

    pub fn improve_past_feasible(&self) -> bool {
        self.improve_past_feasible
    }

    pub fn aim(&self) -> MetricAim {
        match (self.min_threshold.is_finite(), self.max_threshold.is_finite()) {
            (true, false) => MetricAim::Maximize,
            (false, true) => MetricAim::Minimize,
            _ => MetricAim::InRange,
        }
    }

    /// Checks that the thresholds describe a usable metric.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(SynthError::Configuration(
                "Metric name cannot be empty".to_string(),
            ));
        }
        if self.min_threshold.is_nan() || self.max_threshold.is_nan() {
            return Err(SynthError::Configuration(format!(
                "Metric '{}' has a NaN threshold",
                self.name
            )));
        }
        if self.min_threshold > self.max_threshold {
            return Err(SynthError::Configuration(format!(
                "Metric '{}' has min_threshold {} above max_threshold {}",
                self.name, self.min_threshold, self.max_threshold
            )));
        }
        if !self.min_threshold.is_finite() && !self.max_threshold.is_finite() {
            return Err(SynthError::Configuration(format!(
                "Metric '{}' needs at least one finite threshold",
                self.name
            )));
        }
        if self.improve_past_feasible && self.aim() == MetricAim::InRange {
            return Err(SynthError::Configuration(format!(
                "Metric '{}' is an objective but has no direction (both thresholds finite)",
                self.name
            )));
        }
        Ok(())
    }

    pub fn is_feasible(&self, value: MetricValue) -> bool {
        match value {
            MetricValue::Bad => false,
            MetricValue::Value(v) => self.min_threshold <= v && v <= self.max_threshold,
        }
    }

    /// Returns true if `a` is strictly better than `b`.
    pub fn is_better(&self, a: MetricValue, b: MetricValue) -> bool {
        match (a, b) {
            (MetricValue::Bad, _) => false,
            (MetricValue::Value(_), MetricValue::Bad) => true,
            (MetricValue::Value(x), MetricValue::Value(y)) => match self.aim() {
                MetricAim::Maximize => x > y,
                MetricAim::Minimize => x < y,
                MetricAim::InRange => self.raw_violation(x) < self.raw_violation(y),
            },
        }
    }

    /// Aggregates the values measured at several env points into the one
    /// that is worst for this metric.
    ///
    /// Any `Bad` input, or no input at all, yields `Bad`.
    pub fn worst_case_value(&self, values: &[MetricValue]) -> MetricValue {
        let mut worst: Option<f64> = None;
        for value in values {
            let v = match value {
                MetricValue::Bad => return MetricValue::Bad,
                MetricValue::Value(v) => *v,
            };
            worst = Some(match worst {
                None => v,
                Some(w) if self.is_better(MetricValue::Value(w), MetricValue::Value(v)) => v,
                Some(w) => w,
            });
        }
        worst.map_or(MetricValue::Bad, MetricValue::Value)
    }

    /// Distance from `value` to the feasibility window; zero when feasible.
    pub fn constraint_violation(&self, value: MetricValue) -> f64 {
        match value {
            MetricValue::Bad => f64::INFINITY,
            MetricValue::Value(v) => self.raw_violation(v),
        }
    }

    fn raw_violation(&self, v: f64) -> f64 {
        if v < self.min_threshold {
            self.min_threshold - v
        } else if v > self.max_threshold {
            v - self.max_threshold
        } else {
            0.0
        }
    }
}
