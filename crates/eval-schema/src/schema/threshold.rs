//! Metric thresholds used to validate a candidate model
//!
//! # Example TOML
//!
//! ```toml
//! [metrics_specs.thresholds.auc.value_threshold]
//! lower_bound = 0.7
//!
//! [metrics_specs.thresholds.auc.change_threshold]
//! direction = "HIGHER_IS_BETTER"
//! absolute = -0.01
//! ```

use serde::{Deserialize, Serialize};

use super::slicing::{CrossSlicingSpec, SlicingSpec};

/// Absolute bounds on a metric value. Unset bounds are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericValueThreshold {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
}

/// Which way a metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    #[default]
    Unknown,
    HigherIsBetter,
    LowerIsBetter,
}

/// Bound on the change of a metric relative to the baseline model.
///
/// The sign of `absolute` / `relative` carries intent: with
/// `HigherIsBetter`, `-0.01` tolerates a regression of at most 0.01 while
/// `0.01` requires an improvement of at least 0.01.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericChangeThreshold {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative: Option<f64>,
    pub direction: Direction,
}

/// Validation rule for one metric. When both parts are set both must pass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricThreshold {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_threshold: Option<GenericValueThreshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_threshold: Option<GenericChangeThreshold>,
}

impl MetricThreshold {
    pub fn value(lower_bound: Option<f64>, upper_bound: Option<f64>) -> Self {
        Self {
            value_threshold: Some(GenericValueThreshold {
                lower_bound,
                upper_bound,
            }),
            change_threshold: None,
        }
    }

    pub fn absolute_change(direction: Direction, absolute: f64) -> Self {
        Self {
            value_threshold: None,
            change_threshold: Some(GenericChangeThreshold {
                absolute: Some(absolute),
                relative: None,
                direction,
            }),
        }
    }

    pub fn relative_change(direction: Direction, relative: f64) -> Self {
        Self {
            value_threshold: None,
            change_threshold: Some(GenericChangeThreshold {
                absolute: None,
                relative: Some(relative),
                direction,
            }),
        }
    }

    pub fn and(self, other: MetricThreshold) -> Self {
        Self {
            value_threshold: other.value_threshold.or(self.value_threshold),
            change_threshold: other.change_threshold.or(self.change_threshold),
        }
    }

    pub fn requires_baseline(&self) -> bool {
        self.change_threshold.is_some()
    }
}

/// A threshold applied only to the listed slices.
///
/// Slices are references to entries of `EvalConfig::slicing_specs`, not new
/// slice definitions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerSliceMetricThreshold {
    pub slicing_specs: Vec<SlicingSpec>,
    pub threshold: MetricThreshold,
}

/// A threshold applied to cross-slice comparisons.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossSliceMetricThreshold {
    pub cross_slicing_specs: Vec<CrossSlicingSpec>,
    pub threshold: MetricThreshold,
}
