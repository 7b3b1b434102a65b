//! Run-wide evaluation options

use serde::{Deserialize, Serialize};

/// Resampling method used to compute confidence intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceIntervalMethod {
    #[default]
    Jackknife,
    PoissonBootstrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceIntervalOptions {
    pub method: ConfidenceIntervalMethod,
}

/// Run-wide toggles.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Defaults to true when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_default_metrics: Option<bool>,
    pub compute_confidence_intervals: bool,
    pub confidence_intervals: ConfidenceIntervalOptions,
    /// Slices with fewer examples are dropped. Defaults to 1 when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_slice_size: Option<u32>,
    /// Output kinds not to write. Unrecognized names are ignored.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disabled_outputs: Vec<String>,
}

impl Options {
    pub fn include_default_metrics(&self) -> bool {
        self.include_default_metrics.unwrap_or(true)
    }

    pub fn min_slice_size(&self) -> u32 {
        self.min_slice_size.unwrap_or(1)
    }
}
