//! The root evaluation configuration
//!
//! # Example TOML
//!
//! ```toml
//! [[model_specs]]
//! name = "candidate"
//! label_key = "label"
//!
//! [[model_specs]]
//! name = "baseline"
//! label_key = "label"
//! is_baseline = true
//!
//! [[slicing_specs]]
//!
//! [[slicing_specs]]
//! feature_keys = ["country"]
//!
//! [[metrics_specs]]
//! metrics = [{ class_name = "AUC" }, { class_name = "ExampleCount" }]
//!
//! [metrics_specs.thresholds.auc.change_threshold]
//! direction = "HIGHER_IS_BETTER"
//! absolute = -0.01
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::schema::{CrossSlicingSpec, MetricsSpec, ModelSpec, Options, SlicingSpec};
use crate::store::ConfigStore;

/// Everything an evaluation run is configured with.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub model_specs: Vec<ModelSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slicing_specs: Vec<SlicingSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cross_slicing_specs: Vec<CrossSlicingSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics_specs: Vec<MetricsSpec>,
    pub options: Options,
}

impl EvalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, spec: ModelSpec) -> Self {
        self.model_specs.push(spec);
        self
    }

    pub fn with_slice(mut self, spec: SlicingSpec) -> Self {
        self.slicing_specs.push(spec);
        self
    }

    pub fn with_cross_slice(mut self, spec: CrossSlicingSpec) -> Self {
        self.cross_slicing_specs.push(spec);
        self
    }

    pub fn with_metrics(mut self, spec: MetricsSpec) -> Self {
        self.metrics_specs.push(spec);
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// The model marked as baseline, if exactly one is.
    pub fn baseline_model(&self) -> Option<&ModelSpec> {
        let mut baselines = self.model_specs.iter().filter(|m| m.is_baseline);
        match (baselines.next(), baselines.next()) {
            (Some(model), None) => Some(model),
            _ => None,
        }
    }

    /// Models that are evaluated as candidates.
    pub fn candidate_models(&self) -> impl Iterator<Item = &ModelSpec> {
        self.model_specs.iter().filter(|m| !m.is_baseline)
    }
}

/// Load an [`EvalConfig`] from a TOML, JSON or YAML file.
pub fn load_eval_config(path: impl AsRef<Path>) -> Result<EvalConfig> {
    ConfigStore::new().load(path.as_ref())
}
