//! Metric specifications
//!
//! A [`MetricsSpec`] is the unit of metric computation scope: which models
//! and outputs a group of metrics applies to, how multi-class outputs are
//! binarized or aggregated, and which thresholds validate the results.
//!
//! # Example TOML
//!
//! ```toml
//! [[metrics_specs]]
//! model_names = ["candidate", "baseline"]
//! output_names = ["head_a"]
//!
//! [[metrics_specs.metrics]]
//! class_name = "AUC"
//! config = { num_thresholds = 1000 }
//!
//! [metrics_specs.aggregate]
//! macro_average = true
//! class_weights = { "0" = 1.0, "1" = 2.0 }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::threshold::{CrossSliceMetricThreshold, MetricThreshold, PerSliceMetricThreshold};

/// How per-class binary metrics are rolled up into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationType {
    /// Pool examples of every class before computing the metric.
    Micro,
    /// Average per-class metrics.
    Macro,
    /// Average per-class metrics weighted by class weight.
    WeightedMacro,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Micro => "micro",
            AggregationType::Macro => "macro",
            AggregationType::WeightedMacro => "weighted_macro",
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregation of multi-class metrics.
///
/// On the wire the type is one of three booleans; exactly one must be true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AggregationOptionsWire", into = "AggregationOptionsWire")]
pub struct AggregationOptions {
    pub kind: AggregationType,
    /// Classes absent from the map weigh 0.
    pub class_weights: BTreeMap<i64, f64>,
    pub top_k_list: Vec<i64>,
}

impl AggregationOptions {
    pub fn new(kind: AggregationType) -> Self {
        Self {
            kind,
            class_weights: BTreeMap::new(),
            top_k_list: Vec::new(),
        }
    }

    pub fn with_class_weight(mut self, class_id: i64, weight: f64) -> Self {
        self.class_weights.insert(class_id, weight);
        self
    }

    pub fn with_top_k(mut self, top_k: i64) -> Self {
        self.top_k_list.push(top_k);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct AggregationOptionsWire {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    micro_average: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    macro_average: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    weighted_macro_average: bool,
    // String keys so that every format, TOML included, can carry class ids.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    class_weights: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    top_k_list: Vec<i64>,
}

impl TryFrom<AggregationOptionsWire> for AggregationOptions {
    type Error = String;

    fn try_from(wire: AggregationOptionsWire) -> std::result::Result<Self, Self::Error> {
        let kind = match (
            wire.micro_average,
            wire.macro_average,
            wire.weighted_macro_average,
        ) {
            (true, false, false) => AggregationType::Micro,
            (false, true, false) => AggregationType::Macro,
            (false, false, true) => AggregationType::WeightedMacro,
            _ => {
                return Err(
                    "exactly one of micro_average, macro_average and weighted_macro_average must be true"
                        .to_string(),
                );
            }
        };

        let mut class_weights = BTreeMap::new();
        let mut seen: BTreeMap<i64, String> = BTreeMap::new();
        for (key, weight) in wire.class_weights {
            let id = key
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("class_weights key '{key}' is not an integer class id"))?;
            if let Some(previous) = seen.get(&id) {
                return Err(format!(
                    "class_weights keys '{previous}' and '{key}' both name class id {id}"
                ));
            }
            seen.insert(id, key);
            class_weights.insert(id, weight);
        }

        Ok(Self {
            kind,
            class_weights,
            top_k_list: wire.top_k_list,
        })
    }
}

impl From<AggregationOptions> for AggregationOptionsWire {
    fn from(options: AggregationOptions) -> Self {
        Self {
            micro_average: options.kind == AggregationType::Micro,
            macro_average: options.kind == AggregationType::Macro,
            weighted_macro_average: options.kind == AggregationType::WeightedMacro,
            class_weights: options
                .class_weights
                .into_iter()
                .map(|(id, weight)| (id.to_string(), weight))
                .collect(),
            top_k_list: options.top_k_list,
        }
    }
}

/// Fans a multi-class metric out into one binary metric per entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarizationOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub class_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub k_list: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_k_list: Vec<i64>,
}

impl BinarizationOptions {
    pub fn is_empty(&self) -> bool {
        self.class_ids.is_empty() && self.k_list.is_empty() && self.top_k_list.is_empty()
    }
}

/// Whether metrics are computed weighted, unweighted, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExampleWeightOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unweighted: Option<bool>,
}

impl ExampleWeightOptions {
    pub fn is_unset(&self) -> bool {
        self.weighted.is_none() && self.unweighted.is_none()
    }
}

/// One metric computed by the evaluation engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    pub class_name: String,
    /// Registry module to look the class up in. Searched in registry order when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Constructor parameters, type-checked against the metric registry.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<MetricThreshold>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub per_slice_thresholds: Vec<PerSliceMetricThreshold>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cross_slice_thresholds: Vec<CrossSliceMetricThreshold>,
}

impl MetricConfig {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Self::default()
        }
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(name.into(), value);
        self
    }

    pub fn with_threshold(mut self, threshold: MetricThreshold) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_per_slice_threshold(mut self, threshold: PerSliceMetricThreshold) -> Self {
        self.per_slice_thresholds.push(threshold);
        self
    }

    pub fn with_cross_slice_threshold(mut self, threshold: CrossSliceMetricThreshold) -> Self {
        self.cross_slice_thresholds.push(threshold);
        self
    }

    pub fn has_thresholds(&self) -> bool {
        self.threshold.is_some()
            || !self.per_slice_thresholds.is_empty()
            || !self.cross_slice_thresholds.is_empty()
    }
}

/// A group of metrics sharing model / output scope and options.
///
/// The threshold maps are keyed by metric name and cover metrics the model
/// computes itself as well as those listed in `metrics`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSpec {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricConfig>,
    /// Empty means every model.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub model_names: Vec<String>,
    /// Empty means every output.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output_names: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub output_weights: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binarize: Option<BinarizationOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregationOptions>,
    #[serde(skip_serializing_if = "ExampleWeightOptions::is_unset")]
    pub example_weights: ExampleWeightOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_key: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub thresholds: BTreeMap<String, MetricThreshold>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub per_slice_thresholds: BTreeMap<String, Vec<PerSliceMetricThreshold>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub cross_slice_thresholds: BTreeMap<String, Vec<CrossSliceMetricThreshold>>,
}

impl MetricsSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metric(mut self, metric: MetricConfig) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn for_models<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn for_outputs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_threshold(mut self, metric: impl Into<String>, threshold: MetricThreshold) -> Self {
        self.thresholds.insert(metric.into(), threshold);
        self
    }

    pub fn with_per_slice_threshold(
        mut self,
        metric: impl Into<String>,
        threshold: PerSliceMetricThreshold,
    ) -> Self {
        self.per_slice_thresholds
            .entry(metric.into())
            .or_default()
            .push(threshold);
        self
    }

    pub fn with_cross_slice_threshold(
        mut self,
        metric: impl Into<String>,
        threshold: CrossSliceMetricThreshold,
    ) -> Self {
        self.cross_slice_thresholds
            .entry(metric.into())
            .or_default()
            .push(threshold);
        self
    }

    pub fn with_aggregate(mut self, aggregate: AggregationOptions) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    pub fn with_binarize(mut self, binarize: BinarizationOptions) -> Self {
        self.binarize = Some(binarize);
        self
    }

    /// Every threshold declared in this spec, spec-level maps and per-metric.
    pub fn all_thresholds(&self) -> impl Iterator<Item = &MetricThreshold> {
        let spec_level = self
            .thresholds
            .values()
            .chain(self.per_slice_thresholds.values().flatten().map(|t| &t.threshold))
            .chain(self.cross_slice_thresholds.values().flatten().map(|t| &t.threshold));
        let metric_level = self.metrics.iter().flat_map(|m| {
            m.threshold
                .iter()
                .chain(m.per_slice_thresholds.iter().map(|t| &t.threshold))
                .chain(m.cross_slice_thresholds.iter().map(|t| &t.threshold))
        });
        spec_level.chain(metric_level)
    }

    pub fn has_cross_slice_thresholds(&self) -> bool {
        self.cross_slice_thresholds.values().any(|v| !v.is_empty())
            || self
                .metrics
                .iter()
                .any(|m| !m.cross_slice_thresholds.is_empty())
    }
}
