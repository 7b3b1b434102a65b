//! The resolved evaluation plan
//!
//! A [`ResolvedPlan`] is what an evaluation engine consumes: every default
//! applied, every key and reference resolved, every threshold bound to a
//! concrete metric key. It has no unset-means-something fields left.

use std::collections::{BTreeMap, BTreeSet};

use eval_schema::ParamValue;
use eval_schema::schema::{
    AggregationType, BinarizationOptions, ConfidenceIntervalMethod, CrossSlicingSpec, ModelType,
    PaddingOptions, SlicingSpec,
};
use serde::Serialize;

use crate::aggregation::{ResolvedAggregation, SubKey};
use crate::decision::{ThresholdOutcome, evaluate_threshold};
use crate::features::FeatureSource;
use crate::keys::{KeyConcern, ResolvedOutputKeys};
use crate::outputs::OutputKind;
use crate::thresholds::{MetricKey, ResolvedThreshold, ThresholdScope};

/// A model with every output's keys resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedModel {
    pub name: String,
    pub model_type: Option<ModelType>,
    pub signature_name: Option<String>,
    pub preprocessing_function_names: Vec<String>,
    pub is_baseline: bool,
    /// Output name to keys. The default output is `""`.
    pub outputs: BTreeMap<String, ResolvedOutputKeys>,
    /// Source of every feature a declared slice reads.
    pub slice_features: BTreeMap<String, FeatureSource>,
    pub padding_options: Option<PaddingOptions>,
    pub inference_batch_size: Option<u32>,
}

impl ResolvedModel {
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// Resolved key name of `concern` for `output`.
    pub fn key(&self, output: &str, concern: KeyConcern) -> Option<&str> {
        self.outputs
            .get(output)?
            .get(concern)
            .map(|key| key.name.as_str())
    }

    pub fn label_key(&self, output: &str) -> Option<&str> {
        self.key(output, KeyConcern::Label)
    }

    pub fn has_example_weight(&self) -> bool {
        self.outputs
            .values()
            .any(|keys| keys.example_weight.is_some())
    }
}

/// A metric with its class looked up and parameters type-checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMetric {
    /// Name results are reported under.
    pub name: String,
    pub module: String,
    pub class_name: String,
    pub params: BTreeMap<String, ParamValue>,
}

/// Whether metrics are computed with and without example weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedExampleWeights {
    pub weighted: bool,
    pub unweighted: bool,
}

impl ResolvedExampleWeights {
    /// The `example_weighted` flags metric keys are produced for.
    pub fn variants(&self) -> Vec<bool> {
        let mut variants = Vec::with_capacity(2);
        if self.unweighted {
            variants.push(false);
        }
        if self.weighted {
            variants.push(true);
        }
        variants
    }
}

/// A metrics spec with models, outputs and options made explicit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMetricsSpec {
    pub model_names: Vec<String>,
    /// Declared outputs, or every output of the spec's models.
    pub output_names: Vec<String>,
    pub output_weights: BTreeMap<String, f64>,
    pub binarize: Option<BinarizationOptions>,
    pub aggregate: Option<ResolvedAggregation>,
    pub example_weights: ResolvedExampleWeights,
    pub query_key: Option<String>,
    pub metrics: Vec<ResolvedMetric>,
}

impl ResolvedMetricsSpec {
    /// Every `(sub_key, aggregation)` pair a metric of this spec is
    /// reported under.
    pub fn metric_variants(&self) -> Vec<(Option<SubKey>, Option<AggregationType>)> {
        let mut variants: Vec<(Option<SubKey>, Option<AggregationType>)> = self
            .binarize
            .as_ref()
            .map(|options| {
                crate::aggregation::binarize_variants(options)
                    .into_iter()
                    .map(|sub_key| (Some(sub_key), None))
                    .collect()
            })
            .unwrap_or_default();
        if let Some(aggregate) = &self.aggregate {
            variants.extend(aggregate.variants());
        }
        if variants.is_empty() {
            variants.push((None, None));
        }
        variants
    }
}

/// Run-wide options with defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedOptions {
    pub include_default_metrics: bool,
    pub compute_confidence_intervals: bool,
    pub confidence_interval_method: ConfidenceIntervalMethod,
    pub min_slice_size: u32,
    pub disabled_outputs: BTreeSet<OutputKind>,
    /// Configured names that matched no output kind.
    pub ignored_disabled_outputs: Vec<String>,
}

impl ResolvedOptions {
    pub fn is_enabled(&self, kind: OutputKind) -> bool {
        !self.disabled_outputs.contains(&kind)
    }
}

/// A fully resolved evaluation configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPlan {
    pub models: Vec<ResolvedModel>,
    pub baseline_model: Option<String>,
    pub slices: Vec<SlicingSpec>,
    pub cross_slices: Vec<CrossSlicingSpec>,
    pub metrics_specs: Vec<ResolvedMetricsSpec>,
    pub thresholds: Vec<ResolvedThreshold>,
    pub options: ResolvedOptions,
}

impl ResolvedPlan {
    pub fn model(&self, name: &str) -> Option<&ResolvedModel> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn baseline(&self) -> Option<&ResolvedModel> {
        self.baseline_model.as_deref().and_then(|name| self.model(name))
    }

    pub fn candidates(&self) -> impl Iterator<Item = &ResolvedModel> {
        self.models.iter().filter(|m| !m.is_baseline)
    }

    /// Thresholds bound to `metric`, in any scope.
    pub fn thresholds_for<'a, 'm>(
        &'a self,
        metric: &'m MetricKey,
    ) -> impl Iterator<Item = &'a ResolvedThreshold> + use<'a, 'm> {
        self.thresholds.iter().filter(move |t| &t.metric == metric)
    }

    /// Check one slice result against every threshold that covers it.
    ///
    /// `baseline` is the baseline model's value for the same key and slice.
    /// Returns one outcome per applicable threshold.
    pub fn validate_slice_metric(
        &self,
        metric: &MetricKey,
        slice: &SlicingSpec,
        value: f64,
        baseline: Option<f64>,
    ) -> Vec<(&ResolvedThreshold, ThresholdOutcome)> {
        self.thresholds_for(metric)
            .filter(|t| t.scope.covers_slice(slice))
            .map(|t| (t, evaluate_threshold(&t.threshold, value, baseline)))
            .collect()
    }

    /// Whether any threshold is in scope, so a validation result is due.
    pub fn has_validations(&self) -> bool {
        !self.thresholds.is_empty() && self.options.is_enabled(OutputKind::Validations)
    }

    /// Thresholds scoped to cross-slice comparisons.
    pub fn cross_slice_thresholds(&self) -> impl Iterator<Item = &ResolvedThreshold> {
        self.thresholds
            .iter()
            .filter(|t| matches!(t.scope, ThresholdScope::CrossSlice(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_weight_variants() {
        let both = ResolvedExampleWeights {
            weighted: true,
            unweighted: true,
        };
        assert_eq!(both.variants(), vec![false, true]);

        let weighted_only = ResolvedExampleWeights {
            weighted: true,
            unweighted: false,
        };
        assert_eq!(weighted_only.variants(), vec![true]);
    }

    #[test]
    fn test_metric_variants_compose_binarize_and_aggregate() {
        let spec = ResolvedMetricsSpec {
            model_names: vec![String::new()],
            output_names: vec![String::new()],
            output_weights: BTreeMap::new(),
            binarize: Some(BinarizationOptions {
                class_ids: vec![0, 1],
                ..Default::default()
            }),
            aggregate: Some(ResolvedAggregation {
                kind: AggregationType::Macro,
                class_weights: BTreeMap::from([(0, 1.0), (1, 1.0)]),
                top_k_list: vec![],
            }),
            example_weights: ResolvedExampleWeights {
                weighted: false,
                unweighted: true,
            },
            query_key: None,
            metrics: vec![],
        };
        assert_eq!(
            spec.metric_variants(),
            vec![
                (Some(SubKey::ClassId(0)), None),
                (Some(SubKey::ClassId(1)), None),
                (None, Some(AggregationType::Macro)),
            ]
        );
    }

    #[test]
    fn test_disabled_output_is_not_enabled() {
        let options = ResolvedOptions {
            include_default_metrics: true,
            compute_confidence_intervals: false,
            confidence_interval_method: ConfidenceIntervalMethod::default(),
            min_slice_size: 1,
            disabled_outputs: BTreeSet::from([OutputKind::Plots]),
            ignored_disabled_outputs: vec![],
        };
        assert!(!options.is_enabled(OutputKind::Plots));
        assert!(options.is_enabled(OutputKind::Metrics));
    }
}
