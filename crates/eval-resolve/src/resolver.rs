//! Turns an `EvalConfig` into a `ResolvedPlan`
//!
//! Resolution runs in a fixed order so the first error reported for a
//! configuration is always the same one:
//!
//! 1. model names
//! 2. baseline
//! 3. slices
//! 4. metrics specs (models and outputs, aggregation and binarization,
//!    metrics, thresholds), then per-model keys
//! 5. options

use std::collections::{BTreeMap, BTreeSet};

use eval_schema::schema::{
    CrossSliceMetricThreshold, KeySpec, MetricConfig, MetricThreshold, MetricsSpec, ModelSpec,
    PerSliceMetricThreshold,
};
use eval_schema::{EvalConfig, MetricRegistry};

use crate::aggregation::{resolve_aggregation, validate_binarize, validate_output_weights};
use crate::error::{ConfigError, FieldPath, Result};
use crate::features::FeatureCatalog;
use crate::keys::resolve_output_keys;
use crate::models::{baseline_requirement, find_baseline, models_of, validate_models};
use crate::outputs::partition_disabled;
use crate::plan::{
    ResolvedExampleWeights, ResolvedMetric, ResolvedMetricsSpec, ResolvedModel, ResolvedOptions,
    ResolvedPlan,
};
use crate::slices::SliceIndex;
use crate::thresholds::{
    MetricKey, ResolvedThreshold, ThresholdDecl, ThresholdScope, validate_threshold,
};

/// Resolves evaluation configurations against a metric registry.
///
/// # Example
///
/// ```
/// use eval_resolve::ConfigResolver;
/// use eval_schema::schema::{MetricConfig, MetricsSpec, ModelSpec};
/// use eval_schema::{EvalConfig, MetricRegistry};
///
/// let registry = MetricRegistry::with_builtins();
/// let config = EvalConfig::new()
///     .with_model(ModelSpec::named("candidate"))
///     .with_metrics(MetricsSpec::new().with_metric(MetricConfig::new("AUC")));
///
/// let plan = ConfigResolver::new(&registry).resolve(&config).unwrap();
/// assert_eq!(plan.models[0].name, "candidate");
/// assert_eq!(plan.metrics_specs[0].metrics[0].name, "auc");
/// ```
#[derive(Debug, Clone)]
pub struct ConfigResolver<'a> {
    registry: &'a MetricRegistry,
    catalog: FeatureCatalog,
}

/// A metrics spec after its own fields are checked, before model outputs
/// are known.
struct SpecDraft {
    model_names: Vec<String>,
    /// `output_names` followed by output-weight keys not already listed.
    declared_outputs: Vec<String>,
    resolved: ResolvedMetricsSpec,
    decls: Vec<ThresholdDecl>,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(registry: &'a MetricRegistry) -> Self {
        Self {
            registry,
            catalog: FeatureCatalog::default(),
        }
    }

    /// Use `catalog` to tell preprocessed features from raw ones.
    pub fn with_feature_catalog(mut self, catalog: FeatureCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Resolve `config` into a plan, or report the first problem found.
    pub fn resolve(&self, config: &EvalConfig) -> Result<ResolvedPlan> {
        let models = models_of(config);
        validate_models(&models)?;
        tracing::debug!(models = models.len(), "Validated model specs");

        let baseline = find_baseline(&models)?;
        if let (None, Some((path, reason))) = (baseline, baseline_requirement(config)) {
            return Err(ConfigError::MissingBaseline {
                path,
                reason: reason.to_string(),
            });
        }
        let baseline_model = baseline.map(|i| models[i].name.clone());
        tracing::debug!(baseline = ?baseline_model, "Resolved baseline model");

        let slices = SliceIndex::build(config)?;

        let specs_path = FieldPath::root().field("metrics_specs");
        let mut drafts = Vec::with_capacity(config.metrics_specs.len());
        for (i, spec) in config.metrics_specs.iter().enumerate() {
            drafts.push(self.draft_metrics_spec(spec, &specs_path.index(i), &models, &slices)?);
        }
        tracing::debug!(metrics_specs = drafts.len(), "Resolved metrics specs");

        let resolved_models = self.resolve_models(&models, &drafts, &slices)?;

        let mut metrics_specs = Vec::with_capacity(drafts.len());
        let mut thresholds = Vec::new();
        for draft in drafts {
            let SpecDraft {
                model_names,
                declared_outputs,
                mut resolved,
                decls,
            } = draft;
            resolved.output_names = if declared_outputs.is_empty() {
                model_names
                    .iter()
                    .filter_map(|name| resolved_models.iter().find(|m| &m.name == name))
                    .flat_map(|m| m.outputs.keys().cloned())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            } else {
                declared_outputs
            };
            thresholds.extend(expand_thresholds(&resolved, &decls, &resolved_models));
            metrics_specs.push(resolved);
        }

        let options = resolve_options(config);

        let plan = ResolvedPlan {
            models: resolved_models,
            baseline_model,
            slices: slices.slices().to_vec(),
            cross_slices: slices.cross_slices().to_vec(),
            metrics_specs,
            thresholds,
            options,
        };
        tracing::info!(
            models = plan.models.len(),
            slices = plan.slices.len(),
            metrics_specs = plan.metrics_specs.len(),
            thresholds = plan.thresholds.len(),
            "Resolved evaluation plan"
        );
        Ok(plan)
    }

    fn draft_metrics_spec(
        &self,
        spec: &MetricsSpec,
        path: &FieldPath,
        models: &[ModelSpec],
        slices: &SliceIndex,
    ) -> Result<SpecDraft> {
        let model_names = spec_model_names(spec, path, models)?;

        validate_output_weights(&spec.output_weights, &path.field("output_weights"))?;
        let mut declared_outputs: Vec<String> = Vec::new();
        for output in spec.output_names.iter().chain(spec.output_weights.keys()) {
            if !declared_outputs.contains(output) {
                declared_outputs.push(output.clone());
            }
        }

        let binarize = match &spec.binarize {
            Some(options) if !options.is_empty() => {
                validate_binarize(options, &path.field("binarize"))?;
                Some(options.clone())
            }
            _ => None,
        };
        let aggregate = spec
            .aggregate
            .as_ref()
            .map(|options| resolve_aggregation(options, &path.field("aggregate")))
            .transpose()?;

        let query_key = spec.query_key.clone().filter(|key| !key.is_empty());
        let mut metrics = Vec::with_capacity(spec.metrics.len());
        let mut decls = Vec::new();
        for (j, metric) in spec.metrics.iter().enumerate() {
            let metric_path = path.field("metrics").index(j);
            let resolved = self.resolve_metric(metric, &metric_path, query_key.is_some())?;
            if metric.has_thresholds() {
                collect_metric_decls(&resolved.name, metric, &metric_path, slices, &mut decls)?;
            }
            metrics.push(resolved);
        }
        collect_spec_decls(spec, path, slices, &mut decls)?;

        let example_weights = resolve_example_weights(spec, path, &model_names, models)?;

        Ok(SpecDraft {
            resolved: ResolvedMetricsSpec {
                model_names: model_names.clone(),
                output_names: Vec::new(),
                output_weights: spec.output_weights.clone(),
                binarize,
                aggregate,
                example_weights,
                query_key,
                metrics,
            },
            model_names,
            declared_outputs,
            decls,
        })
    }

    fn resolve_metric(
        &self,
        metric: &MetricConfig,
        path: &FieldPath,
        has_query_key: bool,
    ) -> Result<ResolvedMetric> {
        let descriptor = self.registry.describe(metric).map_err(|err| match err {
            eval_schema::Error::UnknownMetric { class_name } => ConfigError::UnknownMetric {
                path: path.field("class_name"),
                class_name,
            },
            other => ConfigError::invalid(path.field("class_name"), other.to_string()),
        })?;
        let params = descriptor
            .check_params(&metric.config)
            .map_err(|err| ConfigError::InvalidMetricParams {
                path: path.field("config"),
                message: err.to_string(),
            })?;
        if descriptor.requires_query_key && !has_query_key {
            return Err(ConfigError::invalid(
                path.clone(),
                format!(
                    "metric '{}' needs the metrics spec to set query_key",
                    descriptor.class_name
                ),
            ));
        }
        tracing::debug!(
            class = %descriptor.class_name,
            module = %descriptor.module,
            "Resolved metric class"
        );
        Ok(ResolvedMetric {
            name: descriptor.metric_name(&params),
            module: descriptor.module.clone(),
            class_name: descriptor.class_name.clone(),
            params,
        })
    }

    fn resolve_models(
        &self,
        models: &[ModelSpec],
        drafts: &[SpecDraft],
        slices: &SliceIndex,
    ) -> Result<Vec<ResolvedModel>> {
        let slice_features = slices.feature_names();
        let models_path = FieldPath::root().field("model_specs");

        let mut resolved = Vec::with_capacity(models.len());
        for (i, model) in models.iter().enumerate() {
            let mut output_names: BTreeSet<String> = drafts
                .iter()
                .filter(|draft| draft.model_names.contains(&model.name))
                .flat_map(|draft| draft.declared_outputs.iter().cloned())
                .collect();
            if output_names.is_empty() {
                output_names = [
                    model.label.as_ref(),
                    model.prediction.as_ref(),
                    model.example_weight.as_ref(),
                ]
                .into_iter()
                .flatten()
                .flat_map(KeySpec::output_names)
                .map(str::to_string)
                .collect();
            }
            if output_names.is_empty() {
                output_names.insert(String::new());
            }

            let model_path = models_path.index(i);
            let functions = &model.preprocessing_function_names;
            let mut outputs = BTreeMap::new();
            for output in output_names {
                let keys = resolve_output_keys(
                    [
                        model.label.as_ref(),
                        model.prediction.as_ref(),
                        model.example_weight.as_ref(),
                    ],
                    &output,
                    functions,
                    &self.catalog,
                    &model_path,
                )?;
                outputs.insert(output, keys);
            }

            resolved.push(ResolvedModel {
                name: model.name.clone(),
                model_type: model.model_type,
                signature_name: model.signature_name.clone(),
                preprocessing_function_names: functions.clone(),
                is_baseline: model.is_baseline,
                outputs,
                slice_features: slice_features
                    .iter()
                    .map(|feature| (feature.clone(), self.catalog.source_of(feature, functions)))
                    .collect(),
                padding_options: model.padding_options,
                inference_batch_size: model.inference_batch_size,
            });
        }
        tracing::debug!(models = resolved.len(), "Resolved model keys");
        Ok(resolved)
    }
}

fn spec_model_names(
    spec: &MetricsSpec,
    path: &FieldPath,
    models: &[ModelSpec],
) -> Result<Vec<String>> {
    if spec.model_names.is_empty() {
        return Ok(models.iter().map(|m| m.name.clone()).collect());
    }
    let mut names: Vec<String> = Vec::with_capacity(spec.model_names.len());
    for (j, name) in spec.model_names.iter().enumerate() {
        if !models.iter().any(|m| &m.name == name) {
            return Err(ConfigError::UnknownModel {
                path: path.field("model_names").index(j),
                name: name.clone(),
            });
        }
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    Ok(names)
}

/// Explicit flags win. Unset, unweighted metrics are always computed and
/// weighted ones whenever a model in scope declares an example weight.
fn resolve_example_weights(
    spec: &MetricsSpec,
    path: &FieldPath,
    model_names: &[String],
    models: &[ModelSpec],
) -> Result<ResolvedExampleWeights> {
    let any_weight_key = models
        .iter()
        .filter(|m| model_names.contains(&m.name))
        .any(|m| m.example_weight.is_some());
    let resolved = ResolvedExampleWeights {
        weighted: spec.example_weights.weighted.unwrap_or(any_weight_key),
        unweighted: spec.example_weights.unweighted.unwrap_or(true),
    };
    if !resolved.weighted && !resolved.unweighted {
        return Err(ConfigError::invalid(
            path.field("example_weights"),
            "at least one of weighted and unweighted must be enabled",
        ));
    }
    Ok(resolved)
}

fn decl(
    metric_name: &str,
    scope: ThresholdScope,
    threshold: &MetricThreshold,
    origin: FieldPath,
) -> ThresholdDecl {
    ThresholdDecl {
        metric_name: metric_name.to_string(),
        scope,
        threshold: *threshold,
        origin,
    }
}

fn collect_per_slice(
    metric_name: &str,
    threshold: &PerSliceMetricThreshold,
    path: &FieldPath,
    slices: &SliceIndex,
    decls: &mut Vec<ThresholdDecl>,
) -> Result<()> {
    validate_threshold(&threshold.threshold, &path.field("threshold"))?;
    if threshold.slicing_specs.is_empty() {
        return Err(ConfigError::invalid(
            path.field("slicing_specs"),
            "a per-slice threshold must name at least one slice",
        ));
    }
    for (k, spec) in threshold.slicing_specs.iter().enumerate() {
        let slice = slices.resolve(spec, &path.field("slicing_specs").index(k))?;
        decls.push(decl(
            metric_name,
            ThresholdScope::Slice(slice),
            &threshold.threshold,
            path.clone(),
        ));
    }
    Ok(())
}

fn collect_cross_slice(
    metric_name: &str,
    threshold: &CrossSliceMetricThreshold,
    path: &FieldPath,
    slices: &SliceIndex,
    decls: &mut Vec<ThresholdDecl>,
) -> Result<()> {
    validate_threshold(&threshold.threshold, &path.field("threshold"))?;
    if threshold.cross_slicing_specs.is_empty() {
        return Err(ConfigError::invalid(
            path.field("cross_slicing_specs"),
            "a cross-slice threshold must name at least one cross-slicing spec",
        ));
    }
    for (k, spec) in threshold.cross_slicing_specs.iter().enumerate() {
        let cross = slices.resolve_cross(spec, &path.field("cross_slicing_specs").index(k))?;
        decls.push(decl(
            metric_name,
            ThresholdScope::CrossSlice(cross),
            &threshold.threshold,
            path.clone(),
        ));
    }
    Ok(())
}

/// Thresholds attached to a `MetricConfig`, named after the metric.
fn collect_metric_decls(
    metric_name: &str,
    metric: &MetricConfig,
    path: &FieldPath,
    slices: &SliceIndex,
    decls: &mut Vec<ThresholdDecl>,
) -> Result<()> {
    if let Some(threshold) = &metric.threshold {
        let origin = path.field("threshold");
        validate_threshold(threshold, &origin)?;
        decls.push(decl(metric_name, ThresholdScope::Global, threshold, origin));
    }
    for (k, threshold) in metric.per_slice_thresholds.iter().enumerate() {
        let origin = path.field("per_slice_thresholds").index(k);
        collect_per_slice(metric_name, threshold, &origin, slices, decls)?;
    }
    for (k, threshold) in metric.cross_slice_thresholds.iter().enumerate() {
        let origin = path.field("cross_slice_thresholds").index(k);
        collect_cross_slice(metric_name, threshold, &origin, slices, decls)?;
    }
    Ok(())
}

/// Thresholds declared on the spec, keyed by metric name.
fn collect_spec_decls(
    spec: &MetricsSpec,
    path: &FieldPath,
    slices: &SliceIndex,
    decls: &mut Vec<ThresholdDecl>,
) -> Result<()> {
    for (name, threshold) in &spec.thresholds {
        let origin = path.field("thresholds").key(name.clone());
        validate_threshold(threshold, &origin)?;
        decls.push(decl(name, ThresholdScope::Global, threshold, origin));
    }
    for (name, thresholds) in &spec.per_slice_thresholds {
        for (k, threshold) in thresholds.iter().enumerate() {
            let origin = path.field("per_slice_thresholds").key(name.clone()).index(k);
            collect_per_slice(name, threshold, &origin, slices, decls)?;
        }
    }
    for (name, thresholds) in &spec.cross_slice_thresholds {
        for (k, threshold) in thresholds.iter().enumerate() {
            let origin = path
                .field("cross_slice_thresholds")
                .key(name.clone())
                .index(k);
            collect_cross_slice(name, threshold, &origin, slices, decls)?;
        }
    }
    Ok(())
}

/// Bind each declaration to every metric key it covers.
fn expand_thresholds(
    spec: &ResolvedMetricsSpec,
    decls: &[ThresholdDecl],
    models: &[ResolvedModel],
) -> Vec<ResolvedThreshold> {
    let variants = spec.metric_variants();
    let weightings = spec.example_weights.variants();
    let mut expanded = Vec::new();

    for decl in decls {
        for model in models.iter().filter(|m| spec.model_names.contains(&m.name)) {
            let Some(threshold) = decl.for_model(model.is_baseline) else {
                continue;
            };
            for output in spec
                .output_names
                .iter()
                .filter(|output| model.outputs.contains_key(output.as_str()))
            {
                for (sub_key, aggregation) in &variants {
                    for example_weighted in &weightings {
                        expanded.push(ResolvedThreshold {
                            metric: MetricKey {
                                name: decl.metric_name.clone(),
                                model_name: model.name.clone(),
                                output_name: output.clone(),
                                sub_key: *sub_key,
                                aggregation: *aggregation,
                                example_weighted: *example_weighted,
                            },
                            scope: decl.scope.clone(),
                            threshold,
                            origin: decl.origin.clone(),
                        });
                    }
                }
            }
        }
    }
    expanded
}

fn resolve_options(config: &EvalConfig) -> ResolvedOptions {
    let options = &config.options;
    let (disabled_outputs, ignored_disabled_outputs) = partition_disabled(&options.disabled_outputs);
    ResolvedOptions {
        include_default_metrics: options.include_default_metrics(),
        compute_confidence_intervals: options.compute_confidence_intervals,
        confidence_interval_method: options.confidence_intervals.method,
        min_slice_size: options.min_slice_size(),
        disabled_outputs,
        ignored_disabled_outputs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval_schema::schema::{Direction, KeySpec, SlicingSpec};
    use pretty_assertions::assert_eq;

    fn registry() -> MetricRegistry {
        MetricRegistry::with_builtins()
    }

    #[test]
    fn test_empty_config_resolves_to_defaults() {
        let registry = registry();
        let plan = ConfigResolver::new(&registry)
            .resolve(&EvalConfig::new())
            .unwrap();
        assert_eq!(plan.models.len(), 1);
        assert_eq!(plan.models[0].name, "");
        assert_eq!(plan.models[0].output_names().collect::<Vec<_>>(), vec![""]);
        assert_eq!(plan.slices, vec![SlicingSpec::overall()]);
        assert!(plan.thresholds.is_empty());
        assert!(plan.options.include_default_metrics);
        assert_eq!(plan.options.min_slice_size, 1);
    }

    #[test]
    fn test_change_threshold_attaches_to_candidates_only() {
        let registry = registry();
        let config = EvalConfig::new()
            .with_model(ModelSpec::named("candidate"))
            .with_model(ModelSpec::named("baseline").baseline())
            .with_metrics(
                MetricsSpec::new()
                    .with_metric(MetricConfig::new("AUC"))
                    .with_threshold(
                        "auc",
                        MetricThreshold::absolute_change(Direction::HigherIsBetter, -0.01),
                    ),
            );
        let plan = ConfigResolver::new(&registry).resolve(&config).unwrap();
        assert_eq!(plan.baseline_model.as_deref(), Some("baseline"));
        assert_eq!(plan.thresholds.len(), 1);
        assert_eq!(plan.thresholds[0].metric, MetricKey::new("auc", "candidate"));
        assert_eq!(
            plan.thresholds[0].origin.to_string(),
            r#"metrics_specs[0].thresholds["auc"]"#
        );
    }

    #[test]
    fn test_missing_baseline_for_change_threshold() {
        let registry = registry();
        let config = EvalConfig::new().with_metrics(MetricsSpec::new().with_threshold(
            "auc",
            MetricThreshold::relative_change(Direction::HigherIsBetter, 0.0),
        ));
        let err = ConfigResolver::new(&registry).resolve(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingBaseline { .. }));
        assert_eq!(
            err.path().to_string(),
            r#"metrics_specs[0].thresholds["auc"].change_threshold"#
        );
    }

    #[test]
    fn test_unknown_model_in_metrics_spec() {
        let registry = registry();
        let config = EvalConfig::new()
            .with_model(ModelSpec::named("a"))
            .with_metrics(MetricsSpec::new().for_models(["a", "b"]));
        let err = ConfigResolver::new(&registry).resolve(&config).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownModel {
                path: FieldPath::root()
                    .field("metrics_specs")
                    .index(0)
                    .field("model_names")
                    .index(1),
                name: "b".into(),
            }
        );
    }

    #[test]
    fn test_unknown_metric_class() {
        let registry = registry();
        let config =
            EvalConfig::new().with_metrics(MetricsSpec::new().with_metric(MetricConfig::new("Lift")));
        let err = ConfigResolver::new(&registry).resolve(&config).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMetric { class_name, .. } if class_name == "Lift"));
    }

    #[test]
    fn test_query_metric_needs_query_key() {
        let registry = registry();
        let ndcg = MetricConfig::new("NDCG").with_param("gain_key", serde_json::json!("gain"));
        let without = EvalConfig::new().with_metrics(MetricsSpec::new().with_metric(ndcg.clone()));
        assert!(matches!(
            ConfigResolver::new(&registry).resolve(&without),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut spec = MetricsSpec::new().with_metric(ndcg);
        spec.query_key = Some("query_id".into());
        let with = EvalConfig::new().with_metrics(spec);
        let plan = ConfigResolver::new(&registry).resolve(&with).unwrap();
        assert_eq!(plan.metrics_specs[0].query_key.as_deref(), Some("query_id"));
    }

    #[test]
    fn test_weighted_metrics_follow_example_weight_keys() {
        let registry = registry();
        let config = EvalConfig::new()
            .with_model(ModelSpec::named("a").with_example_weight(KeySpec::single("w")))
            .with_model(ModelSpec::named("b"))
            .with_metrics(MetricsSpec::new().for_models(["a"]))
            .with_metrics(MetricsSpec::new().for_models(["b"]));
        let plan = ConfigResolver::new(&registry).resolve(&config).unwrap();
        assert!(plan.metrics_specs[0].example_weights.weighted);
        assert!(!plan.metrics_specs[1].example_weights.weighted);
        assert!(plan.metrics_specs[1].example_weights.unweighted);
        assert!(plan.model("a").unwrap().has_example_weight());
    }

    #[test]
    fn test_spec_outputs_default_to_model_outputs() {
        let registry = registry();
        let config = EvalConfig::new()
            .with_model(ModelSpec::named("m").with_label(KeySpec::single("label")))
            .with_metrics(MetricsSpec::new().for_outputs(["head_b", "head_a"]))
            .with_metrics(MetricsSpec::new());
        let plan = ConfigResolver::new(&registry).resolve(&config).unwrap();
        assert_eq!(plan.metrics_specs[0].output_names, vec!["head_b", "head_a"]);
        assert_eq!(plan.metrics_specs[1].output_names, vec!["head_a", "head_b"]);
        assert_eq!(plan.model("m").unwrap().label_key("head_a"), Some("label"));
    }
}
