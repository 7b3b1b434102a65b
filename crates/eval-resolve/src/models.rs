//! Model naming and baseline selection

use std::borrow::Cow;
use std::collections::BTreeSet;

use eval_schema::EvalConfig;
use eval_schema::schema::{MetricConfig, MetricThreshold, ModelSpec};

use crate::error::{ConfigError, FieldPath, Result};

/// Declared models, or one unnamed default model when none are declared.
pub(crate) fn models_of(config: &EvalConfig) -> Cow<'_, [ModelSpec]> {
    if config.model_specs.is_empty() {
        Cow::Owned(vec![ModelSpec::default()])
    } else {
        Cow::Borrowed(&config.model_specs)
    }
}

pub(crate) fn validate_models(models: &[ModelSpec]) -> Result<()> {
    let models_path = FieldPath::root().field("model_specs");
    let mut seen = BTreeSet::new();
    for (i, model) in models.iter().enumerate() {
        let path = models_path.index(i);
        if models.len() > 1 && model.name.is_empty() {
            return Err(ConfigError::ModelNameRequired {
                path: path.field("name"),
            });
        }
        if !seen.insert(model.name.as_str()) {
            return Err(ConfigError::DuplicateModelName {
                path: path.field("name"),
                name: model.name.clone(),
            });
        }
        if model.inference_batch_size == Some(0) {
            return Err(ConfigError::invalid(
                path.field("inference_batch_size"),
                "inference_batch_size must be at least 1",
            ));
        }
    }
    Ok(())
}

/// Index of the baseline model, if one is marked.
pub(crate) fn find_baseline(models: &[ModelSpec]) -> Result<Option<usize>> {
    let models_path = FieldPath::root().field("model_specs");
    let marked: Vec<usize> = models
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_baseline)
        .map(|(i, _)| i)
        .collect();
    match marked.as_slice() {
        [] => Ok(None),
        [index] => Ok(Some(*index)),
        _ => Err(ConfigError::AmbiguousBaseline {
            path: models_path.clone(),
            paths: marked
                .iter()
                .map(|i| models_path.index(*i).field("is_baseline"))
                .collect(),
        }),
    }
}

/// First configuration element that only makes sense against a baseline.
pub(crate) fn baseline_requirement(config: &EvalConfig) -> Option<(FieldPath, &'static str)> {
    let root = FieldPath::root();
    if !config.cross_slicing_specs.is_empty() {
        return Some((
            root.field("cross_slicing_specs"),
            "cross-slicing specs are configured",
        ));
    }

    for (i, spec) in config.metrics_specs.iter().enumerate() {
        let spec_path = root.field("metrics_specs").index(i);
        for (name, threshold) in &spec.thresholds {
            if threshold.requires_baseline() {
                return Some((
                    change_path(&spec_path.field("thresholds").key(name.clone())),
                    CHANGE_REASON,
                ));
            }
        }
        for (name, thresholds) in &spec.per_slice_thresholds {
            if let Some(j) = thresholds.iter().position(|t| t.threshold.requires_baseline()) {
                return Some((
                    change_path(
                        &spec_path
                            .field("per_slice_thresholds")
                            .key(name.clone())
                            .index(j)
                            .field("threshold"),
                    ),
                    CHANGE_REASON,
                ));
            }
        }
        if let Some(name) = spec
            .cross_slice_thresholds
            .iter()
            .find(|(_, thresholds)| !thresholds.is_empty())
            .map(|(name, _)| name)
        {
            return Some((
                spec_path.field("cross_slice_thresholds").key(name.clone()),
                CROSS_SLICE_REASON,
            ));
        }
        for (j, metric) in spec.metrics.iter().enumerate() {
            if let Some(found) = metric_requirement(metric, &spec_path.field("metrics").index(j)) {
                return Some(found);
            }
        }
    }
    None
}

const CHANGE_REASON: &str = "a change threshold is configured";
const CROSS_SLICE_REASON: &str = "a cross-slice threshold is configured";

fn change_path(threshold_path: &FieldPath) -> FieldPath {
    threshold_path.field("change_threshold")
}

fn metric_requirement(
    metric: &MetricConfig,
    metric_path: &FieldPath,
) -> Option<(FieldPath, &'static str)> {
    if metric
        .threshold
        .as_ref()
        .is_some_and(MetricThreshold::requires_baseline)
    {
        return Some((change_path(&metric_path.field("threshold")), CHANGE_REASON));
    }
    if let Some(j) = metric
        .per_slice_thresholds
        .iter()
        .position(|t| t.threshold.requires_baseline())
    {
        return Some((
            change_path(
                &metric_path
                    .field("per_slice_thresholds")
                    .index(j)
                    .field("threshold"),
            ),
            CHANGE_REASON,
        ));
    }
    if !metric.cross_slice_thresholds.is_empty() {
        return Some((
            metric_path.field("cross_slice_thresholds"),
            CROSS_SLICE_REASON,
        ));
    }
    None
}
