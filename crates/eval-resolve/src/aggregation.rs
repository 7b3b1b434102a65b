//! Binarization, aggregation and output-weight arithmetic
//!
//! Binarization splits a multi-class metric into one value per class id,
//! k or top-k. Aggregation rolls per-class values back into one number.
//! Output weights roll per-output values of a multi-output model into one.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use eval_schema::schema::{AggregationOptions, AggregationType, BinarizationOptions};
use serde::Serialize;

use crate::error::{ConfigError, FieldPath, Result};

/// Which binarized slice of a multi-class metric a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubKey {
    ClassId(i64),
    K(i64),
    TopK(i64),
}

impl fmt::Display for SubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubKey::ClassId(id) => write!(f, "classId:{id}"),
            SubKey::K(k) => write!(f, "k:{k}"),
            SubKey::TopK(k) => write!(f, "topK:{k}"),
        }
    }
}

/// Validated aggregation settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAggregation {
    pub kind: AggregationType,
    pub class_weights: BTreeMap<i64, f64>,
    pub top_k_list: Vec<i64>,
}

impl ResolvedAggregation {
    /// Weight of a class in the roll-up.
    ///
    /// Classes absent from a non-empty `class_weights` map weigh 0.0. With
    /// no class weights at all (top-k aggregation) every class weighs 1.0.
    pub fn class_weight(&self, class_id: i64) -> f64 {
        if self.class_weights.is_empty() {
            return 1.0;
        }
        self.class_weights.get(&class_id).copied().unwrap_or(0.0)
    }

    /// Roll per-class values into one value.
    ///
    /// Returns `None` for micro averaging, which pools examples before the
    /// metric is computed and so cannot be derived from per-class values,
    /// and when no class carries weight.
    pub fn average(&self, per_class: &BTreeMap<i64, f64>) -> Option<f64> {
        let included = per_class
            .iter()
            .map(|(id, value)| (self.class_weight(*id), *value))
            .filter(|(weight, _)| *weight > 0.0);

        match self.kind {
            AggregationType::Micro => None,
            AggregationType::Macro => {
                let (count, sum) =
                    included.fold((0usize, 0.0), |(count, sum), (_, value)| (count + 1, sum + value));
                (count > 0).then(|| sum / count as f64)
            }
            AggregationType::WeightedMacro => {
                let (mass, sum) = included.fold((0.0, 0.0), |(mass, sum), (weight, value)| {
                    (mass + weight, sum + weight * value)
                });
                (mass > 0.0).then(|| sum / mass)
            }
        }
    }

    /// Aggregation keys this setting produces.
    pub(crate) fn variants(&self) -> Vec<(Option<SubKey>, Option<AggregationType>)> {
        if self.top_k_list.is_empty() {
            return vec![(None, Some(self.kind))];
        }
        self.top_k_list
            .iter()
            .map(|k| (Some(SubKey::TopK(*k)), Some(self.kind)))
            .collect()
    }
}

fn check_weight(value: f64, path: FieldPath) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            path,
            format!("weight must be finite and non-negative, got {value}"),
        ))
    }
}

fn check_positive(values: &[i64], path: &FieldPath, what: &str) -> Result<()> {
    match values.iter().position(|v| *v < 1) {
        Some(i) => Err(ConfigError::invalid(
            path.index(i),
            format!("{what} must be at least 1, got {}", values[i]),
        )),
        None => Ok(()),
    }
}

/// Validate aggregation options found at `path`.
pub(crate) fn resolve_aggregation(
    options: &AggregationOptions,
    path: &FieldPath,
) -> Result<ResolvedAggregation> {
    let averages_classes = matches!(
        options.kind,
        AggregationType::Macro | AggregationType::WeightedMacro
    );
    if averages_classes && options.top_k_list.is_empty() && options.class_weights.is_empty() {
        return Err(ConfigError::MissingClassWeights { path: path.clone() });
    }
    for (class_id, weight) in &options.class_weights {
        check_weight(
            *weight,
            path.field("class_weights").key(class_id.to_string()),
        )?;
    }
    check_positive(&options.top_k_list, &path.field("top_k_list"), "top_k")?;

    Ok(ResolvedAggregation {
        kind: options.kind,
        class_weights: options.class_weights.clone(),
        top_k_list: dedup(&options.top_k_list),
    })
}

/// Validate binarization options found at `path`.
pub(crate) fn validate_binarize(options: &BinarizationOptions, path: &FieldPath) -> Result<()> {
    if let Some(i) = options.class_ids.iter().position(|id| *id < 0) {
        return Err(ConfigError::invalid(
            path.field("class_ids").index(i),
            format!("class id must be non-negative, got {}", options.class_ids[i]),
        ));
    }
    check_positive(&options.k_list, &path.field("k_list"), "k")?;
    check_positive(&options.top_k_list, &path.field("top_k_list"), "top_k")
}

/// Sub-keys binarization produces, in declaration order.
pub(crate) fn binarize_variants(options: &BinarizationOptions) -> Vec<SubKey> {
    let mut seen = BTreeSet::new();
    options
        .class_ids
        .iter()
        .map(|id| SubKey::ClassId(*id))
        .chain(options.k_list.iter().map(|k| SubKey::K(*k)))
        .chain(options.top_k_list.iter().map(|k| SubKey::TopK(*k)))
        .filter(|key| seen.insert(*key))
        .collect()
}

fn dedup(values: &[i64]) -> Vec<i64> {
    let mut seen = BTreeSet::new();
    values.iter().copied().filter(|v| seen.insert(*v)).collect()
}

/// Validate output weights found at `path`.
pub(crate) fn validate_output_weights(
    weights: &BTreeMap<String, f64>,
    path: &FieldPath,
) -> Result<()> {
    for (output, weight) in weights {
        check_weight(*weight, path.key(output.clone()))?;
    }
    Ok(())
}

/// Weighted mean of per-output values.
///
/// Only outputs present in both maps take part. Returns `None` when they
/// carry no weight.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use eval_resolve::combine_output_weights;
///
/// let weights = BTreeMap::from([("a".to_string(), 0.3), ("b".to_string(), 0.7)]);
/// let values = BTreeMap::from([("a".to_string(), 0.6), ("b".to_string(), 0.8)]);
/// let combined = combine_output_weights(&weights, &values).unwrap();
/// assert!((combined - 0.74).abs() < 1e-12);
/// ```
pub fn combine_output_weights(
    weights: &BTreeMap<String, f64>,
    values: &BTreeMap<String, f64>,
) -> Option<f64> {
    let (mass, sum) = weights
        .iter()
        .filter_map(|(output, weight)| values.get(output).map(|value| (*weight, *value)))
        .fold((0.0, 0.0), |(mass, sum), (weight, value)| {
            (mass + weight, sum + weight * value)
        });
    (mass > 0.0).then(|| sum / mass)
}
