//! Threshold validation and expansion
//!
//! Thresholds are declared per metric name, optionally scoped to slices or
//! cross-slice comparisons. Resolution validates each declaration and then
//! expands it into one [`ResolvedThreshold`] per concrete metric key.

use std::fmt;

use eval_schema::schema::{
    AggregationType, CrossSlicingSpec, Direction, GenericChangeThreshold, GenericValueThreshold,
    MetricThreshold, SlicingSpec,
};
use serde::Serialize;

use crate::aggregation::SubKey;
use crate::error::{ConfigError, FieldPath, Result};

/// Identity of one computed metric value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MetricKey {
    pub name: String,
    pub model_name: String,
    pub output_name: String,
    pub sub_key: Option<SubKey>,
    pub aggregation: Option<AggregationType>,
    pub example_weighted: bool,
}

impl MetricKey {
    pub fn new(name: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_name: model_name.into(),
            output_name: String::new(),
            sub_key: None,
            aggregation: None,
            example_weighted: false,
        }
    }

    pub fn for_output(mut self, output_name: impl Into<String>) -> Self {
        self.output_name = output_name.into();
        self
    }

    pub fn with_sub_key(mut self, sub_key: SubKey) -> Self {
        self.sub_key = Some(sub_key);
        self
    }

    pub fn aggregated(mut self, aggregation: AggregationType) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn weighted(mut self) -> Self {
        self.example_weighted = true;
        self
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[model={:?}", self.name, self.model_name)?;
        if !self.output_name.is_empty() {
            write!(f, ", output={:?}", self.output_name)?;
        }
        if let Some(sub_key) = &self.sub_key {
            write!(f, ", {sub_key}")?;
        }
        if let Some(aggregation) = &self.aggregation {
            write!(f, ", {aggregation}")?;
        }
        if self.example_weighted {
            f.write_str(", weighted")?;
        }
        f.write_str("]")
    }
}

/// Which results a threshold is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "slice", rename_all = "snake_case")]
pub enum ThresholdScope {
    /// The overall (unsliced) result.
    Global,
    Slice(SlicingSpec),
    CrossSlice(CrossSlicingSpec),
}

impl ThresholdScope {
    /// Whether this scope covers the given slice result.
    pub fn covers_slice(&self, slice: &SlicingSpec) -> bool {
        match self {
            ThresholdScope::Global => slice.is_overall(),
            ThresholdScope::Slice(spec) => spec.canonical() == slice.canonical(),
            ThresholdScope::CrossSlice(_) => false,
        }
    }
}

/// A threshold bound to one metric key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedThreshold {
    pub metric: MetricKey,
    pub scope: ThresholdScope,
    pub threshold: MetricThreshold,
    /// Where the threshold was declared.
    pub origin: FieldPath,
}

/// Reject thresholds that cannot be evaluated.
pub(crate) fn validate_threshold(threshold: &MetricThreshold, path: &FieldPath) -> Result<()> {
    if threshold.value_threshold.is_none() && threshold.change_threshold.is_none() {
        return Err(ConfigError::degenerate(
            path.clone(),
            "neither value_threshold nor change_threshold is set",
        ));
    }
    if let Some(value) = &threshold.value_threshold {
        validate_value(value, &path.field("value_threshold"))?;
    }
    if let Some(change) = &threshold.change_threshold {
        validate_change(change, &path.field("change_threshold"))?;
    }
    Ok(())
}

fn validate_value(value: &GenericValueThreshold, path: &FieldPath) -> Result<()> {
    for (field, bound) in [
        ("lower_bound", value.lower_bound),
        ("upper_bound", value.upper_bound),
    ] {
        if bound.is_some_and(f64::is_nan) {
            return Err(ConfigError::degenerate(path.field(field), "bound is NaN"));
        }
    }
    match (value.lower_bound, value.upper_bound) {
        (Some(lower), Some(upper)) if lower > upper => Err(ConfigError::degenerate(
            path.clone(),
            format!("lower_bound {lower} is greater than upper_bound {upper}"),
        )),
        _ => Ok(()),
    }
}

fn validate_change(change: &GenericChangeThreshold, path: &FieldPath) -> Result<()> {
    if change.direction == Direction::Unknown {
        return Err(ConfigError::degenerate(
            path.field("direction"),
            "direction must be HIGHER_IS_BETTER or LOWER_IS_BETTER",
        ));
    }
    if change.absolute.is_none() && change.relative.is_none() {
        return Err(ConfigError::degenerate(
            path.clone(),
            "neither absolute nor relative is set",
        ));
    }
    for (field, limit) in [("absolute", change.absolute), ("relative", change.relative)] {
        if limit.is_some_and(|l| !l.is_finite()) {
            return Err(ConfigError::degenerate(
                path.field(field),
                "change limit must be finite",
            ));
        }
    }
    Ok(())
}

/// A validated threshold declaration before expansion.
#[derive(Debug, Clone)]
pub(crate) struct ThresholdDecl {
    pub(crate) metric_name: String,
    pub(crate) scope: ThresholdScope,
    pub(crate) threshold: MetricThreshold,
    pub(crate) origin: FieldPath,
}

impl ThresholdDecl {
    /// The part of the threshold that applies to a model.
    ///
    /// Change thresholds compare against the baseline, so the baseline
    /// model itself only keeps the value part.
    pub(crate) fn for_model(&self, is_baseline: bool) -> Option<MetricThreshold> {
        if !is_baseline {
            return Some(self.threshold);
        }
        self.threshold.value_threshold.map(|value| MetricThreshold {
            value_threshold: Some(value),
            change_threshold: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn path() -> FieldPath {
        FieldPath::root()
            .field("metrics_specs")
            .index(0)
            .field("thresholds")
            .key("auc")
    }

    #[test]
    fn test_empty_threshold_is_degenerate() {
        let err = validate_threshold(&MetricThreshold::default(), &path()).unwrap_err();
        assert_snapshot!(err.to_string(), @r#"metrics_specs[0].thresholds["auc"]: degenerate threshold: neither value_threshold nor change_threshold is set"#);
    }

    #[test]
    fn test_unknown_direction_points_at_direction() {
        let threshold = MetricThreshold::absolute_change(Direction::Unknown, 0.1);
        let err = validate_threshold(&threshold, &path()).unwrap_err();
        assert_eq!(
            err.path().to_string(),
            r#"metrics_specs[0].thresholds["auc"].change_threshold.direction"#
        );
    }

    #[test]
    fn test_change_without_limits_is_degenerate() {
        let threshold = MetricThreshold {
            value_threshold: None,
            change_threshold: Some(GenericChangeThreshold {
                absolute: None,
                relative: None,
                direction: Direction::HigherIsBetter,
            }),
        };
        assert!(matches!(
            validate_threshold(&threshold, &path()),
            Err(ConfigError::DegenerateThreshold { .. })
        ));
    }

    #[test]
    fn test_inverted_bounds_are_degenerate() {
        let threshold = MetricThreshold::value(Some(0.9), Some(0.1));
        assert!(validate_threshold(&threshold, &path()).is_err());

        let point = MetricThreshold::value(Some(0.5), Some(0.5));
        assert!(validate_threshold(&point, &path()).is_ok());
    }

    #[test]
    fn test_baseline_keeps_only_value_part() {
        let decl = ThresholdDecl {
            metric_name: "auc".into(),
            scope: ThresholdScope::Global,
            threshold: MetricThreshold::value(Some(0.7), None)
                .and(MetricThreshold::absolute_change(Direction::HigherIsBetter, -0.01)),
            origin: path(),
        };
        assert_eq!(
            decl.for_model(true),
            Some(MetricThreshold::value(Some(0.7), None))
        );
        assert_eq!(decl.for_model(false), Some(decl.threshold));

        let change_only = ThresholdDecl {
            threshold: MetricThreshold::absolute_change(Direction::HigherIsBetter, -0.01),
            ..decl
        };
        assert_eq!(change_only.for_model(true), None);
    }

    #[test]
    fn test_metric_key_display() {
        let key = MetricKey::new("auc", "candidate")
            .for_output("head")
            .with_sub_key(SubKey::ClassId(1))
            .weighted();
        assert_eq!(
            key.to_string(),
            r#"auc[model="candidate", output="head", classId:1, weighted]"#
        );
    }

    #[test]
    fn test_global_scope_covers_overall_only() {
        assert!(ThresholdScope::Global.covers_slice(&SlicingSpec::overall()));
        assert!(!ThresholdScope::Global.covers_slice(&SlicingSpec::keys(["country"])));
        assert!(
            ThresholdScope::Slice(SlicingSpec::keys(["a", "b"]))
                .covers_slice(&SlicingSpec::keys(["b", "a"]))
        );
    }
}
