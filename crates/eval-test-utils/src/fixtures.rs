//! Ready-made configurations.
//!
//! Each fixture is a small, valid configuration that tests tweak to reach
//! the case they exercise.

use eval_schema::EvalConfig;
use eval_schema::schema::{
    AggregationOptions, AggregationType, Direction, KeySpec, MetricConfig, MetricThreshold,
    MetricsSpec, ModelSpec, PerSliceMetricThreshold, SlicingSpec,
};

/// TOML form of [`candidate_and_baseline`].
pub const CANDIDATE_AND_BASELINE_TOML: &str = r#"
[[model_specs]]
name = "candidate"
label_key = "label"

[[model_specs]]
name = "baseline"
label_key = "label"
is_baseline = true

[[slicing_specs]]

[[slicing_specs]]
feature_keys = ["country"]

[[metrics_specs]]
metrics = [{ class_name = "AUC" }, { class_name = "ExampleCount" }]

[metrics_specs.thresholds.auc.value_threshold]
lower_bound = 0.7

[metrics_specs.thresholds.auc.change_threshold]
direction = "HIGHER_IS_BETTER"
absolute = -0.01
"#;

/// A candidate compared against a baseline on AUC, overall and by country.
pub fn candidate_and_baseline() -> EvalConfig {
    EvalConfig::new()
        .with_model(ModelSpec::named("candidate").with_label(KeySpec::single("label")))
        .with_model(
            ModelSpec::named("baseline")
                .with_label(KeySpec::single("label"))
                .baseline(),
        )
        .with_slice(SlicingSpec::overall())
        .with_slice(SlicingSpec::keys(["country"]))
        .with_metrics(
            MetricsSpec::new()
                .with_metric(MetricConfig::new("AUC"))
                .with_metric(MetricConfig::new("ExampleCount"))
                .with_threshold(
                    "auc",
                    MetricThreshold::value(Some(0.7), None).and(
                        MetricThreshold::absolute_change(Direction::HigherIsBetter, -0.01),
                    ),
                ),
        )
}

/// A two-headed model with per-output label keys `out1 -> y1`, `out2 -> y2`.
pub fn multi_output_model() -> ModelSpec {
    ModelSpec::named("multi").with_label(KeySpec::per_output([("out1", "y1"), ("out2", "y2")]))
}

/// [`multi_output_model`] evaluated on `outputs`.
pub fn multi_output_config(outputs: &[&str]) -> EvalConfig {
    EvalConfig::new().with_model(multi_output_model()).with_metrics(
        MetricsSpec::new()
            .for_outputs(outputs.iter().copied())
            .with_metric(MetricConfig::new("ExampleCount")),
    )
}

/// A single model with a per-slice AUC bound on `country`.
///
/// With `declare_slice` false the slice is referenced but never declared.
pub fn country_threshold(declare_slice: bool) -> EvalConfig {
    let country = SlicingSpec::keys(["country"]);
    let mut config = EvalConfig::new().with_model(ModelSpec::named("candidate"));
    if declare_slice {
        config = config.with_slice(country.clone());
    }
    config.with_metrics(
        MetricsSpec::new()
            .with_metric(MetricConfig::new("AUC"))
            .with_per_slice_threshold(
                "auc",
                PerSliceMetricThreshold {
                    slicing_specs: vec![country],
                    threshold: MetricThreshold::value(Some(0.6), None),
                },
            ),
    )
}

/// A multi-class metrics spec aggregated with `kind` and no class weights.
pub fn unweighted_aggregation(kind: AggregationType) -> EvalConfig {
    EvalConfig::new().with_metrics(
        MetricsSpec::new()
            .with_metric(MetricConfig::new("Precision"))
            .with_aggregate(AggregationOptions::new(kind)),
    )
}
