//! End-to-end integration test for the evaluation config flow
//!
//! Exercises: config file -> load -> resolve -> threshold validation.

use std::collections::BTreeMap;

use eval_resolve::{
    ConfigError, ConfigResolver, MetricKey, ResolvedPlan, combine_output_weights,
    evaluate_threshold,
};
use eval_schema::schema::SlicingSpec;
use eval_schema::{EvalConfig, MetricRegistry, load_eval_config};
use eval_test_utils::TestWorkspace;
use eval_test_utils::fixtures::{self, CANDIDATE_AND_BASELINE_TOML};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn resolve(config: &EvalConfig) -> Result<ResolvedPlan, ConfigError> {
    let registry = MetricRegistry::with_builtins();
    ConfigResolver::new(&registry).resolve(config)
}

#[test]
fn test_toml_file_to_validation() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_file("eval.toml", CANDIDATE_AND_BASELINE_TOML);

    let config = load_eval_config(&path).unwrap();
    assert_eq!(config, fixtures::candidate_and_baseline());

    let plan = resolve(&config).unwrap();
    let candidate = MetricKey::new("auc", "candidate");
    let baseline = MetricKey::new("auc", "baseline");
    let overall = SlicingSpec::overall();

    // Metric values an engine would have computed
    let candidate_auc = 0.795;
    let baseline_auc = 0.80;

    let candidate_results =
        plan.validate_slice_metric(&candidate, &overall, candidate_auc, Some(baseline_auc));
    let baseline_results = plan.validate_slice_metric(&baseline, &overall, baseline_auc, None);
    assert!(candidate_results.iter().all(|(_, outcome)| outcome.passed()));
    assert!(baseline_results.iter().all(|(_, outcome)| outcome.passed()));

    let regressed = plan.validate_slice_metric(&candidate, &overall, 0.75, Some(baseline_auc));
    assert!(!regressed[0].1.passed());
    assert_eq!(regressed[0].0.origin.to_string(), r#"metrics_specs[0].thresholds["auc"]"#);
}

#[rstest]
#[case("eval.toml")]
#[case("eval.json")]
#[case("eval.yaml")]
fn test_every_format_resolves_to_same_plan(#[case] file_name: &str) {
    let workspace = TestWorkspace::new();
    let config = fixtures::candidate_and_baseline();
    let path = workspace.write_config(file_name, &config);

    let loaded = load_eval_config(&path).unwrap();
    assert_eq!(resolve(&loaded).unwrap(), resolve(&config).unwrap());
}

#[test]
fn test_yaml_macro_average_without_weights_fails_resolution() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_file(
        "eval.yaml",
        r#"
metrics_specs:
  - metrics:
      - class_name: Precision
    aggregate:
      macro_average: true
"#,
    );

    let config = load_eval_config(&path).unwrap();
    let err = resolve(&config).unwrap_err();
    assert!(matches!(err, ConfigError::MissingClassWeights { .. }));
}

#[test]
fn test_json_multi_output_model_with_output_weights() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_file(
        "eval.json",
        r#"{
  "model_specs": [
    { "name": "multi", "label_keys": { "out1": "y1", "out2": "y2" } }
  ],
  "metrics_specs": [
    {
      "metrics": [{ "class_name": "MeanSquaredError" }],
      "output_weights": { "out1": 0.25, "out2": 0.75 }
    }
  ]
}"#,
    );

    let plan = resolve(&load_eval_config(&path).unwrap()).unwrap();
    let model = plan.model("multi").unwrap();
    assert_eq!(
        model.output_names().collect::<Vec<_>>(),
        vec!["out1", "out2"]
    );
    assert_eq!(model.label_key("out2"), Some("y2"));

    let spec = &plan.metrics_specs[0];
    assert_eq!(spec.output_names, vec!["out1", "out2"]);
    let per_output = BTreeMap::from([("out1".to_string(), 0.4), ("out2".to_string(), 0.8)]);
    let combined = combine_output_weights(&spec.output_weights, &per_output).unwrap();
    assert!((combined - 0.7).abs() < 1e-12);
}

#[test]
fn test_plan_serializes_for_the_engine() {
    let plan = resolve(&fixtures::candidate_and_baseline()).unwrap();
    let json = serde_json::to_value(&plan).unwrap();

    assert_eq!(json["baseline_model"], "baseline");
    assert_eq!(json["models"][0]["outputs"][""]["label"]["name"], "label");
    assert_eq!(json["models"][0]["outputs"][""]["label"]["source"], "raw");
    assert_eq!(json["thresholds"][0]["metric"]["name"], "auc");
    assert_eq!(json["thresholds"][0]["scope"]["scope"], "global");
    assert_eq!(
        json["thresholds"][0]["origin"],
        r#"metrics_specs[0].thresholds["auc"]"#
    );
}

#[test]
fn test_threshold_decision_matches_documented_examples() {
    let plan = resolve(&fixtures::candidate_and_baseline()).unwrap();
    let threshold = &plan.thresholds[0].threshold;

    assert!(evaluate_threshold(threshold, 0.795, Some(0.80)).passed());
    assert!(!evaluate_threshold(threshold, 0.78, Some(0.80)).passed());
}
