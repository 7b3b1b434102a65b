//! Tests for format-agnostic loading and saving

use assert_fs::prelude::*;
use eval_schema::schema::{KeySpec, MetricConfig, MetricsSpec, ModelSpec, SlicingSpec};
use eval_schema::{ConfigStore, EvalConfig, Error, load_eval_config};
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn sample_config() -> EvalConfig {
    EvalConfig::new()
        .with_model(
            ModelSpec::named("candidate")
                .with_label(KeySpec::per_output([("head_a", "label_a")]).with_fallback("label")),
        )
        .with_model(ModelSpec::named("baseline").baseline())
        .with_slice(SlicingSpec::overall())
        .with_slice(SlicingSpec::keys(["country"]).with_value("gender", "F"))
        .with_metrics(MetricsSpec::new().with_metric(MetricConfig::new("AUC")))
}

#[rstest]
#[case("config.toml")]
#[case("config.json")]
#[case("config.yaml")]
#[case("config.yml")]
fn test_save_then_load_each_format(#[case] file_name: &str) {
    let temp = assert_fs::TempDir::new().unwrap();
    let path = temp.child(file_name);
    let config = sample_config();

    ConfigStore::new().save(path.path(), &config).unwrap();
    path.assert(predicate::path::is_file());

    let loaded: EvalConfig = ConfigStore::new().load(path.path()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_save_creates_parent_directories() {
    let temp = assert_fs::TempDir::new().unwrap();
    let path = temp.child("nested/dir/config.json");

    ConfigStore::new().save(path.path(), &sample_config()).unwrap();

    path.assert(predicate::str::contains("\"candidate\""));
    let entries = std::fs::read_dir(temp.child("nested/dir").path())
        .unwrap()
        .count();
    assert_eq!(entries, 1, "temp file should be renamed over the target");
}

#[test]
fn test_failed_save_leaves_no_temp_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    // A non-empty directory cannot be replaced by a file rename
    temp.child("eval.json/keep").touch().unwrap();

    let err = ConfigStore::new()
        .save(&temp.path().join("eval.json"), &sample_config())
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));

    let leftovers: Vec<_> = std::fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .filter(|name| name.to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

#[test]
fn test_load_missing_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let err = load_eval_config(temp.child("absent.toml").path()).unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound { .. }));
}

#[test]
fn test_load_unsupported_extension() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("config.pbtxt");
    file.write_str("model_specs {}").unwrap();

    let err = load_eval_config(file.path()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { extension } if extension == "pbtxt"));
}

#[test]
fn test_load_invalid_document_names_format() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("config.toml");
    file.write_str("[[model_specs]\nname = ").unwrap();

    let err = load_eval_config(file.path()).unwrap_err();
    match err {
        Error::ConfigParse { format, .. } => assert_eq!(format, "TOML"),
        other => panic!("expected ConfigParse, got {other:?}"),
    }
}

#[test]
fn test_load_rejects_invalid_aggregation() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("config.json");
    file.write_str(
        r#"{"metrics_specs": [{"aggregate": {"micro_average": true, "macro_average": true}}]}"#,
    )
    .unwrap();

    let err = load_eval_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("exactly one"));
}

#[test]
fn test_load_yaml_config() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("config.yaml");
    file.write_str(
        r#"
model_specs:
  - name: candidate
    label_keys:
      out1: y1
      out2: y2
slicing_specs:
  - {}
  - feature_keys: [country]
metrics_specs:
  - output_names: [out1, out2]
    aggregate:
      weighted_macro_average: true
      class_weights:
        "0": 0.5
        "1": 1.5
"#,
    )
    .unwrap();

    let config = load_eval_config(file.path()).unwrap();
    assert_eq!(
        config.model_specs[0].label,
        Some(KeySpec::per_output([("out1", "y1"), ("out2", "y2")]))
    );
    assert!(config.slicing_specs[0].is_overall());
    let aggregate = config.metrics_specs[0].aggregate.as_ref().unwrap();
    assert_eq!(aggregate.class_weights.get(&1_i64), Some(&1.5));
}
