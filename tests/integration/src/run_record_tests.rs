//! The run record written after an evaluation and read back later

use eval_resolve::ConfigResolver;
use eval_schema::{EVAL_RUN_FILE, EvalConfigAndVersion, EvalRun, MetricRegistry, VERSION};
use eval_test_utils::TestWorkspace;
use eval_test_utils::fixtures;
use predicates::prelude::*;
use pretty_assertions::assert_eq;

#[test]
fn test_run_record_round_trip_reproduces_plan() {
    let workspace = TestWorkspace::new();
    let output_dir = workspace.output_dir();
    let registry = MetricRegistry::with_builtins();
    let resolver = ConfigResolver::new(&registry);

    let config = fixtures::candidate_and_baseline();
    let plan = resolver.resolve(&config).unwrap();

    let run = EvalRun::new(config)
        .with_data("/data/eval-*.tfrecord", "tfrecords")
        .with_model_location("candidate", "/models/candidate/2")
        .with_model_location("baseline", "/models/candidate/1");
    let path = run.write(&output_dir).unwrap();
    assert_eq!(path, output_dir.join(EVAL_RUN_FILE));
    workspace.assert_file_exists(&format!("output/{EVAL_RUN_FILE}"));

    let read = EvalRun::read(&output_dir).unwrap();
    assert_eq!(read, run);
    assert_eq!(read.version, VERSION);
    assert_eq!(resolver.resolve(&read.eval_config).unwrap(), plan);
}

#[test]
fn test_record_is_plain_json() {
    let workspace = TestWorkspace::new();
    let output_dir = workspace.output_dir();
    EvalRun::new(fixtures::candidate_and_baseline())
        .with_data("/data/eval.csv", "csv")
        .write(&output_dir)
        .unwrap();

    let json = workspace.read_json(&format!("output/{EVAL_RUN_FILE}"));
    assert_eq!(json["version"], VERSION);
    assert_eq!(json["file_format"], "csv");
    assert_eq!(json["eval_config"]["model_specs"][1]["is_baseline"], true);

    let text = std::fs::read_to_string(output_dir.join(EVAL_RUN_FILE)).unwrap();
    assert!(predicate::str::contains("\"data_location\"").eval(&text));
}

#[test]
fn test_narrow_record_reads_as_full_run() {
    let workspace = TestWorkspace::new();
    let output_dir = workspace.output_dir();
    let narrow = EvalConfigAndVersion {
        eval_config: fixtures::country_threshold(true),
        version: "0.0.9".to_string(),
    };
    narrow.write(&output_dir).unwrap();

    let run = EvalRun::read(&output_dir).unwrap();
    assert_eq!(run.version, "0.0.9");
    assert!(run.data_location.is_empty());
    assert!(run.model_locations.is_empty());
    assert_eq!(run.eval_config, narrow.eval_config);
}

#[test]
fn test_full_record_reads_as_narrow_shape() {
    let workspace = TestWorkspace::new();
    let output_dir = workspace.output_dir();
    let run = EvalRun::new(fixtures::multi_output_config(&["out1", "out2"]))
        .with_model_location("multi", "/models/multi");
    run.write(&output_dir).unwrap();

    let narrow = EvalConfigAndVersion::read(&output_dir).unwrap();
    assert_eq!(narrow, EvalConfigAndVersion::from(run));
}
