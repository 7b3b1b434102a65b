use criterion::{Criterion, black_box, criterion_group, criterion_main};
use eval_resolve::{ConfigResolver, evaluate_threshold};
use eval_schema::MetricRegistry;
use eval_schema::schema::{
    AggregationOptions, AggregationType, BinarizationOptions, Direction, MetricConfig,
    MetricThreshold, MetricsSpec, ModelSpec, PerSliceMetricThreshold, SlicingSpec,
};
use eval_test_utils::fixtures;

fn resolve_benchmark(c: &mut Criterion) {
    let registry = MetricRegistry::with_builtins();

    c.bench_function("ConfigResolver::resolve (candidate and baseline)", |b| {
        let config = fixtures::candidate_and_baseline();
        let resolver = ConfigResolver::new(&registry);

        b.iter(|| {
            resolver.resolve(black_box(&config)).unwrap();
        })
    });

    // Many slices and a multi-class spec, so threshold expansion dominates
    c.bench_function("ConfigResolver::resolve (wide)", |b| {
        let mut config = fixtures::candidate_and_baseline();
        let mut spec = MetricsSpec::new()
            .with_metric(MetricConfig::new("Precision"))
            .with_binarize(BinarizationOptions {
                class_ids: (0..10).collect(),
                ..Default::default()
            })
            .with_aggregate(AggregationOptions::new(AggregationType::Micro));
        for i in 0..50 {
            let slice = SlicingSpec::keys([format!("feature_{i}")]);
            config = config.with_slice(slice.clone());
            spec = spec.with_per_slice_threshold(
                "precision",
                PerSliceMetricThreshold {
                    slicing_specs: vec![slice],
                    threshold: MetricThreshold::value(Some(0.5), None),
                },
            );
        }
        config = config
            .with_model(ModelSpec::named("challenger"))
            .with_metrics(spec);
        let resolver = ConfigResolver::new(&registry);

        b.iter(|| {
            resolver.resolve(black_box(&config)).unwrap();
        })
    });
}

fn evaluate_threshold_benchmark(c: &mut Criterion) {
    c.bench_function("evaluate_threshold", |b| {
        let threshold = MetricThreshold::value(Some(0.7), Some(1.0))
            .and(MetricThreshold::relative_change(Direction::HigherIsBetter, -0.05));

        b.iter(|| evaluate_threshold(black_box(&threshold), black_box(0.81), black_box(Some(0.8))))
    });
}

criterion_group!(benches, resolve_benchmark, evaluate_threshold_benchmark);
criterion_main!(benches);
