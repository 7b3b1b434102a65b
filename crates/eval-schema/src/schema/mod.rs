//! Schema definitions for evaluation configuration
//!
//! Strongly-typed value objects loaded from TOML, JSON or YAML:
//!
//! - [`model`] - models under evaluation and their key layout
//! - [`slicing`] - slice and cross-slice selection
//! - [`metrics`] - metric groups, aggregation and binarization
//! - [`threshold`] - validation thresholds
//! - [`options`] - run-wide toggles

pub mod metrics;
pub mod model;
pub mod options;
pub mod slicing;
pub mod threshold;

pub use metrics::{
    AggregationOptions, AggregationType, BinarizationOptions, ExampleWeightOptions, MetricConfig,
    MetricsSpec,
};
pub use model::{KeySpec, ModelSpec, ModelType, PaddingOptions, PaddingValue};
pub use options::{ConfidenceIntervalMethod, ConfidenceIntervalOptions, Options};
pub use slicing::{CrossSliceKey, CrossSlicingSpec, SliceKey, SlicingSpec};
pub use threshold::{
    CrossSliceMetricThreshold, Direction, GenericChangeThreshold, GenericValueThreshold,
    MetricThreshold, PerSliceMetricThreshold,
};
