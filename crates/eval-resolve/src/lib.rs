//! Resolution of evaluation configuration
//!
//! [`ConfigResolver`] turns an [`eval_schema::EvalConfig`] into a
//! [`ResolvedPlan`]: defaults applied, per-output keys picked, the baseline
//! model identified, slice references matched against declarations and
//! thresholds validated and bound to concrete metric keys. Anything that
//! cannot be resolved is reported as a [`ConfigError`] naming the field.
//!
//! The crate also carries the arithmetic an engine needs to act on a plan:
//! the threshold decision rule ([`evaluate_threshold`]), class aggregation
//! ([`ResolvedAggregation::average`]) and output weighting
//! ([`combine_output_weights`]).

pub mod aggregation;
pub mod decision;
pub mod error;
pub mod features;
pub mod keys;
mod models;
pub mod outputs;
pub mod plan;
pub mod resolver;
mod slices;
pub mod thresholds;

pub use aggregation::{ResolvedAggregation, SubKey, combine_output_weights};
pub use decision::{ThresholdFailure, ThresholdOutcome, evaluate_threshold};
pub use error::{ConfigError, FieldPath, Result};
pub use features::{FeatureCatalog, FeatureSource};
pub use keys::{KeyConcern, ResolvedKey, ResolvedOutputKeys, resolve_key};
pub use outputs::OutputKind;
pub use plan::{
    ResolvedExampleWeights, ResolvedMetric, ResolvedMetricsSpec, ResolvedModel, ResolvedOptions,
    ResolvedPlan,
};
pub use resolver::ConfigResolver;
pub use thresholds::{MetricKey, ResolvedThreshold, ThresholdScope};
