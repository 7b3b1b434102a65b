//! Configuration schema for the model evaluation pipeline.
//!
//! This crate declares the shape of an evaluation run: the models under
//! evaluation, how examples are sliced, which metrics are computed and which
//! thresholds validate them. It also provides the metric registry, a
//! format-agnostic config store and the persisted run record.
//!
//! Interpreting a configuration (defaults, key resolution, threshold
//! decisions) is the job of `eval-resolve`.

pub mod config;
pub mod error;
pub mod registry;
pub mod run;
pub mod schema;
pub mod store;

pub use config::{EvalConfig, load_eval_config};
pub use error::{Error, Result};
pub use registry::{MetricDescriptor, MetricRegistry, ParamKind, ParamSpec, ParamValue};
pub use run::{EVAL_RUN_FILE, EvalConfigAndVersion, EvalRun};
pub use store::{ConfigFormat, ConfigStore, write_atomic};

/// Version stamped into run records written by this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
