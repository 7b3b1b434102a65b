//! Error types for eval-resolve

use std::fmt;

use serde::{Serialize, Serializer};

/// Result type for resolution
pub type Result<T> = std::result::Result<T, ConfigError>;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Field(&'static str),
    Index(usize),
    Key(String),
}

/// Location of a field inside an `EvalConfig`, e.g.
/// `metrics_specs[0].thresholds["auc"].change_threshold.direction`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The configuration root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn field(&self, name: &'static str) -> Self {
        self.push(Segment::Field(name))
    }

    pub fn index(&self, index: usize) -> Self {
        self.push(Segment::Index(index))
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        self.push(Segment::Key(key.into()))
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    fn push(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => f.write_str(name)?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Key(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A configuration the resolver cannot turn into a plan.
///
/// Every variant names the offending field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{path}: more than one model is marked as baseline: {}", join_paths(.paths))]
    AmbiguousBaseline {
        path: FieldPath,
        paths: Vec<FieldPath>,
    },

    #[error("{path}: a baseline model is required because {reason}, but none is marked is_baseline")]
    MissingBaseline { path: FieldPath, reason: String },

    #[error("{path}: slice '{slice}' is not declared in the top-level slicing specs")]
    UnresolvedSliceReference { path: FieldPath, slice: String },

    #[error("{path}: degenerate threshold: {reason}")]
    DegenerateThreshold { path: FieldPath, reason: String },

    #[error("{path}: macro averaging without top_k_list requires class_weights")]
    MissingClassWeights { path: FieldPath },

    #[error("{path}: no key for output '{output}' and no fallback key is set")]
    KeyResolution { path: FieldPath, output: String },

    #[error("{path}: feature_keys/feature_values and slice_keys_sql cannot both be set")]
    ConflictingSliceForms { path: FieldPath },

    #[error("{path}: model name '{name}' is used more than once")]
    DuplicateModelName { path: FieldPath, name: String },

    #[error("{path}: every model needs a name when more than one model is configured")]
    ModelNameRequired { path: FieldPath },

    #[error("{path}: unknown model '{name}'")]
    UnknownModel { path: FieldPath, name: String },

    #[error("{path}: metric '{class_name}' is not registered")]
    UnknownMetric { path: FieldPath, class_name: String },

    #[error("{path}: {message}")]
    InvalidMetricParams { path: FieldPath, message: String },

    #[error("{path}: {message}")]
    InvalidValue { path: FieldPath, message: String },
}

fn join_paths(paths: &[FieldPath]) -> String {
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ConfigError {
    /// The offending field.
    pub fn path(&self) -> &FieldPath {
        match self {
            ConfigError::AmbiguousBaseline { path, .. }
            | ConfigError::MissingBaseline { path, .. }
            | ConfigError::UnresolvedSliceReference { path, .. }
            | ConfigError::DegenerateThreshold { path, .. }
            | ConfigError::MissingClassWeights { path }
            | ConfigError::KeyResolution { path, .. }
            | ConfigError::ConflictingSliceForms { path }
            | ConfigError::DuplicateModelName { path, .. }
            | ConfigError::ModelNameRequired { path }
            | ConfigError::UnknownModel { path, .. }
            | ConfigError::UnknownMetric { path, .. }
            | ConfigError::InvalidMetricParams { path, .. }
            | ConfigError::InvalidValue { path, .. } => path,
        }
    }

    pub(crate) fn invalid(path: FieldPath, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            path,
            message: message.into(),
        }
    }

    pub(crate) fn degenerate(path: FieldPath, reason: impl Into<String>) -> Self {
        ConfigError::DegenerateThreshold {
            path,
            reason: reason.into(),
        }
    }
}
