//! Where a feature name comes from
//!
//! A model's preprocessing functions may emit features that shadow raw input
//! features of the same name. The [`FeatureCatalog`] records which names
//! each known function produces so the resolver can tell the engine where to
//! read a label, weight or slicing feature from.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Origin of a resolved feature name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FeatureSource {
    /// Read from the raw input example.
    Raw,
    /// Read from the output of a preprocessing function.
    Preprocessed { function: String },
}

/// Names produced by known preprocessing functions.
#[derive(Debug, Clone, Default)]
pub struct FeatureCatalog {
    outputs: BTreeMap<String, BTreeSet<String>>,
}

impl FeatureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `function` produces `features`.
    pub fn with_function<I, S>(mut self, function: impl Into<String>, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(function, features);
        self
    }

    pub fn register<I, S>(&mut self, function: impl Into<String>, features: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs
            .entry(function.into())
            .or_default()
            .extend(features.into_iter().map(Into::into));
    }

    pub fn produces(&self, function: &str, feature: &str) -> bool {
        self.outputs
            .get(function)
            .is_some_and(|features| features.contains(feature))
    }

    /// Source of `feature` for a model applying `functions` in order.
    ///
    /// Preprocessed output wins over the raw feature, and a later function
    /// wins over an earlier one.
    pub fn source_of(&self, feature: &str, functions: &[String]) -> FeatureSource {
        functions
            .iter()
            .rev()
            .find(|function| self.produces(function, feature))
            .map_or(FeatureSource::Raw, |function| FeatureSource::Preprocessed {
                function: function.clone(),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}
