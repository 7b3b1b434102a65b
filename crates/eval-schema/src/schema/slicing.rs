//! Slicing specifications
//!
//! A slice is a subset of evaluation examples sharing feature values. A
//! [`SlicingSpec`] selects slices either by feature columns and pinned
//! values, or by a declarative query string. The two forms are alternative
//! encodings; the resolver rejects specs that set both.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Slice selection. The empty spec is the overall (unsliced) result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicingSpec {
    /// Slice on every distinct value of these features.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub feature_keys: Vec<String>,
    /// Pin these features to a single value.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_values: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice_keys_sql: Option<String>,
}

impl SlicingSpec {
    pub fn overall() -> Self {
        Self::default()
    }

    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            feature_keys: keys.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn sql(query: impl Into<String>) -> Self {
        Self {
            slice_keys_sql: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.feature_values.insert(key.into(), value.into());
        self
    }

    pub fn is_overall(&self) -> bool {
        !self.has_feature_form() && !self.has_sql_form()
    }

    pub fn has_feature_form(&self) -> bool {
        !self.feature_keys.is_empty() || !self.feature_values.is_empty()
    }

    /// `Some("")` still counts as the query form being set.
    pub fn has_sql_form(&self) -> bool {
        self.slice_keys_sql.is_some()
    }

    /// Feature names this spec reads, sorted and de-duplicated.
    pub fn feature_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .feature_keys
            .iter()
            .map(String::as_str)
            .chain(self.feature_values.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Order-independent identity used to match slice references.
    pub fn canonical(&self) -> SliceKey {
        let mut feature_keys = self.feature_keys.clone();
        feature_keys.sort();
        feature_keys.dedup();
        SliceKey {
            feature_keys,
            feature_values: self
                .feature_values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            slice_keys_sql: self.slice_keys_sql.clone(),
        }
    }
}

impl fmt::Display for SlicingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_overall() {
            return f.write_str("Overall");
        }
        let key = self.canonical();
        let mut parts: Vec<String> = key.feature_keys.clone();
        parts.extend(key.feature_values.iter().map(|(k, v)| format!("{k}:{v}")));
        if let Some(sql) = &key.slice_keys_sql {
            parts.push(format!("sql:{sql}"));
        }
        f.write_str(&parts.join(", "))
    }
}

/// Canonical form of a [`SlicingSpec`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SliceKey {
    pub feature_keys: Vec<String>,
    pub feature_values: Vec<(String, String)>,
    pub slice_keys_sql: Option<String>,
}

/// Compares metric values of a baseline slice against other slices.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossSlicingSpec {
    pub baseline_spec: SlicingSpec,
    pub slicing_specs: Vec<SlicingSpec>,
}

impl CrossSlicingSpec {
    pub fn new(baseline_spec: SlicingSpec, slicing_specs: Vec<SlicingSpec>) -> Self {
        Self {
            baseline_spec,
            slicing_specs,
        }
    }

    /// Order-independent identity: the comparison slices form a set.
    pub fn canonical(&self) -> CrossSliceKey {
        let mut comparisons: Vec<SliceKey> =
            self.slicing_specs.iter().map(SlicingSpec::canonical).collect();
        comparisons.sort();
        comparisons.dedup();
        CrossSliceKey {
            baseline: self.baseline_spec.canonical(),
            comparisons,
        }
    }
}

impl fmt::Display for CrossSlicingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let comparisons: Vec<String> = self.slicing_specs.iter().map(ToString::to_string).collect();
        write!(f, "{} vs [{}]", self.baseline_spec, comparisons.join("; "))
    }
}

/// Canonical form of a [`CrossSlicingSpec`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CrossSliceKey {
    pub baseline: SliceKey,
    pub comparisons: Vec<SliceKey>,
}
