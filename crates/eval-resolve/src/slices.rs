//! Slice declarations and references
//!
//! Thresholds name slices by repeating a `SlicingSpec`; such a reference is
//! valid only if a structurally equal spec is declared at the top level.

use std::collections::BTreeSet;

use eval_schema::EvalConfig;
use eval_schema::schema::{CrossSliceKey, CrossSlicingSpec, SliceKey, SlicingSpec};

use crate::error::{ConfigError, FieldPath, Result};

/// Check a single spec's shape.
pub(crate) fn validate_slicing_spec(spec: &SlicingSpec, path: &FieldPath) -> Result<()> {
    if spec.has_feature_form() && spec.has_sql_form() {
        return Err(ConfigError::ConflictingSliceForms { path: path.clone() });
    }
    if let Some(key) = spec
        .feature_keys
        .iter()
        .find(|key| spec.feature_values.contains_key(key.as_str()))
    {
        return Err(ConfigError::invalid(
            path.field("feature_values").key(key.clone()),
            format!("feature '{key}' is listed in both feature_keys and feature_values"),
        ));
    }
    if let Some(i) = spec.feature_keys.iter().position(String::is_empty) {
        return Err(ConfigError::invalid(
            path.field("feature_keys").index(i),
            "feature key must not be empty",
        ));
    }
    Ok(())
}

fn validate_cross_slicing_spec(spec: &CrossSlicingSpec, path: &FieldPath) -> Result<()> {
    validate_slicing_spec(&spec.baseline_spec, &path.field("baseline_spec"))?;
    for (i, comparison) in spec.slicing_specs.iter().enumerate() {
        validate_slicing_spec(comparison, &path.field("slicing_specs").index(i))?;
    }
    Ok(())
}

/// The declared slices of a configuration.
#[derive(Debug, Clone, Default)]
pub(crate) struct SliceIndex {
    slices: Vec<SlicingSpec>,
    cross_slices: Vec<CrossSlicingSpec>,
    slice_keys: BTreeSet<SliceKey>,
    cross_keys: BTreeSet<CrossSliceKey>,
}

impl SliceIndex {
    /// Validate and index the top-level declarations.
    ///
    /// Structural duplicates are kept once, in first-declared order. With no
    /// declarations the overall slice is the only slice.
    pub(crate) fn build(config: &EvalConfig) -> Result<Self> {
        let mut index = SliceIndex::default();
        let root = FieldPath::root();

        for (i, spec) in config.slicing_specs.iter().enumerate() {
            validate_slicing_spec(spec, &root.field("slicing_specs").index(i))?;
            if index.slice_keys.insert(spec.canonical()) {
                index.slices.push(spec.clone());
            }
        }
        if index.slices.is_empty() {
            index.slices.push(SlicingSpec::overall());
        }

        for (i, spec) in config.cross_slicing_specs.iter().enumerate() {
            validate_cross_slicing_spec(spec, &root.field("cross_slicing_specs").index(i))?;
            if index.cross_keys.insert(spec.canonical()) {
                index.cross_slices.push(spec.clone());
            }
        }

        tracing::debug!(
            slices = index.slices.len(),
            cross_slices = index.cross_slices.len(),
            "Indexed slice declarations"
        );
        Ok(index)
    }

    /// Resolve a reference to a declared slice.
    pub(crate) fn resolve(&self, spec: &SlicingSpec, path: &FieldPath) -> Result<SlicingSpec> {
        validate_slicing_spec(spec, path)?;
        if spec.is_overall() || self.slice_keys.contains(&spec.canonical()) {
            Ok(spec.clone())
        } else {
            Err(ConfigError::UnresolvedSliceReference {
                path: path.clone(),
                slice: spec.to_string(),
            })
        }
    }

    /// Resolve a reference to a declared cross-slice comparison.
    pub(crate) fn resolve_cross(
        &self,
        spec: &CrossSlicingSpec,
        path: &FieldPath,
    ) -> Result<CrossSlicingSpec> {
        validate_cross_slicing_spec(spec, path)?;
        if self.cross_keys.contains(&spec.canonical()) {
            Ok(spec.clone())
        } else {
            Err(ConfigError::UnresolvedSliceReference {
                path: path.clone(),
                slice: spec.to_string(),
            })
        }
    }

    pub(crate) fn slices(&self) -> &[SlicingSpec] {
        &self.slices
    }

    pub(crate) fn cross_slices(&self) -> &[CrossSlicingSpec] {
        &self.cross_slices
    }

    /// Every feature name any declared slice reads, sorted.
    pub(crate) fn feature_names(&self) -> BTreeSet<String> {
        self.slices
            .iter()
            .chain(
                self.cross_slices
                    .iter()
                    .flat_map(|cross| std::iter::once(&cross.baseline_spec).chain(&cross.slicing_specs)),
            )
            .flat_map(SlicingSpec::feature_names)
            .map(str::to_string)
            .collect()
    }
}
