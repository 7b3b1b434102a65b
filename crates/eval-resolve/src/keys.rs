//! Label, prediction and example-weight key resolution

use eval_schema::schema::KeySpec;
use serde::Serialize;

use crate::error::{ConfigError, FieldPath, Result};
use crate::features::{FeatureCatalog, FeatureSource};

/// The three per-output keys a model spec can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyConcern {
    Label,
    Prediction,
    ExampleWeight,
}

impl KeyConcern {
    pub const ALL: [KeyConcern; 3] = [
        KeyConcern::Label,
        KeyConcern::Prediction,
        KeyConcern::ExampleWeight,
    ];

    /// Field holding the singular form.
    pub fn single_field(self) -> &'static str {
        match self {
            KeyConcern::Label => "label_key",
            KeyConcern::Prediction => "prediction_key",
            KeyConcern::ExampleWeight => "example_weight_key",
        }
    }

    /// Field holding the per-output map.
    pub fn map_field(self) -> &'static str {
        match self {
            KeyConcern::Label => "label_keys",
            KeyConcern::Prediction => "prediction_keys",
            KeyConcern::ExampleWeight => "example_weight_keys",
        }
    }
}

/// A feature name together with where to read it from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedKey {
    pub name: String,
    #[serde(flatten)]
    pub source: FeatureSource,
}

/// Keys of one model output. `None` leaves the choice to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResolvedOutputKeys {
    pub label: Option<ResolvedKey>,
    pub prediction: Option<ResolvedKey>,
    pub example_weight: Option<ResolvedKey>,
}

impl ResolvedOutputKeys {
    pub fn get(&self, concern: KeyConcern) -> Option<&ResolvedKey> {
        match concern {
            KeyConcern::Label => self.label.as_ref(),
            KeyConcern::Prediction => self.prediction.as_ref(),
            KeyConcern::ExampleWeight => self.example_weight.as_ref(),
        }
    }

    fn set(&mut self, concern: KeyConcern, key: Option<ResolvedKey>) {
        match concern {
            KeyConcern::Label => self.label = key,
            KeyConcern::Prediction => self.prediction = key,
            KeyConcern::ExampleWeight => self.example_weight = key,
        }
    }
}

/// Pick the key `spec` assigns to `output`.
///
/// An exact map entry wins, then the singular fallback. For the default
/// output `""` a single-entry map behaves like the singular form.
pub fn resolve_key(
    spec: Option<&KeySpec>,
    concern: KeyConcern,
    output: &str,
    model_path: &FieldPath,
) -> Result<Option<String>> {
    let Some(spec) = spec else {
        return Ok(None);
    };
    match spec {
        KeySpec::Single(key) => Ok(Some(key.clone())),
        KeySpec::PerOutput { keys, fallback } => {
            if let Some(key) = keys.get(output) {
                return Ok(Some(key.clone()));
            }
            if let Some(key) = fallback {
                return Ok(Some(key.clone()));
            }
            if output.is_empty() && keys.len() == 1 {
                return Ok(keys.values().next().cloned());
            }
            Err(ConfigError::KeyResolution {
                path: model_path.field(concern.map_field()),
                output: output.to_string(),
            })
        }
    }
}

/// Resolve every concern of one output, tagging each key with its source.
pub(crate) fn resolve_output_keys(
    specs: [Option<&KeySpec>; 3],
    output: &str,
    functions: &[String],
    catalog: &FeatureCatalog,
    model_path: &FieldPath,
) -> Result<ResolvedOutputKeys> {
    let mut keys = ResolvedOutputKeys::default();
    for (concern, spec) in KeyConcern::ALL.into_iter().zip(specs) {
        let key = resolve_key(spec, concern, output, model_path)?.map(|name| ResolvedKey {
            source: catalog.source_of(&name, functions),
            name,
        });
        keys.set(concern, key);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn model_path() -> FieldPath {
        FieldPath::root().field("model_specs").index(0)
    }

    #[test]
    fn test_single_applies_to_every_output() {
        let spec = KeySpec::single("label");
        for output in ["", "head_a", "head_b"] {
            assert_eq!(
                resolve_key(Some(&spec), KeyConcern::Label, output, &model_path()).unwrap(),
                Some("label".to_string())
            );
        }
    }

    #[test]
    fn test_unset_concern_resolves_to_none() {
        assert_eq!(
            resolve_key(None, KeyConcern::Prediction, "head_a", &model_path()).unwrap(),
            None
        );
    }

    #[test]
    fn test_per_output_lookup_and_error_path() {
        let spec = KeySpec::per_output([("out1", "l1"), ("out2", "l2")]);
        assert_eq!(
            resolve_key(Some(&spec), KeyConcern::Label, "out2", &model_path()).unwrap(),
            Some("l2".to_string())
        );

        let err = resolve_key(Some(&spec), KeyConcern::Label, "out3", &model_path()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::KeyResolution {
                path: model_path().field("label_keys"),
                output: "out3".into(),
            }
        );
        assert_eq!(err.path().to_string(), "model_specs[0].label_keys");
    }

    #[test]
    fn test_fallback_covers_missing_outputs() {
        let spec = KeySpec::per_output([("out1", "l1")]).with_fallback("label");
        assert_eq!(
            resolve_key(Some(&spec), KeyConcern::Label, "out9", &model_path()).unwrap(),
            Some("label".to_string())
        );
    }

    #[test]
    fn test_single_entry_map_serves_default_output() {
        let spec = KeySpec::per_output([("", "label")]);
        assert_eq!(
            resolve_key(Some(&spec), KeyConcern::Label, "", &model_path()).unwrap(),
            Some("label".to_string())
        );

        let named = KeySpec::per_output([("head", "label")]);
        assert_eq!(
            resolve_key(Some(&named), KeyConcern::Label, "", &model_path()).unwrap(),
            Some("label".to_string())
        );

        let two = KeySpec::per_output([("a", "la"), ("b", "lb")]);
        assert!(resolve_key(Some(&two), KeyConcern::Label, "", &model_path()).is_err());
    }

    #[test]
    fn test_output_keys_carry_sources() {
        let catalog = FeatureCatalog::new().with_function("reweight", ["w"]);
        let label = KeySpec::single("label");
        let weight = KeySpec::single("w");
        let keys = resolve_output_keys(
            [Some(&label), None, Some(&weight)],
            "",
            &["reweight".to_string()],
            &catalog,
            &model_path(),
        )
        .unwrap();

        assert_eq!(keys.get(KeyConcern::Label).unwrap().source, FeatureSource::Raw);
        assert!(keys.prediction.is_none());
        assert_eq!(
            keys.example_weight.unwrap().source,
            FeatureSource::Preprocessed {
                function: "reweight".into()
            }
        );
    }
}
