//! Model specifications
//!
//! A [`ModelSpec`] names one model under evaluation and tells the engine
//! where to find its labels, predictions and example weights.
//!
//! # Example TOML
//!
//! ```toml
//! [[model_specs]]
//! name = "candidate"
//! signature_name = "serving_default"
//! label_keys = { head_a = "label_a", head_b = "label_b" }
//! prediction_key = "probabilities"
//!
//! [[model_specs]]
//! name = "baseline"
//! is_baseline = true
//! label_key = "label"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Kind of serialized model. When absent the engine auto-detects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    TfKeras,
    TfLite,
    TfJs,
    TfGeneric,
    TfEstimator,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::TfKeras => "tf_keras",
            ModelType::TfLite => "tf_lite",
            ModelType::TfJs => "tf_js",
            ModelType::TfGeneric => "tf_generic",
            ModelType::TfEstimator => "tf_estimator",
        }
    }
}

impl FromStr for ModelType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tf_keras" | "keras" => Ok(ModelType::TfKeras),
            "tf_lite" | "tflite" => Ok(ModelType::TfLite),
            "tf_js" | "tfjs" => Ok(ModelType::TfJs),
            "tf_generic" => Ok(ModelType::TfGeneric),
            "tf_estimator" | "estimator" => Ok(ModelType::TfEstimator),
            _ => Err(Error::InvalidModelType {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to find one concern (label, prediction or example weight) of a model.
///
/// Either a single key shared by every output, or a key per output name.
/// A per-output map may carry a fallback key used for outputs the map does
/// not mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySpec {
    Single(String),
    PerOutput {
        keys: BTreeMap<String, String>,
        fallback: Option<String>,
    },
}

impl KeySpec {
    pub fn single(key: impl Into<String>) -> Self {
        KeySpec::Single(key.into())
    }

    pub fn per_output<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        KeySpec::PerOutput {
            keys: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            fallback: None,
        }
    }

    /// Attach a fallback key. A `Single` spec is returned unchanged.
    pub fn with_fallback(self, key: impl Into<String>) -> Self {
        match self {
            KeySpec::PerOutput { keys, .. } => KeySpec::PerOutput {
                keys,
                fallback: Some(key.into()),
            },
            single => single,
        }
    }

    /// Output names keyed in the per-output map. Empty for a `Single` spec.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        let keys = match self {
            KeySpec::Single(_) => None,
            KeySpec::PerOutput { keys, .. } => Some(keys),
        };
        keys.into_iter().flat_map(|keys| keys.keys().map(String::as_str))
    }

    /// Build from the singular / map field pair of the wire form.
    ///
    /// Empty strings count as unset.
    pub fn from_parts(single: Option<String>, keys: BTreeMap<String, String>) -> Option<Self> {
        let single = single.filter(|k| !k.is_empty());
        match (single, keys.is_empty()) {
            (None, true) => None,
            (Some(key), true) => Some(KeySpec::Single(key)),
            (fallback, false) => Some(KeySpec::PerOutput { keys, fallback }),
        }
    }

    /// Split back into the singular / map field pair.
    pub fn into_parts(self) -> (Option<String>, BTreeMap<String, String>) {
        match self {
            KeySpec::Single(key) => (Some(key), BTreeMap::new()),
            KeySpec::PerOutput { keys, fallback } => (fallback, keys),
        }
    }
}

fn split(spec: Option<KeySpec>) -> (Option<String>, BTreeMap<String, String>) {
    spec.map(KeySpec::into_parts).unwrap_or_default()
}

/// Padding value used when batching ragged labels or predictions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaddingValue {
    Int(i64),
    Float(f64),
}

/// Padding applied to labels and predictions of unequal length.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "PaddingOptionsWire", into = "PaddingOptionsWire")]
pub struct PaddingOptions {
    pub label: Option<PaddingValue>,
    pub prediction: Option<PaddingValue>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct PaddingOptionsWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    label_int_padding: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label_float_padding: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prediction_int_padding: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prediction_float_padding: Option<f64>,
}

fn padding_value(
    side: &str,
    int: Option<i64>,
    float: Option<f64>,
) -> std::result::Result<Option<PaddingValue>, String> {
    match (int, float) {
        (Some(_), Some(_)) => Err(format!(
            "only one of {side}_int_padding and {side}_float_padding may be set"
        )),
        (Some(i), None) => Ok(Some(PaddingValue::Int(i))),
        (None, Some(f)) => Ok(Some(PaddingValue::Float(f))),
        (None, None) => Ok(None),
    }
}

impl TryFrom<PaddingOptionsWire> for PaddingOptions {
    type Error = String;

    fn try_from(wire: PaddingOptionsWire) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            label: padding_value("label", wire.label_int_padding, wire.label_float_padding)?,
            prediction: padding_value(
                "prediction",
                wire.prediction_int_padding,
                wire.prediction_float_padding,
            )?,
        })
    }
}

impl From<PaddingOptions> for PaddingOptionsWire {
    fn from(options: PaddingOptions) -> Self {
        let mut wire = PaddingOptionsWire::default();
        match options.label {
            Some(PaddingValue::Int(i)) => wire.label_int_padding = Some(i),
            Some(PaddingValue::Float(f)) => wire.label_float_padding = Some(f),
            None => {}
        }
        match options.prediction {
            Some(PaddingValue::Int(i)) => wire.prediction_int_padding = Some(i),
            Some(PaddingValue::Float(f)) => wire.prediction_float_padding = Some(f),
            None => {}
        }
        wire
    }
}

/// One model under evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "ModelSpecWire", into = "ModelSpecWire")]
pub struct ModelSpec {
    /// Alias used to refer to the model. Empty means "the only model".
    pub name: String,
    pub model_type: Option<ModelType>,
    pub signature_name: Option<String>,
    /// Applied in order before labels, predictions and slices are extracted.
    pub preprocessing_function_names: Vec<String>,
    pub label: Option<KeySpec>,
    pub prediction: Option<KeySpec>,
    pub example_weight: Option<KeySpec>,
    pub is_baseline: bool,
    pub padding_options: Option<PaddingOptions>,
    pub inference_batch_size: Option<u32>,
}

impl ModelSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn baseline(mut self) -> Self {
        self.is_baseline = true;
        self
    }

    pub fn with_label(mut self, spec: KeySpec) -> Self {
        self.label = Some(spec);
        self
    }

    pub fn with_prediction(mut self, spec: KeySpec) -> Self {
        self.prediction = Some(spec);
        self
    }

    pub fn with_example_weight(mut self, spec: KeySpec) -> Self {
        self.example_weight = Some(spec);
        self
    }

    pub fn with_preprocessing(mut self, function_name: impl Into<String>) -> Self {
        self.preprocessing_function_names.push(function_name.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ModelSpecWire {
    #[serde(skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_type: Option<ModelType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    preprocessing_function_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label_key: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    label_keys: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prediction_key: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    prediction_keys: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    example_weight_key: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    example_weight_keys: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    is_baseline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    padding_options: Option<PaddingOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inference_batch_size: Option<u32>,
}

impl From<ModelSpecWire> for ModelSpec {
    fn from(wire: ModelSpecWire) -> Self {
        Self {
            name: wire.name,
            model_type: wire.model_type,
            signature_name: wire.signature_name.filter(|s| !s.is_empty()),
            preprocessing_function_names: wire.preprocessing_function_names,
            label: KeySpec::from_parts(wire.label_key, wire.label_keys),
            prediction: KeySpec::from_parts(wire.prediction_key, wire.prediction_keys),
            example_weight: KeySpec::from_parts(wire.example_weight_key, wire.example_weight_keys),
            is_baseline: wire.is_baseline,
            padding_options: wire.padding_options,
            inference_batch_size: wire.inference_batch_size,
        }
    }
}

impl From<ModelSpec> for ModelSpecWire {
    fn from(spec: ModelSpec) -> Self {
        let (label_key, label_keys) = split(spec.label);
        let (prediction_key, prediction_keys) = split(spec.prediction);
        let (example_weight_key, example_weight_keys) = split(spec.example_weight);
        Self {
            name: spec.name,
            model_type: spec.model_type,
            signature_name: spec.signature_name,
            preprocessing_function_names: spec.preprocessing_function_names,
            label_key,
            label_keys,
            prediction_key,
            prediction_keys,
            example_weight_key,
            example_weight_keys,
            is_baseline: spec.is_baseline,
            padding_options: spec.padding_options,
            inference_batch_size: spec.inference_batch_size,
        }
    }
}
