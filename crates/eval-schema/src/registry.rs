//! Metric registry
//!
//! Maps a metric class (module + class name) to a descriptor of the
//! parameters its constructor accepts. The registry is an explicit value
//! handed to the resolver; there is no global lookup table.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::schema::MetricConfig;
use crate::{Error, Result};

/// Module searched first when a metric names no module.
pub const DEFAULT_MODULE: &str = "tfma.metrics";
/// Module searched second when a metric names no module.
pub const KERAS_MODULE: &str = "tf.keras.metrics";

/// Type of a constructor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    Str,
    IntList,
    FloatList,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Bool => "bool",
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::Str => "string",
            ParamKind::IntList => "list of int",
            ParamKind::FloatList => "list of float",
        };
        f.write_str(name)
    }
}

/// A type-checked parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
}

impl ParamValue {
    fn coerce(kind: ParamKind, value: &Value) -> Option<Self> {
        match kind {
            ParamKind::Bool => value.as_bool().map(ParamValue::Bool),
            ParamKind::Int => value.as_i64().map(ParamValue::Int),
            ParamKind::Float => value.as_f64().map(ParamValue::Float),
            ParamKind::Str => value.as_str().map(|s| ParamValue::Str(s.to_string())),
            ParamKind::IntList => value
                .as_array()?
                .iter()
                .map(Value::as_i64)
                .collect::<Option<Vec<_>>>()
                .map(ParamValue::IntList),
            ParamKind::FloatList => value
                .as_array()?
                .iter()
                .map(Value::as_f64)
                .collect::<Option<Vec<_>>>()
                .map(ParamValue::FloatList),
        }
    }
}

/// One accepted constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
}

/// What the registry knows about one metric class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub module: String,
    pub class_name: String,
    /// Name results are reported under unless a `name` parameter overrides it.
    pub default_name: String,
    pub params: Vec<ParamSpec>,
    /// Query-based metrics need `MetricsSpec::query_key`.
    pub requires_query_key: bool,
}

impl MetricDescriptor {
    /// A descriptor accepting only the optional `name` parameter.
    pub fn new(
        module: impl Into<String>,
        class_name: impl Into<String>,
        default_name: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            class_name: class_name.into(),
            default_name: default_name.into(),
            params: vec![ParamSpec {
                name: "name".to_string(),
                kind: ParamKind::Str,
                required: false,
            }],
            requires_query_key: false,
        }
    }

    pub fn param(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    pub fn required_param(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    pub fn requires_query_key(mut self) -> Self {
        self.requires_query_key = true;
        self
    }

    fn spec(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Type-check raw constructor parameters against this descriptor.
    pub fn check_params(
        &self,
        raw: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, ParamValue>> {
        let mut typed = BTreeMap::new();
        for (name, value) in raw {
            let spec = self.spec(name).ok_or_else(|| {
                Error::invalid_param(&self.class_name, name, "unknown parameter")
            })?;
            let checked = ParamValue::coerce(spec.kind, value).ok_or_else(|| {
                Error::invalid_param(
                    &self.class_name,
                    name,
                    format!("expected {}, got {}", spec.kind, value),
                )
            })?;
            typed.insert(name.clone(), checked);
        }

        if let Some(missing) = self
            .params
            .iter()
            .find(|p| p.required && !typed.contains_key(&p.name))
        {
            return Err(Error::invalid_param(
                &self.class_name,
                &missing.name,
                "required parameter is missing",
            ));
        }

        Ok(typed)
    }

    /// Name the metric is reported under given its checked parameters.
    pub fn metric_name(&self, params: &BTreeMap<String, ParamValue>) -> String {
        match params.get("name") {
            Some(ParamValue::Str(name)) if !name.is_empty() => name.clone(),
            _ => self.default_name.clone(),
        }
    }
}

/// Registry of metric classes, keyed by module and class name.
///
/// # Example
///
/// ```
/// use eval_schema::MetricRegistry;
///
/// let registry = MetricRegistry::with_builtins();
/// let auc = registry.lookup("AUC", None).unwrap();
/// assert_eq!(auc.module, "tfma.metrics");
/// assert_eq!(auc.default_name, "auc");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetricRegistry {
    descriptors: BTreeMap<(String, String), MetricDescriptor>,
    /// Modules in the order they are searched when a metric names none.
    search_order: Vec<String>,
}

impl MetricRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the common metrics registered.
    pub fn with_builtins() -> Self {
        use ParamKind::*;

        let mut registry = Self::new();
        let m = DEFAULT_MODULE;
        for descriptor in [
            MetricDescriptor::new(m, "ExampleCount", "example_count"),
            MetricDescriptor::new(m, "WeightedExampleCount", "weighted_example_count"),
            MetricDescriptor::new(m, "AUC", "auc")
                .param("num_thresholds", Int)
                .param("curve", Str)
                .param("summation_method", Str),
            MetricDescriptor::new(m, "AUCPrecisionRecall", "auc_precision_recall")
                .param("num_thresholds", Int),
            MetricDescriptor::new(m, "Precision", "precision")
                .param("thresholds", FloatList)
                .param("top_k", Int)
                .param("class_id", Int),
            MetricDescriptor::new(m, "Recall", "recall")
                .param("thresholds", FloatList)
                .param("top_k", Int)
                .param("class_id", Int),
            MetricDescriptor::new(m, "BinaryAccuracy", "binary_accuracy")
                .param("threshold", Float),
            MetricDescriptor::new(m, "MeanLabel", "mean_label"),
            MetricDescriptor::new(m, "MeanPrediction", "mean_prediction"),
            MetricDescriptor::new(m, "Calibration", "calibration"),
            MetricDescriptor::new(m, "CalibrationPlot", "calibration_plot")
                .param("num_buckets", Int)
                .param("left", Float)
                .param("right", Float),
            MetricDescriptor::new(m, "ConfusionMatrixPlot", "confusion_matrix_plot")
                .param("num_thresholds", Int),
            MetricDescriptor::new(
                m,
                "MultiClassConfusionMatrixPlot",
                "multi_class_confusion_matrix_plot",
            )
            .param("thresholds", FloatList),
            MetricDescriptor::new(m, "NDCG", "ndcg")
                .required_param("gain_key", Str)
                .param("top_k_list", IntList)
                .requires_query_key(),
            MetricDescriptor::new(m, "MeanSquaredError", "mean_squared_error"),
        ] {
            registry.register(descriptor);
        }

        let k = KERAS_MODULE;
        for descriptor in [
            MetricDescriptor::new(k, "AUC", "auc").param("num_thresholds", Int),
            MetricDescriptor::new(k, "BinaryCrossentropy", "binary_crossentropy")
                .param("from_logits", Bool)
                .param("label_smoothing", Float),
            MetricDescriptor::new(k, "MeanSquaredError", "mean_squared_error"),
            MetricDescriptor::new(k, "Precision", "precision")
                .param("thresholds", FloatList)
                .param("top_k", Int)
                .param("class_id", Int),
            MetricDescriptor::new(k, "Recall", "recall")
                .param("thresholds", FloatList)
                .param("top_k", Int)
                .param("class_id", Int),
        ] {
            registry.register(descriptor);
        }

        registry
    }

    /// Register a metric class.
    ///
    /// If the class was already registered in the same module, the previous
    /// descriptor is replaced. New modules are appended to the search order.
    pub fn register(&mut self, descriptor: MetricDescriptor) {
        if !self.search_order.contains(&descriptor.module) {
            self.search_order.push(descriptor.module.clone());
        }
        self.descriptors.insert(
            (descriptor.module.clone(), descriptor.class_name.clone()),
            descriptor,
        );
    }

    /// Find a metric class.
    ///
    /// With a module the lookup is exact; without one, modules are searched
    /// in order and the first match wins.
    pub fn lookup(&self, class_name: &str, module: Option<&str>) -> Option<&MetricDescriptor> {
        match module {
            Some(module) => self
                .descriptors
                .get(&(module.to_string(), class_name.to_string())),
            None => self.search_order.iter().find_map(|module| {
                self.descriptors
                    .get(&(module.clone(), class_name.to_string()))
            }),
        }
    }

    /// Find the descriptor for a configured metric.
    ///
    /// An empty `module` counts as unset.
    pub fn describe(&self, metric: &MetricConfig) -> Result<&MetricDescriptor> {
        let module = metric.module.as_deref().filter(|m| !m.is_empty());
        self.lookup(&metric.class_name, module)
            .ok_or_else(|| Error::UnknownMetric {
                class_name: match module {
                    Some(module) => format!("{module}.{}", metric.class_name),
                    None => metric.class_name.clone(),
                },
            })
    }

    /// Modules in search order.
    pub fn modules(&self) -> &[String] {
        &self.search_order
    }

    /// List registered classes as `module.Class`, sorted.
    pub fn list_metrics(&self) -> Vec<String> {
        self.descriptors
            .keys()
            .map(|(module, class)| format!("{module}.{class}"))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_registry_is_empty() {
        let registry = MetricRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.lookup("AUC", None).is_none());
    }

    #[test]
    fn test_builtins_search_default_module_first() {
        let registry = MetricRegistry::with_builtins();
        assert_eq!(registry.modules(), &[DEFAULT_MODULE, KERAS_MODULE]);

        let auc = registry.lookup("AUC", None).unwrap();
        assert_eq!(auc.module, DEFAULT_MODULE);

        let keras_auc = registry.lookup("AUC", Some(KERAS_MODULE)).unwrap();
        assert_eq!(keras_auc.module, KERAS_MODULE);

        let bce = registry.lookup("BinaryCrossentropy", None).unwrap();
        assert_eq!(bce.module, KERAS_MODULE);
    }

    #[test]
    fn test_explicit_module_is_exact() {
        let registry = MetricRegistry::with_builtins();
        assert!(registry.lookup("NDCG", Some(KERAS_MODULE)).is_none());
    }

    #[test]
    fn test_describe_treats_empty_module_as_unset() {
        let registry = MetricRegistry::with_builtins();
        let auc = registry.describe(&MetricConfig::new("AUC").in_module("")).unwrap();
        assert_eq!(auc.module, DEFAULT_MODULE);

        let err = registry
            .describe(&MetricConfig::new("Lift").in_module(""))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownMetric { class_name } if class_name == "Lift"));
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = MetricRegistry::new();
        registry.register(MetricDescriptor::new("custom", "Lift", "lift"));
        registry.register(MetricDescriptor::new("custom", "Lift", "lift_v2"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("Lift", None).unwrap().default_name, "lift_v2");
        assert_eq!(registry.list_metrics(), vec!["custom.Lift"]);
    }

    #[test]
    fn test_check_params_types_values() {
        let registry = MetricRegistry::with_builtins();
        let precision = registry.lookup("Precision", None).unwrap();
        let raw = BTreeMap::from([
            ("thresholds".to_string(), json!([0.25, 1])),
            ("top_k".to_string(), json!(3)),
            ("name".to_string(), json!("precision_at_3")),
        ]);
        let typed = precision.check_params(&raw).unwrap();
        assert_eq!(typed["thresholds"], ParamValue::FloatList(vec![0.25, 1.0]));
        assert_eq!(typed["top_k"], ParamValue::Int(3));
        assert_eq!(precision.metric_name(&typed), "precision_at_3");
    }

    #[test]
    fn test_check_params_rejects_unknown_and_mistyped() {
        let registry = MetricRegistry::with_builtins();
        let auc = registry.lookup("AUC", None).unwrap();

        let unknown = BTreeMap::from([("bogus".to_string(), json!(1))]);
        assert!(matches!(
            auc.check_params(&unknown),
            Err(Error::InvalidParam { param, .. }) if param == "bogus"
        ));

        let mistyped = BTreeMap::from([("num_thresholds".to_string(), json!("many"))]);
        let err = auc.check_params(&mistyped).unwrap_err();
        assert!(err.to_string().contains("expected int"));
    }

    #[test]
    fn test_check_params_requires_required() {
        let registry = MetricRegistry::with_builtins();
        let ndcg = registry.lookup("NDCG", None).unwrap();
        assert!(ndcg.requires_query_key);
        assert!(ndcg.check_params(&BTreeMap::new()).is_err());

        let raw = BTreeMap::from([("gain_key".to_string(), json!("gain"))]);
        let typed = ndcg.check_params(&raw).unwrap();
        assert_eq!(ndcg.metric_name(&typed), "ndcg");
    }

    #[test]
    fn test_describe_reports_qualified_name() {
        let registry = MetricRegistry::with_builtins();
        let metric = MetricConfig::new("Lift").in_module("custom");
        let err = registry.describe(&metric).unwrap_err();
        assert_eq!(err.to_string(), "Metric not registered: custom.Lift");
    }
}
