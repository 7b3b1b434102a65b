//! Persisted record of a completed evaluation run
//!
//! The record is written once, after the run, as `eval_config.json` in the
//! output directory. Readers accept both the full [`EvalRun`] shape and the
//! narrower [`EvalConfigAndVersion`] shape: absent fields default and
//! unknown fields are ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::EvalConfig;
use crate::store::ConfigStore;
use crate::{Result, VERSION};

/// File name of the run record inside an output directory.
pub const EVAL_RUN_FILE: &str = "eval_config.json";

/// Configuration plus provenance of one completed run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalRun {
    pub eval_config: EvalConfig,
    pub version: String,
    pub data_location: String,
    pub file_format: String,
    /// Model name to model location.
    pub model_locations: BTreeMap<String, String>,
}

impl EvalRun {
    /// A record stamped with this crate's version.
    pub fn new(eval_config: EvalConfig) -> Self {
        Self {
            eval_config,
            version: VERSION.to_string(),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, location: impl Into<String>, file_format: impl Into<String>) -> Self {
        self.data_location = location.into();
        self.file_format = file_format.into();
        self
    }

    pub fn with_model_location(
        mut self,
        model_name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        self.model_locations
            .insert(model_name.into(), location.into());
        self
    }

    pub fn path_in(output_dir: &Path) -> PathBuf {
        output_dir.join(EVAL_RUN_FILE)
    }

    /// Write the record into `output_dir`, returning the file path.
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = Self::path_in(output_dir);
        ConfigStore::new().save(&path, self)?;
        tracing::info!(?path, version = %self.version, "Wrote eval run record");
        Ok(path)
    }

    /// Read the record from `output_dir`.
    pub fn read(output_dir: &Path) -> Result<Self> {
        ConfigStore::new().load(&Self::path_in(output_dir))
    }
}

/// The narrower record shape: configuration and version only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfigAndVersion {
    pub eval_config: EvalConfig,
    pub version: String,
}

impl EvalConfigAndVersion {
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = EvalRun::path_in(output_dir);
        ConfigStore::new().save(&path, self)?;
        Ok(path)
    }

    pub fn read(output_dir: &Path) -> Result<Self> {
        ConfigStore::new().load(&EvalRun::path_in(output_dir))
    }
}

impl From<EvalRun> for EvalConfigAndVersion {
    fn from(run: EvalRun) -> Self {
        Self {
            eval_config: run.eval_config,
            version: run.version,
        }
    }
}

impl From<EvalConfigAndVersion> for EvalRun {
    fn from(narrow: EvalConfigAndVersion) -> Self {
        Self {
            eval_config: narrow.eval_config,
            version: narrow.version,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ModelSpec;

    #[test]
    fn test_new_run_is_stamped_with_version() {
        let run = EvalRun::new(EvalConfig::default());
        assert_eq!(run.version, VERSION);
        assert!(run.data_location.is_empty());
    }

    #[test]
    fn test_full_record_reads_as_narrow_shape() {
        let run = EvalRun::new(EvalConfig::new().with_model(ModelSpec::named("m")))
            .with_data("/data/eval*.tfrecord", "tfrecords")
            .with_model_location("m", "/models/m");
        let json = serde_json::to_string(&run).unwrap();

        let narrow: EvalConfigAndVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(narrow, EvalConfigAndVersion::from(run));
    }

    #[test]
    fn test_narrow_record_reads_as_full_shape() {
        let narrow = EvalConfigAndVersion {
            eval_config: EvalConfig::new().with_model(ModelSpec::named("m")),
            version: "0.1.0".to_string(),
        };
        let json = serde_json::to_string(&narrow).unwrap();

        let run: EvalRun = serde_json::from_str(&json).unwrap();
        assert_eq!(run.version, "0.1.0");
        assert!(run.model_locations.is_empty());
        assert_eq!(run, EvalRun::from(narrow));
    }
}
