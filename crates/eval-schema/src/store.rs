//! Format-agnostic configuration loading and saving

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

/// Serialization format, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Detect the format of `path`:
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    /// - `.yaml`, `.yml` -> YAML
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        match extension.to_lowercase().as_str() {
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFormat::Toml => write!(f, "TOML"),
            ConfigFormat::Json => write!(f, "JSON"),
            ConfigFormat::Yaml => write!(f, "YAML"),
        }
    }
}

/// Loads and saves configuration documents, picking the format from the
/// file extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load a document from `path`.
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let format = ConfigFormat::from_path(path)?;
        if !path.is_file() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        tracing::debug!(?path, %format, "Loading config");
        Self::parse(&content, format).map_err(|message| Error::ConfigParse {
            path: path.to_path_buf(),
            format: format.to_string(),
            message,
        })
    }

    /// Parse a document already held in memory.
    pub fn parse<T: DeserializeOwned>(
        content: &str,
        format: ConfigFormat,
    ) -> std::result::Result<T, String> {
        match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        }
    }

    /// Save a document to `path` atomically.
    pub fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let format = ConfigFormat::from_path(path)?;
        let serialize_error = |message: String| Error::ConfigSerialize {
            path: path.to_path_buf(),
            format: format.to_string(),
            message,
        };

        let content = match format {
            ConfigFormat::Toml => {
                toml::to_string_pretty(value).map_err(|e| serialize_error(e.to_string()))?
            }
            ConfigFormat::Json => {
                serde_json::to_string_pretty(value).map_err(|e| serialize_error(e.to_string()))?
            }
            ConfigFormat::Yaml => {
                serde_yaml::to_string(value).map_err(|e| serialize_error(e.to_string()))?
            }
        };

        tracing::debug!(?path, %format, "Saving config");
        write_atomic(path, content.as_bytes())
    }
}

/// Write content atomically to a file with locking.
///
/// Writes a temp file in the same directory, then renames it over the
/// target. An advisory lock is held on the temp file while writing.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let result = write_locked_then_rename(&temp_path, path, content);
    if result.is_err() {
        // Nothing to report if the temp file was never created
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_locked_then_rename(temp_path: &Path, path: &Path, content: &[u8]) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file
        .lock_exclusive()
        .map_err(|_| Error::LockFailed {
            path: path.to_path_buf(),
        })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(temp_path, e))?;

    FileExt::unlock(&temp_file).map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;
    drop(temp_file);

    fs::rename(temp_path, path).map_err(|e| Error::io(path, e))?;

    Ok(())
}
