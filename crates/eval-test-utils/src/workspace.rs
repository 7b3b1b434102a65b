//! [`TestWorkspace`] for tests that read and write configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use eval_schema::{ConfigStore, EvalConfig};
use tempfile::TempDir;

/// A temporary directory holding configuration files and run outputs.
///
/// # Example
///
/// ```rust
/// use eval_test_utils::TestWorkspace;
/// use eval_test_utils::fixtures::CANDIDATE_AND_BASELINE_TOML;
///
/// let workspace = TestWorkspace::new();
/// let path = workspace.write_file("eval.toml", CANDIDATE_AND_BASELINE_TOML);
/// assert!(path.exists());
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory for run outputs, created on first use.
    pub fn output_dir(&self) -> PathBuf {
        let dir = self.root().join("output");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Write raw text to `name` (relative to the root) and return its path.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Save `config` to `name`; the extension picks the format.
    pub fn write_config(&self, name: &str, config: &EvalConfig) -> PathBuf {
        let path = self.root().join(name);
        ConfigStore::new()
            .save(&path, config)
            .unwrap_or_else(|e| panic!("Could not save {}: {e}", path.display()));
        path
    }

    /// Parse the JSON file at `name` without going through the typed model.
    pub fn read_json(&self, name: &str) -> serde_json::Value {
        let path = self.root().join(name);
        let content = fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", path.display()));
        serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("Invalid JSON in {}: {e}", path.display()))
    }

    /// Assert that `name` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, name: &str) {
        let path = self.root().join(name);
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }
}
