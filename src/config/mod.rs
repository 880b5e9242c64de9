//! Configuration module
//!
//! Per-assembly execution settings, runner-wide defaults and environment
//! overrides.

mod env;
mod file;

pub use env::EnvConfig;
pub use file::RunnerConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How discovered tests are named when the manifest gives no display name
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodDisplay {
    #[default]
    ClassAndMethod,
    Method,
}

impl std::fmt::Display for MethodDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MethodDisplay::ClassAndMethod => write!(f, "ClassAndMethod"),
            MethodDisplay::Method => write!(f, "Method"),
        }
    }
}

/// Execution settings for one assembly, read from its configuration file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Allow this assembly to run alongside others
    #[serde(alias = "parallelizeAssembly")]
    pub parallelize_assembly: bool,

    /// Run test collections of this assembly concurrently
    #[serde(alias = "parallelizeTestCollections")]
    pub parallelize_test_collections: bool,

    /// Collection worker bound; 0 means unbounded
    #[serde(alias = "maxParallelThreads")]
    pub max_parallel_threads: usize,

    /// Print option details while discovering
    #[serde(alias = "diagnosticMessages")]
    pub diagnostic_messages: bool,

    #[serde(alias = "methodDisplay")]
    pub method_display: MethodDisplay,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            parallelize_assembly: false,
            parallelize_test_collections: true,
            max_parallel_threads: default_max_threads(),
            diagnostic_messages: false,
            method_display: MethodDisplay::default(),
        }
    }
}

fn default_max_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl AssemblyConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        Ok(config)
    }
}

/// Check if file is YAML based on extension
pub(crate) fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

/// Suffixes that mark a file as an assembly configuration file
const CONFIG_SUFFIXES: &[&str] = &[".runner.json", ".runner.yaml", ".runner.yml"];

/// Check if a positional argument names a configuration file
pub(crate) fn is_config_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    CONFIG_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Configuration file sitting next to an assembly (`<stem>.runner.json` etc.)
pub(crate) fn sibling_config_file(assembly: &Path) -> Option<PathBuf> {
    let stem = assembly.file_stem()?.to_string_lossy().into_owned();
    let dir = assembly.parent().unwrap_or_else(|| Path::new(""));
    CONFIG_SUFFIXES
        .iter()
        .map(|suffix| dir.join(format!("{stem}{suffix}")))
        .find(|candidate| candidate.is_file())
}
