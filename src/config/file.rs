//! Runner defaults file
//!
//! Handles finding, loading, and validating the runner-wide defaults file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::is_yaml_file;
use crate::models::ParallelismOption;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./assembly-runner.yaml",
    "./assembly-runner.yml",
    "./.assembly-runner.yaml",
    "~/.config/assembly-runner/config.yaml",
    "~/.assembly-runner.yaml",
];

/// Runner-wide defaults
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// Visitor used when none is given on the command line
    #[serde(default)]
    pub visitor: Option<String>,

    /// Parallelization used when none is given on the command line
    #[serde(default)]
    pub parallel: Option<ParallelismOption>,

    /// Collection worker bound used when none is given on the command line
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Log filter level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Colourize console output
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_color() -> bool {
    true
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            visitor: None,
            parallel: None,
            max_threads: None,
            log_level: default_log_level(),
            color: default_color(),
        }
    }
}

impl RunnerConfig {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load from `explicit` if given, else from the first standard location,
    /// else defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match explicit.map(Path::to_path_buf).or_else(Self::find) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

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

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }

        if crate::utils::LogLevel::from_str(&self.log_level).is_none() {
            anyhow::bail!("Unknown log level in config: {}", self.log_level);
        }

        Ok(())
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_runner_config_default() {
        let config = RunnerConfig::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.log_level, "warn");
        assert!(config.color);
        assert!(config.visitor.is_none());
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("assembly-runner.yaml");
        std::fs::write(
            &path,
            "visitor: teamcity\nparallel: all\nmax_threads: 3\ncolor: false\n",
        )
        .unwrap();

        let config = RunnerConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.visitor.as_deref(), Some("teamcity"));
        assert_eq!(config.parallel, Some(ParallelismOption::All));
        assert_eq!(config.max_threads, Some(3));
        assert!(!config.color);
    }

    #[test]
    fn test_validate_rejects_unknown_version() {
        let config = RunnerConfig {
            version: "9.9".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_level() {
        let config = RunnerConfig {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
    }
}
