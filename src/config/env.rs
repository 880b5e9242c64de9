//! Environment variable configuration
//!
//! Provides environment variable overrides for the runner defaults.

use std::env;

use super::RunnerConfig;
use crate::models::ParallelismOption;

/// Environment variable prefix
const ENV_PREFIX: &str = "ASSEMBLY_RUNNER";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvConfig {
    /// Parallelization from ASSEMBLY_RUNNER_PARALLEL
    pub parallel: Option<ParallelismOption>,
    /// Collection worker bound from ASSEMBLY_RUNNER_MAXTHREADS
    pub max_threads: Option<usize>,
    /// Visitor from ASSEMBLY_RUNNER_VISITOR
    pub visitor: Option<String>,
    /// Log level from ASSEMBLY_RUNNER_LOG
    pub log_level: Option<String>,
    /// Colour switch from ASSEMBLY_RUNNER_NO_COLOR
    pub no_color: Option<bool>,
    /// Defaults file from ASSEMBLY_RUNNER_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            parallel: get_env("PARALLEL").and_then(|v| ParallelismOption::from_str(&v)),
            max_threads: get_env_parse("MAXTHREADS"),
            visitor: get_env("VISITOR"),
            log_level: get_env("LOG"),
            no_color: get_env_bool("NO_COLOR"),
            config_file: get_env("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.parallel.is_some()
            || self.max_threads.is_some()
            || self.visitor.is_some()
            || self.log_level.is_some()
            || self.no_color.is_some()
            || self.config_file.is_some()
    }

    /// Overlay the environment onto file defaults
    pub fn apply(&self, config: &mut RunnerConfig) {
        if let Some(parallel) = self.parallel {
            config.parallel = Some(parallel);
        }
        if let Some(max_threads) = self.max_threads {
            config.max_threads = Some(max_threads);
        }
        if let Some(visitor) = &self.visitor {
            config.visitor = Some(visitor.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(no_color) = self.no_color {
            config.color = !no_color;
        }
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Builder for setting environment variables in tests
#[cfg(test)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

#[cfg(test)]
impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    /// Set a raw variable (no prefix)
    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.push((key.into(), value.into()));
        self
    }

    /// Set a prefixed runner variable
    pub fn runner(self, name: &str, value: impl Into<String>) -> Self {
        self.var(format!("{ENV_PREFIX}_{name}"), value)
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        for (key, value) in self.vars {
            env::set_var(key, value);
        }

        EnvGuard { previous }
    }
}

/// Guard that restores environment variables on drop
#[cfg(test)]
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}
