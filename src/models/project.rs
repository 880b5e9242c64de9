//! Project and assembly descriptors
//!
//! A project is the ordered list of assemblies to run together with the
//! filters and output targets shared by all of them.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::AssemblyConfig;
use crate::error::RunnerError;
use crate::filter::FilterSet;

/// Parallelization requested on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ParallelismOption {
    /// Turn off all parallelization
    None,
    /// Only parallelize collections
    Collections,
    /// Only parallelize assemblies
    Assemblies,
    /// Parallelize collections and assemblies
    All,
}

impl ParallelismOption {
    pub fn assemblies(self) -> bool {
        matches!(self, ParallelismOption::Assemblies | ParallelismOption::All)
    }

    pub fn collections(self) -> bool {
        matches!(self, ParallelismOption::Collections | ParallelismOption::All)
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(ParallelismOption::None),
            "collections" => Some(ParallelismOption::Collections),
            "assemblies" => Some(ParallelismOption::Assemblies),
            "all" => Some(ParallelismOption::All),
            _ => None,
        }
    }
}

impl fmt::Display for ParallelismOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParallelismOption::None => "none",
            ParallelismOption::Collections => "collections",
            ParallelismOption::Assemblies => "assemblies",
            ParallelismOption::All => "all",
        };
        write!(f, "{name}")
    }
}

/// One assembly to discover and run
#[derive(Clone, Debug)]
pub struct AssemblyDescriptor {
    pub assembly_file: PathBuf,
    pub config_file: Option<PathBuf>,
    pub shadow_copy: bool,
    pub configuration: AssemblyConfig,
}

impl AssemblyDescriptor {
    pub fn new(assembly_file: impl Into<PathBuf>) -> Self {
        Self {
            assembly_file: assembly_file.into(),
            config_file: None,
            shadow_copy: true,
            configuration: AssemblyConfig::default(),
        }
    }

    /// Attach a configuration file and load its settings
    pub fn with_config_file(self, path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let configuration = AssemblyConfig::load(&path)?;
        let mut assembly = self.with_configuration(configuration);
        assembly.config_file = Some(path);
        Ok(assembly)
    }

    pub fn with_configuration(mut self, configuration: AssemblyConfig) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn without_shadow_copy(mut self) -> Self {
        self.shadow_copy = false;
        self
    }

    /// File name without extension, used for console lines and summary keys
    pub fn display_name(&self) -> String {
        display_name_of(&self.assembly_file)
    }
}

fn display_name_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Assemblies, filters and output targets for one run
#[derive(Clone, Debug)]
pub struct Project {
    assemblies: Vec<AssemblyDescriptor>,
    pub filters: FilterSet,
    pub output: BTreeMap<String, PathBuf>,
}

impl Project {
    pub fn new(assemblies: Vec<AssemblyDescriptor>, filters: FilterSet) -> Result<Self, RunnerError> {
        if assemblies.is_empty() {
            return Err(RunnerError::Usage(
                "must specify at least one assembly".to_string(),
            ));
        }
        Ok(Self {
            assemblies,
            filters,
            output: BTreeMap::new(),
        })
    }

    pub fn with_output(mut self, transform: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.output.insert(transform.into(), path.into());
        self
    }

    pub fn assemblies(&self) -> &[AssemblyDescriptor] {
        &self.assemblies
    }
}
