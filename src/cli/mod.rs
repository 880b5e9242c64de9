//! CLI argument parsing
//!
//! Defines command-line interface using clap. Single-dash spellings of the
//! long options (`-parallel all`, `-xml out.xml`) are rewritten before
//! parsing.

use anyhow::Result;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::{is_config_file, sibling_config_file, RunnerConfig};
use crate::error::RunnerError;
use crate::executor::{ListMode, RunOptions};
use crate::filter::FilterSet;
use crate::models::{AssemblyDescriptor, ParallelismOption, Project};

/// Discover, filter and run test assemblies
#[derive(Parser, Debug)]
#[command(name = "assembly-runner")]
#[command(version)]
#[command(about = "Discover, filter and run test assemblies")]
#[command(
    override_usage = "assembly-runner <assemblyFile> [configFile] [assemblyFile [configFile]...] [options]"
)]
#[command(long_about = None)]
pub struct Args {
    /// Assembly manifests, each optionally followed by its *.runner.{json,yaml,yml} file
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Set parallelization based on option
    #[arg(long, value_enum)]
    pub parallel: Option<ParallelismOption>,

    /// Maximum thread count for collection parallelization (0 = unbounded)
    #[arg(long, value_name = "COUNT", value_parser = parse_max_threads, allow_hyphen_values = true)]
    pub maxthreads: Option<usize>,

    /// Do not shadow copy assemblies
    #[arg(long)]
    pub noshadow: bool,

    /// Report results through the named visitor
    #[arg(long, value_name = "NAME")]
    pub visitor: Option<String>,

    /// Forces TeamCity mode (normally auto-detected)
    #[arg(long, conflicts_with = "visitor")]
    pub teamcity: bool,

    /// Wait for input after completion
    #[arg(long)]
    pub wait: bool,

    /// List the discovered tests instead of running them
    #[arg(long)]
    pub list: bool,

    /// List tests by fully-qualified name instead of running them
    #[arg(long = "list-fqn", conflicts_with = "list")]
    pub list_fqn: bool,

    /// Only run tests with matching name/value traits (repeatable, OR)
    #[arg(long = "trait", value_name = "name=value", value_parser = parse_trait)]
    pub traits: Vec<(String, String)>,

    /// Do not run tests with matching name/value traits (repeatable, AND)
    #[arg(long = "notrait", value_name = "name=value", value_parser = parse_trait)]
    pub notraits: Vec<(String, String)>,

    /// Run a given test method (fully qualified, repeatable)
    #[arg(long, value_name = "NAME")]
    pub method: Vec<String>,

    /// Run all methods in a given test class (fully qualified, repeatable)
    #[arg(long, value_name = "NAME")]
    pub class: Vec<String>,

    /// Run a test by display name (repeatable)
    #[arg(long, value_name = "NAME")]
    pub testname: Vec<String>,

    /// Output results to xUnit-style XML file
    #[arg(long, value_name = "FILE")]
    pub xml: Option<PathBuf>,

    /// Output results to JSON file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Output results to CSV file
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Runner defaults file (overrides the standard locations)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Long options that may also be written with a single dash
const LONG_OPTIONS: &[&str] = &[
    "parallel",
    "maxthreads",
    "noshadow",
    "visitor",
    "teamcity",
    "wait",
    "list",
    "list-fqn",
    "trait",
    "notrait",
    "method",
    "class",
    "testname",
    "xml",
    "json",
    "csv",
    "config",
    "verbose",
    "help",
    "version",
];

/// Rewrite `-name` to `--name` for known long options and `-?` to `--help`
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            let arg: OsString = arg.into();
            if i == 0 {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "-?" {
                return OsString::from("--help");
            }
            match text.strip_prefix('-') {
                Some(name) if !name.starts_with('-') => {
                    let lower = name.to_lowercase();
                    if LONG_OPTIONS.contains(&lower.as_str()) {
                        OsString::from(format!("--{lower}"))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}

/// Parse `name=value`; both sides must be non-empty
fn parse_trait(value: &str) -> std::result::Result<(String, String), String> {
    let invalid = || "incorrect argument format (should be \"name=value\")".to_string();
    let (name, trait_value) = value.split_once('=').ok_or_else(invalid)?;
    let (name, trait_value) = (name.trim(), trait_value.trim());
    if name.is_empty() || trait_value.is_empty() || trait_value.contains('=') {
        return Err(invalid());
    }
    Ok((name.to_string(), trait_value.to_string()))
}

fn parse_max_threads(value: &str) -> std::result::Result<usize, String> {
    let count: i64 = value
        .parse()
        .map_err(|_| format!("incorrect argument value {value} (must be a number)"))?;
    usize::try_from(count).map_err(|_| "incorrect argument value (must be >= 0)".to_string())
}

impl Args {
    /// Assemblies, their configuration files, filters and output targets
    pub fn to_project(&self) -> Result<Project> {
        let mut assemblies: Vec<AssemblyDescriptor> = Vec::new();

        for file in &self.files {
            if !file.exists() {
                return Err(RunnerError::Usage(format!("file not found: {}", file.display())).into());
            }

            if is_config_file(file) {
                let assembly = assemblies.pop().ok_or_else(|| {
                    RunnerError::Usage(format!(
                        "config file {} must follow an assembly file",
                        file.display()
                    ))
                })?;
                if assembly.config_file.is_some() {
                    return Err(RunnerError::Usage(format!(
                        "assembly {} already has a config file",
                        assembly.assembly_file.display()
                    ))
                    .into());
                }
                assemblies.push(assembly.with_config_file(file)?);
                continue;
            }

            let mut assembly = AssemblyDescriptor::new(file);
            if self.noshadow {
                assembly = assembly.without_shadow_copy();
            }
            assemblies.push(assembly);
        }

        let assemblies = assemblies
            .into_iter()
            .map(|assembly| match &assembly.config_file {
                None => match sibling_config_file(&assembly.assembly_file) {
                    Some(config) => assembly.with_config_file(config),
                    None => Ok(assembly),
                },
                Some(_) => Ok(assembly),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut project = Project::new(assemblies, self.filters())?;
        for (name, path) in [("xml", &self.xml), ("json", &self.json), ("csv", &self.csv)] {
            if let Some(path) = path {
                project = project.with_output(name, path);
            }
        }
        Ok(project)
    }

    pub fn filters(&self) -> FilterSet {
        let mut filters = FilterSet::new();
        for (name, value) in &self.traits {
            filters = filters.include_trait(name, value);
        }
        for (name, value) in &self.notraits {
            filters = filters.exclude_trait(name, value);
        }
        for name in &self.testname {
            filters = filters.include_name(name);
        }
        for class in &self.class {
            filters = filters.include_class(class);
        }
        for method in &self.method {
            filters = filters.include_method(method);
        }
        filters
    }

    /// Command line first, then the runner defaults
    pub fn run_options(&self, defaults: &RunnerConfig) -> RunOptions {
        let parallel = self.parallel.or(defaults.parallel);
        let visitor = if self.teamcity {
            Some("teamcity".to_string())
        } else {
            self.visitor.clone().or_else(|| defaults.visitor.clone())
        };
        let list = if self.list_fqn {
            Some(ListMode::FullyQualified)
        } else if self.list {
            Some(ListMode::DisplayName)
        } else {
            None
        };

        RunOptions {
            parallelize_assemblies: parallel.map(ParallelismOption::assemblies),
            parallelize_test_collections: parallel.map(ParallelismOption::collections),
            max_parallel_threads: self.maxthreads.or(defaults.max_threads),
            visitor,
            list,
        }
    }
}
