//! assembly-runner - test assembly orchestrator
//!
//! Discovers the tests of one or more assemblies (YAML/JSON test manifests),
//! filters them, runs them with collection- and assembly-level parallelism,
//! streams results to a pluggable visitor and prints an aggregate summary.
//!
//! ## Usage
//!
//! ```bash
//! # Run every test of two assemblies in parallel
//! assembly-runner Sample.Tests.yaml Other.Tests.yaml --parallel all
//!
//! # Only slow tests, with a per-assembly configuration file
//! assembly-runner Sample.Tests.yaml Sample.runner.json --trait category=slow
//!
//! # Write an XML report, TeamCity service messages on stdout
//! assembly-runner Sample.Tests.yaml --teamcity --xml results.xml
//! ```

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};

mod cli;
mod config;
mod engine;
mod error;
mod executor;
mod filter;
mod models;
mod output;
mod sink;
mod utils;

use cli::Args;
use config::{EnvConfig, RunnerConfig};
use engine::ManifestFramework;
use executor::{Orchestrator, RunContext};
use output::Console;
use sink::SinkRegistry;
use utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() {
    let code = run().await;
    std::process::exit(code);
}

async fn run() -> i32 {
    print_banner();

    let raw: Vec<_> = std::env::args_os().collect();
    if raw.len() < 2 {
        let _ = Args::command().print_help();
        return 1;
    }

    let args = match Args::try_parse_from(cli::normalize_args(raw)) {
        Ok(args) => args,
        Err(err) => {
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = err.print();
                return 0;
            }
            let rendered = err.to_string();
            println!("{}", rendered.lines().next().unwrap_or("error: invalid arguments"));
            return 1;
        }
    };

    let env = EnvConfig::load();
    let defaults = match load_defaults(&args, &env) {
        Ok(defaults) => defaults,
        Err(err) => {
            println!("error: {err:#}");
            return 1;
        }
    };

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::from_str(&defaults.log_level).unwrap_or(LogLevel::Warn)
    };
    init_logger(level);
    if env.has_any() {
        debug!("Environment overrides: {:?}", env);
    }

    let code = match execute(&args, &defaults).await {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            println!("error: {err:#}");
            return 1;
        }
    };

    if args.wait {
        wait_for_enter();
    }
    code
}

fn print_banner() {
    println!(
        "{} {} (test assembly runner)",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    println!();
}

/// Defaults file (command line, then environment, then standard locations)
/// with environment overrides applied
fn load_defaults(args: &Args, env: &EnvConfig) -> Result<RunnerConfig> {
    let explicit = args
        .config
        .clone()
        .or_else(|| env.config_file.as_ref().map(PathBuf::from));
    let mut defaults = RunnerConfig::load_or_default(explicit.as_deref())?;
    env.apply(&mut defaults);
    Ok(defaults)
}

async fn execute(args: &Args, defaults: &RunnerConfig) -> Result<i32> {
    let project = args.to_project()?;

    let color = defaults.color && std::io::stdout().is_terminal();
    let run = Arc::new(RunContext::new(Console::stdout(color)));
    run.watch_ctrl_c();

    let orchestrator = Orchestrator::new(
        Arc::new(ManifestFramework),
        SinkRegistry::builtin()?,
        args.run_options(defaults),
        run,
    );
    orchestrator.run(&project).await
}

fn wait_for_enter() {
    println!();
    print!("Press ENTER to continue...");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
    println!();
}
