//! Result sinks ("visitors")
//!
//! A sink receives every execution message of one assembly and reports it
//! somewhere. Sinks are registered by name, each with optional environment
//! variables that select it automatically (for example on a CI server).

mod console;
mod json;
mod teamcity;

pub use console::ConsoleSink;
pub use json::JsonSink;
pub use teamcity::TeamCitySink;

use std::sync::Arc;
use tracing::debug;

use crate::error::RunnerError;
use crate::executor::RunContext;
use crate::models::ExecutionMessage;

/// Name of the sink used when nothing else is selected
pub const DEFAULT_SINK: &str = "console";

/// Receives the execution messages of one assembly
pub trait ResultSink: Send {
    fn on_message(&mut self, message: &ExecutionMessage);
}

/// What a sink is built from
#[derive(Clone)]
pub struct SinkContext {
    pub assembly_name: String,
    pub run: Arc<RunContext>,
}

/// Builds one sink per assembly
pub type SinkFactory = fn(SinkContext) -> Box<dyn ResultSink>;

struct Registration {
    name: &'static str,
    triggers: Vec<&'static str>,
    factory: SinkFactory,
}

/// The sink chosen for a run
#[derive(Clone, Copy)]
pub struct SelectedSink {
    pub name: &'static str,
    pub factory: SinkFactory,
}

impl std::fmt::Debug for SelectedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedSink").field("name", &self.name).finish()
    }
}

/// Sinks available to a run, in registration order
#[derive(Default)]
pub struct SinkRegistry {
    entries: Vec<Registration>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The console, TeamCity and JSON sinks
    pub fn builtin() -> Result<Self, RunnerError> {
        let mut registry = Self::new();
        registry.register(DEFAULT_SINK, &[], ConsoleSink::create)?;
        registry.register("teamcity", &["TEAMCITY_PROJECT_NAME"], TeamCitySink::create)?;
        registry.register("json", &[], JsonSink::create)?;
        Ok(registry)
    }

    /// Register a sink. Names are case-insensitive and must be unique.
    pub fn register(
        &mut self,
        name: &'static str,
        triggers: &[&'static str],
        factory: SinkFactory,
    ) -> Result<(), RunnerError> {
        if self.resolve(name).is_some() {
            return Err(RunnerError::DuplicateSink(name.to_string()));
        }
        self.entries.push(Registration {
            name,
            triggers: triggers.to_vec(),
            factory,
        });
        Ok(())
    }

    /// Look a sink up by name
    pub fn resolve(&self, name: &str) -> Option<SelectedSink> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| SelectedSink {
                name: entry.name,
                factory: entry.factory,
            })
    }

    /// First sink, in registration order, whose trigger is present
    pub fn recommended_with(&self, present: impl Fn(&str) -> bool) -> Option<SelectedSink> {
        self.entries
            .iter()
            .find(|entry| entry.triggers.iter().any(|key| present(key)))
            .map(|entry| SelectedSink {
                name: entry.name,
                factory: entry.factory,
            })
    }

    /// Pick the sink for a run: the named one, else the environment's
    /// recommendation, else the console
    pub fn select(&self, requested: Option<&str>) -> Result<SelectedSink, RunnerError> {
        self.select_with(requested, |key| std::env::var_os(key).is_some())
    }

    pub fn select_with(
        &self,
        requested: Option<&str>,
        present: impl Fn(&str) -> bool,
    ) -> Result<SelectedSink, RunnerError> {
        let selected = match requested {
            Some(name) => self.resolve(name).ok_or_else(|| {
                debug!("Registered visitors: {}", self.names().join(", "));
                RunnerError::UnknownSink(name.to_string())
            })?,
            None => match self.recommended_with(present) {
                Some(sink) => sink,
                None => self
                    .resolve(DEFAULT_SINK)
                    .ok_or_else(|| RunnerError::UnknownSink(DEFAULT_SINK.to_string()))?,
            },
        };
        debug!("Using visitor {}", selected.name);
        Ok(selected)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }
}
