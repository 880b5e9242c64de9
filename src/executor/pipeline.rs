//! Per-assembly pipeline
//!
//! Open → discover → (list | filter → execute) for one assembly. Every error
//! is absorbed here: it is printed, the run is marked failed and sibling
//! assemblies carry on.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::RunContext;
use crate::config::AssemblyConfig;
use crate::engine::{DiscoveryOptions, ExecutionOptions, FrontController, TestFramework};
use crate::error::{error_category, RunnerError};
use crate::filter::FilterSet;
use crate::models::{
    AssemblyDescriptor, DiscoveryMessage, ExecutionMessage, ExecutionSummary, TestCase,
};
use crate::output::{AssemblyRecord, Color, RecordBuilder};
use crate::sink::{SinkContext, SinkFactory};

/// Where an assembly is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Discovering,
    Listing,
    Filtering,
    Executing,
    Finished,
    Failed,
}

/// How `--list` prints discovered tests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListMode {
    DisplayName,
    FullyQualified,
}

/// Run-wide settings applied to every assembly
#[derive(Clone, Debug, Default)]
pub struct PipelineSettings {
    /// Build an `AssemblyRecord` for output transforms
    pub needs_record: bool,
    pub list: Option<ListMode>,
    /// Overrides the assembly configuration when set
    pub parallelize_test_collections: Option<bool>,
    /// Overrides the assembly configuration when set
    pub max_parallel_threads: Option<usize>,
}

/// What happened to one assembly
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Cancelled before it started
    Skipped,
    Listed { count: usize },
    /// Nothing left after filtering
    NoTests,
    Completed {
        summary: ExecutionSummary,
        record: Option<AssemblyRecord>,
    },
    Failed,
}

/// Runs assemblies one at a time; cheap to clone into spawned tasks
#[derive(Clone)]
pub struct AssemblyPipeline {
    framework: Arc<dyn TestFramework>,
    filters: Arc<FilterSet>,
    sink: SinkFactory,
    settings: PipelineSettings,
    run: Arc<RunContext>,
}

struct Tracker<'a> {
    assembly: &'a str,
    state: PipelineState,
}

impl Tracker<'_> {
    fn enter(&mut self, next: PipelineState) {
        debug!("{}: {:?} -> {:?}", self.assembly, self.state, next);
        self.state = next;
    }
}

impl AssemblyPipeline {
    pub fn new(
        framework: Arc<dyn TestFramework>,
        filters: Arc<FilterSet>,
        sink: SinkFactory,
        settings: PipelineSettings,
        run: Arc<RunContext>,
    ) -> Self {
        Self {
            framework,
            filters,
            sink,
            settings,
            run,
        }
    }

    /// Run one assembly to completion, absorbing any error
    pub async fn run(&self, assembly: &AssemblyDescriptor) -> PipelineOutcome {
        let name = assembly.display_name();
        let mut tracker = Tracker {
            assembly: &name,
            state: PipelineState::Idle,
        };

        if self.run.is_cancelled() {
            debug!("{}: cancelled before start", name);
            tracker.enter(PipelineState::Finished);
            return PipelineOutcome::Skipped;
        }

        match self.execute(assembly, &mut tracker).await {
            Ok(outcome) => {
                tracker.enter(PipelineState::Finished);
                outcome
            }
            Err(err) => {
                tracker.enter(PipelineState::Failed);
                error!("{}: {:#}", name, err);
                self.run
                    .console()
                    .colored(Color::Red, format!("{}: {:#}", error_category(&err), err));
                self.run.mark_failed();
                PipelineOutcome::Failed
            }
        }
    }

    /// Assembly configuration with run-wide overrides applied
    fn effective_config(&self, assembly: &AssemblyDescriptor) -> AssemblyConfig {
        let mut config = assembly.configuration.clone();
        if let Some(parallel) = self.settings.parallelize_test_collections {
            config.parallelize_test_collections = parallel;
        }
        if let Some(max) = self.settings.max_parallel_threads {
            config.max_parallel_threads = max;
        }
        config
    }

    async fn execute(
        &self,
        assembly: &AssemblyDescriptor,
        tracker: &mut Tracker<'_>,
    ) -> Result<PipelineOutcome> {
        let name = assembly.display_name();
        let config = self.effective_config(assembly);

        tracker.enter(PipelineState::Discovering);
        {
            let mut console = self.run.console();
            if config.diagnostic_messages {
                console.line(format!(
                    "Discovering: {} (method display = {}, parallel test collections = {}, max threads = {})",
                    name,
                    config.method_display,
                    config.parallelize_test_collections,
                    config.max_parallel_threads
                ));
            } else {
                console.line(format!("Discovering: {name}"));
            }
        }
        // Dropped on every return path, which releases the shadow copy
        let controller = self.framework.open(assembly)?;
        let tests = discover(controller.as_ref(), DiscoveryOptions::from(&config)).await?;
        self.run.console().line(format!("Discovered:  {name}"));
        info!("{}: discovered {} test(s)", name, tests.len());

        if let Some(mode) = self.settings.list {
            tracker.enter(PipelineState::Listing);
            let mut console = self.run.console();
            for test in &tests {
                match mode {
                    ListMode::DisplayName => console.line(&test.display_name),
                    ListMode::FullyQualified => console.line(test.fully_qualified_name()),
                }
            }
            return Ok(PipelineOutcome::Listed { count: tests.len() });
        }

        tracker.enter(PipelineState::Filtering);
        let discovered = tests.len();
        let filtered = self.filters.apply(tests);
        if !self.filters.is_empty() {
            debug!("{}: filters selected {} of {} test(s)", name, filtered.len(), discovered);
        }
        if filtered.is_empty() {
            self.run
                .console()
                .colored(Color::Red, format!("ERROR:       {name} has no tests to run"));
            return Ok(PipelineOutcome::NoTests);
        }

        tracker.enter(PipelineState::Executing);
        let options = ExecutionOptions::new(&config, self.run.cancel_flag());
        let (summary, record) = self
            .execute_tests(controller.as_ref(), assembly, filtered, options)
            .await?;
        info!("{}: {} passed; {}", name, summary.passed(), summary);
        self.run.record_summary(name, summary);

        Ok(PipelineOutcome::Completed { summary, record })
    }

    async fn execute_tests(
        &self,
        controller: &dyn FrontController,
        assembly: &AssemblyDescriptor,
        tests: Vec<TestCase>,
        options: ExecutionOptions,
    ) -> Result<(ExecutionSummary, Option<AssemblyRecord>)> {
        let mut sink = (self.sink)(SinkContext {
            assembly_name: assembly.display_name(),
            run: self.run.clone(),
        });
        let mut builder = self
            .settings
            .needs_record
            .then(|| RecordBuilder::new(assembly));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let drain = async {
            let mut errors = 0;
            while let Some(message) = rx.recv().await {
                if matches!(message, ExecutionMessage::ErrorMessage { .. }) {
                    errors += 1;
                }
                sink.on_message(&message);
                if let Some(builder) = builder.as_mut() {
                    builder.observe(&message);
                }
                if let ExecutionMessage::AssemblyFinished { totals, .. } = message {
                    return Some(ExecutionSummary::from_totals(totals, errors));
                }
            }
            None
        };

        let (ran, summary) = tokio::join!(controller.run_tests(tests, options, tx), drain);
        ran?;
        let summary = summary.ok_or(RunnerError::ChannelClosed("AssemblyFinished"))?;
        Ok((summary, builder.map(RecordBuilder::finish)))
    }
}

/// Collect discovered tests until `DiscoveryComplete`
async fn discover(controller: &dyn FrontController, options: DiscoveryOptions) -> Result<Vec<TestCase>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let collect = async {
        let mut tests = Vec::new();
        while let Some(message) = rx.recv().await {
            match message {
                DiscoveryMessage::TestCaseDiscovered(test) => tests.push(test),
                DiscoveryMessage::DiscoveryComplete => return Some(tests),
            }
        }
        None
    };

    let (found, tests) = tokio::join!(controller.find(options, tx), collect);
    found?;
    Ok(tests.ok_or(RunnerError::ChannelClosed("DiscoveryComplete"))?)
}
