//! Run orchestration
//!
//! Fans assemblies out (in parallel or in project order), then prints the
//! summary, applies output transforms and computes the exit code.

use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::pipeline::{AssemblyPipeline, ListMode, PipelineOutcome, PipelineSettings};
use super::RunContext;
use crate::engine::TestFramework;
use crate::error::{error_category, RunnerError};
use crate::models::Project;
use crate::output::{transform, AssembliesRecord, AssemblyRecord, Color, SummaryReport};
use crate::sink::SinkRegistry;
use crate::utils::Timer;

/// Run-wide options; `None` defers to each assembly's configuration
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub parallelize_assemblies: Option<bool>,
    pub parallelize_test_collections: Option<bool>,
    pub max_parallel_threads: Option<usize>,
    pub visitor: Option<String>,
    pub list: Option<ListMode>,
}

pub struct Orchestrator {
    framework: Arc<dyn TestFramework>,
    sinks: SinkRegistry,
    options: RunOptions,
    run: Arc<RunContext>,
}

impl Orchestrator {
    pub fn new(
        framework: Arc<dyn TestFramework>,
        sinks: SinkRegistry,
        options: RunOptions,
        run: Arc<RunContext>,
    ) -> Self {
        Self {
            framework,
            sinks,
            options,
            run,
        }
    }

    /// Explicit option, else true only if every assembly allows it
    pub fn parallelize_assemblies(&self, project: &Project) -> bool {
        self.options.parallelize_assemblies.unwrap_or_else(|| {
            project
                .assemblies()
                .iter()
                .all(|a| a.configuration.parallelize_assembly)
        })
    }

    /// Run every assembly of `project` and return the process exit code.
    ///
    /// Fails only for problems found before any assembly starts (unknown
    /// visitor or output transform); everything later is absorbed.
    pub async fn run(&self, project: &Project) -> Result<i32> {
        let sink = self.sinks.select(self.options.visitor.as_deref())?;
        let mut transforms = Vec::new();
        for (name, path) in &project.output {
            let found = transform::find(name)
                .ok_or_else(|| RunnerError::Usage(format!("unknown output transform {name}")))?;
            transforms.push((found, path.clone()));
        }
        // Registration order, not command-line order
        transforms.sort_by_key(|(t, _)| {
            transform::available()
                .iter()
                .position(|a| a.name == t.name)
                .unwrap_or(usize::MAX)
        });

        let listing = self.options.list.is_some();
        let settings = PipelineSettings {
            needs_record: !transforms.is_empty() && !listing,
            list: self.options.list,
            parallelize_test_collections: self.options.parallelize_test_collections,
            max_parallel_threads: self.options.max_parallel_threads,
        };
        let pipeline = AssemblyPipeline::new(
            self.framework.clone(),
            Arc::new(project.filters.clone()),
            sink.factory,
            settings,
            self.run.clone(),
        );

        let parallel = self.parallelize_assemblies(project);
        info!(
            "Running {} assembl{} ({}), visitor = {}",
            project.assemblies().len(),
            if project.assemblies().len() == 1 { "y" } else { "ies" },
            if parallel { "parallel" } else { "sequential" },
            sink.name
        );

        let timer = Timer::start("run");
        let records = if parallel {
            self.run_parallel(&pipeline, project).await
        } else {
            self.run_sequential(&pipeline, project).await
        };
        let wall_clock = timer.stop();

        if !listing {
            let summaries = self.run.summaries();
            SummaryReport::new(&summaries, wall_clock).print(&mut self.run.console());
        }

        if !transforms.is_empty() && !listing {
            let record = AssembliesRecord::new(records);
            for (transform, path) in transforms {
                debug!("Applying {} ({})", transform.name, transform.description);
                if let Err(err) = transform.apply(&record, &path) {
                    error!("{:#}", err);
                    self.run
                        .console()
                        .colored(Color::Red, format!("{}: {:#}", error_category(&err), err));
                    self.run.mark_failed();
                }
            }
        }

        Ok(self.run.exit_code())
    }

    async fn run_sequential(
        &self,
        pipeline: &AssemblyPipeline,
        project: &Project,
    ) -> Vec<AssemblyRecord> {
        let mut records = Vec::new();
        for assembly in project.assemblies() {
            keep_record(pipeline.run(assembly).await, &mut records);
        }
        records
    }

    async fn run_parallel(&self, pipeline: &AssemblyPipeline, project: &Project) -> Vec<AssemblyRecord> {
        let handles: Vec<_> = project
            .assemblies()
            .iter()
            .cloned()
            .map(|assembly| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move { pipeline.run(&assembly).await })
            })
            .collect();

        // join_all keeps project order
        let mut records = Vec::new();
        for joined in join_all(handles).await {
            match joined {
                Ok(outcome) => keep_record(outcome, &mut records),
                Err(e) => {
                    error!("Assembly task failed: {}", e);
                    self.run.mark_failed();
                }
            }
        }
        records
    }
}

fn keep_record(outcome: PipelineOutcome, records: &mut Vec<AssemblyRecord>) {
    match outcome {
        PipelineOutcome::Completed { summary, record } => {
            debug!("Assembly completed: {}", summary);
            records.extend(record);
        }
        PipelineOutcome::Listed { count } => debug!("Listed {} test(s)", count),
        other => debug!("Assembly ended without results: {:?}", other),
    }
}
