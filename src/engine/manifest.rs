//! Manifest-backed engine
//!
//! An assembly is a YAML or JSON file listing test cases. A test passes when
//! its shell command exits with status 0 (or when it has no command), and is
//! skipped when it carries a skip reason.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::{DiscoveryOptions, ExecutionOptions, FrontController, TestFramework};
use crate::config::{is_yaml_file, MethodDisplay};
use crate::error::RunnerError;
use crate::executor::CancelFlag;
use crate::models::{
    AssemblyDescriptor, AssemblyTotals, DiscoveryMessage, DiscoverySender, ExecutionMessage,
    ExecutionSender, TestCase, TraitMap,
};
use crate::utils::Timer;

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    tests: Vec<TestDefinition>,
}

#[derive(Debug, Deserialize)]
struct TestDefinition {
    class: String,
    method: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    collection: Option<String>,
    #[serde(default)]
    traits: TraitMap,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    skip: Option<String>,
}

impl TestDefinition {
    fn to_test_case(&self, method_display: MethodDisplay) -> TestCase {
        let mut test = TestCase::new(&self.class, &self.method);
        let display_name = match (&self.display_name, method_display) {
            (Some(name), _) => name.clone(),
            (None, MethodDisplay::ClassAndMethod) => test.fully_qualified_name(),
            (None, MethodDisplay::Method) => self.method.clone(),
        };
        test = test.with_display_name(display_name);
        if let Some(collection) = &self.collection {
            test = test.in_collection(collection);
        }
        if let Some(command) = &self.command {
            test = test.with_command(command);
        }
        if let Some(reason) = &self.skip {
            test = test.skipped(reason);
        }
        for (name, value) in self.traits.iter() {
            test = test.with_trait(name, value);
        }
        test
    }
}

/// Engine that reads test manifests
#[derive(Clone, Copy, Debug, Default)]
pub struct ManifestFramework;

impl TestFramework for ManifestFramework {
    fn open(&self, assembly: &AssemblyDescriptor) -> Result<Box<dyn FrontController>, RunnerError> {
        Ok(Box::new(ManifestController::open(assembly)?))
    }
}

/// One opened manifest
pub struct ManifestController {
    assembly_name: String,
    manifest: Manifest,
    working_dir: PathBuf,
    // Removed when the controller is dropped
    _shadow: Option<TempDir>,
}

impl ManifestController {
    fn open(assembly: &AssemblyDescriptor) -> Result<Self, RunnerError> {
        let path = &assembly.assembly_file;
        let load_error = |reason: String| RunnerError::AssemblyLoad {
            path: path.clone(),
            reason,
        };

        let (shadow, read_from) = if assembly.shadow_copy {
            let dir = TempDir::new().map_err(|e| load_error(e.to_string()))?;
            let file_name = path
                .file_name()
                .ok_or_else(|| load_error("not a file".to_string()))?;
            let copy = dir.path().join(file_name);
            std::fs::copy(path, &copy).map_err(|e| load_error(e.to_string()))?;
            debug!("Shadow copied {} to {}", path.display(), copy.display());
            (Some(dir), copy)
        } else {
            (None, path.clone())
        };

        let content = std::fs::read_to_string(&read_from).map_err(|e| load_error(e.to_string()))?;
        let manifest = parse_manifest(&read_from, &content).map_err(load_error)?;

        let working_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            assembly_name: assembly.display_name(),
            manifest,
            working_dir,
            _shadow: shadow,
        })
    }
}

fn parse_manifest(path: &Path, content: &str) -> Result<Manifest, String> {
    if is_yaml_file(path) {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl FrontController for ManifestController {
    async fn find(&self, options: DiscoveryOptions, sink: DiscoverySender) -> Result<(), RunnerError> {
        for definition in &self.manifest.tests {
            let test = definition.to_test_case(options.method_display);
            let _ = sink.send(DiscoveryMessage::TestCaseDiscovered(test));
        }
        let _ = sink.send(DiscoveryMessage::DiscoveryComplete);
        Ok(())
    }

    async fn run_tests(
        &self,
        tests: Vec<TestCase>,
        options: ExecutionOptions,
        sink: ExecutionSender,
    ) -> Result<(), RunnerError> {
        let timer = Timer::start(format!("execute {}", self.assembly_name));
        let _ = sink.send(ExecutionMessage::AssemblyStarting {
            assembly: self.assembly_name.clone(),
            test_count: tests.len(),
        });

        let counters = Arc::new(Counters::default());
        let context = CollectionContext {
            working_dir: self.working_dir.clone(),
            sink: sink.clone(),
            cancel: options.cancel.clone(),
            counters: counters.clone(),
        };

        let collections = group_by_collection(tests);
        debug!(
            "{}: {} collection(s), parallel = {}, max threads = {}",
            self.assembly_name,
            collections.len(),
            !options.disable_parallelization,
            options.max_parallel_threads
        );

        if options.disable_parallelization {
            for (_, tests) in collections {
                run_collection(tests, context.clone()).await;
            }
        } else {
            let semaphore = Arc::new(Semaphore::new(collection_permits(
                options.max_parallel_threads,
            )));
            let mut handles = Vec::new();

            for (name, tests) in collections {
                let semaphore = semaphore.clone();
                let context = context.clone();
                let handle = tokio::spawn(async move {
                    // Closed only if the semaphore is dropped, which it is not
                    let _permit = semaphore.acquire_owned().await.ok();
                    debug!("Running collection {}", name);
                    run_collection(tests, context).await;
                });
                handles.push(handle);
            }

            for joined in join_all(handles).await {
                if let Err(e) = joined {
                    warn!("Collection task failed: {}", e);
                    let _ = sink.send(ExecutionMessage::ErrorMessage {
                        message: format!("collection task failed: {e}"),
                    });
                }
            }
        }

        let totals = counters.totals(timer.stop().as_secs_f64());
        let _ = sink.send(ExecutionMessage::AssemblyFinished {
            assembly: self.assembly_name.clone(),
            totals,
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Counters {
    total: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

impl Counters {
    fn totals(&self, time: f64) -> AssemblyTotals {
        AssemblyTotals {
            total: self.total.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            time,
        }
    }
}

#[derive(Clone)]
struct CollectionContext {
    working_dir: PathBuf,
    sink: ExecutionSender,
    cancel: CancelFlag,
    counters: Arc<Counters>,
}

/// Semaphore size for a worker bound; 0 and oversized bounds mean unbounded
fn collection_permits(max_parallel_threads: usize) -> usize {
    match max_parallel_threads {
        0 => Semaphore::MAX_PERMITS,
        n => n.min(Semaphore::MAX_PERMITS),
    }
}

/// Group tests by collection, keeping first-seen collection order
fn group_by_collection(tests: Vec<TestCase>) -> Vec<(String, Vec<TestCase>)> {
    let mut groups: Vec<(String, Vec<TestCase>)> = Vec::new();
    for test in tests {
        match groups.iter_mut().find(|(name, _)| *name == test.collection) {
            Some((_, members)) => members.push(test),
            None => groups.push((test.collection.clone(), vec![test])),
        }
    }
    groups
}

async fn run_collection(tests: Vec<TestCase>, context: CollectionContext) {
    for test in tests {
        if context.cancel.is_cancelled() {
            debug!("Cancellation requested; not starting {}", test);
            return;
        }
        run_test(test, &context).await;
    }
}

async fn run_test(test: TestCase, context: &CollectionContext) {
    let sink = &context.sink;
    let counters = &context.counters;
    let _ = sink.send(ExecutionMessage::TestStarting { test: test.clone() });
    counters.total.fetch_add(1, Ordering::SeqCst);

    if let Some(reason) = test.skip_reason.clone() {
        counters.skipped.fetch_add(1, Ordering::SeqCst);
        let _ = sink.send(ExecutionMessage::TestSkipped { test, reason });
        return;
    }

    let Some(command) = test.command.clone() else {
        let _ = sink.send(ExecutionMessage::TestPassed {
            test,
            time: 0.0,
            output: String::new(),
        });
        return;
    };

    let timer = Timer::start(test.display_name.clone());
    let result = shell_command(&command)
        .current_dir(&context.working_dir)
        .stdin(Stdio::null())
        .output()
        .await;
    let time = timer.elapsed_secs();

    let message = match result {
        Ok(output) => {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            let text = text.trim_end().to_string();

            if output.status.success() {
                ExecutionMessage::TestPassed {
                    test,
                    time,
                    output: text,
                }
            } else {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                ExecutionMessage::TestFailed {
                    test,
                    time,
                    message: format!("command exited with {}", output.status),
                    output: text,
                }
            }
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::SeqCst);
            ExecutionMessage::TestFailed {
                test,
                time,
                message: format!("could not start command `{command}`: {e}"),
                output: String::new(),
            }
        }
    };
    let _ = sink.send(message);
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}
