//! In-memory engine for pipeline and orchestrator tests

use async_trait::async_trait;
use std::collections::HashMap;

use super::{DiscoveryOptions, ExecutionOptions, FrontController, TestFramework};
use crate::error::RunnerError;
use crate::models::{
    AssemblyDescriptor, AssemblyTotals, DiscoveryMessage, DiscoverySender, ExecutionMessage,
    ExecutionSender, TestCase,
};

/// Fixed per-test time so summaries do not depend on scheduling
pub const TEST_TIME: f64 = 0.01;

/// Behaviour of one mocked assembly
#[derive(Clone, Debug, Default)]
pub struct MockAssembly {
    pub tests: Vec<TestCase>,
    /// Class names whose tests fail
    pub failing_classes: Vec<String>,
    /// Error messages sent after the tests
    pub errors: Vec<String>,
    /// Fail when opened
    pub broken: bool,
    /// Request cancellation once all tests ran
    pub cancels: bool,
    /// Stop without sending `AssemblyFinished`
    pub truncated: bool,
}

impl MockAssembly {
    /// `count` tests in class `Mock`, the first `slow` tagged `category=slow`
    pub fn with_tests(count: usize, slow: usize) -> Self {
        let tests = (0..count)
            .map(|i| {
                let test = TestCase::new("Mock", format!("Test{i}"));
                if i < slow {
                    test.with_trait("category", "slow")
                } else {
                    test.with_trait("category", "fast")
                }
            })
            .collect();
        Self {
            tests,
            ..Default::default()
        }
    }

    pub fn failing(mut self, class: &str) -> Self {
        self.failing_classes.push(class.to_string());
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct MockFramework {
    assemblies: HashMap<String, MockAssembly>,
}

impl MockFramework {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register behaviour for the assembly whose display name is `name`
    pub fn with(mut self, name: &str, assembly: MockAssembly) -> Self {
        self.assemblies.insert(name.to_string(), assembly);
        self
    }
}

impl TestFramework for MockFramework {
    fn open(&self, assembly: &AssemblyDescriptor) -> Result<Box<dyn FrontController>, RunnerError> {
        let name = assembly.display_name();
        match self.assemblies.get(&name) {
            Some(mock) if !mock.broken => Ok(Box::new(MockController {
                name,
                mock: mock.clone(),
            })),
            _ => Err(RunnerError::AssemblyLoad {
                path: assembly.assembly_file.clone(),
                reason: "not a mocked assembly".to_string(),
            }),
        }
    }
}

struct MockController {
    name: String,
    mock: MockAssembly,
}

#[async_trait]
impl FrontController for MockController {
    async fn find(&self, _options: DiscoveryOptions, sink: DiscoverySender) -> Result<(), RunnerError> {
        for test in &self.mock.tests {
            let _ = sink.send(DiscoveryMessage::TestCaseDiscovered(test.clone()));
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
        let _ = sink.send(ExecutionMessage::AssemblyStarting {
            assembly: self.name.clone(),
            test_count: tests.len(),
        });

        let mut totals = AssemblyTotals::default();
        for test in tests {
            if options.cancel.is_cancelled() {
                break;
            }
            totals.total += 1;
            totals.time += TEST_TIME;
            let _ = sink.send(ExecutionMessage::TestStarting { test: test.clone() });

            let message = if let Some(reason) = test.skip_reason.clone() {
                totals.skipped += 1;
                ExecutionMessage::TestSkipped { test, reason }
            } else if self.mock.failing_classes.contains(&test.class_name) {
                totals.failed += 1;
                ExecutionMessage::TestFailed {
                    test,
                    time: TEST_TIME,
                    message: "assertion failed".to_string(),
                    output: String::new(),
                }
            } else {
                ExecutionMessage::TestPassed {
                    test,
                    time: TEST_TIME,
                    output: String::new(),
                }
            };
            let _ = sink.send(message);
        }

        for error in &self.mock.errors {
            let _ = sink.send(ExecutionMessage::ErrorMessage {
                message: error.clone(),
            });
        }
        if self.mock.cancels {
            options.cancel.request();
        }
        if !self.mock.truncated {
            let _ = sink.send(ExecutionMessage::AssemblyFinished {
                assembly: self.name.clone(),
                totals,
            });
        }
        Ok(())
    }
}
