//! Test discovery and execution engine
//!
//! The pipeline only talks to an engine through [`TestFramework`] and
//! [`FrontController`]. Both report progress by streaming messages over a
//! channel; discovery ends with `DiscoveryComplete`, execution with
//! `AssemblyFinished`.

mod manifest;
#[cfg(test)]
pub(crate) mod mock;

pub use manifest::ManifestFramework;

use async_trait::async_trait;

use crate::config::{AssemblyConfig, MethodDisplay};
use crate::error::RunnerError;
use crate::executor::CancelFlag;
use crate::models::{AssemblyDescriptor, DiscoverySender, ExecutionSender, TestCase};

/// Options handed to discovery
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryOptions {
    pub method_display: MethodDisplay,
}

impl From<&AssemblyConfig> for DiscoveryOptions {
    fn from(config: &AssemblyConfig) -> Self {
        Self {
            method_display: config.method_display,
        }
    }
}

/// Options handed to execution
#[derive(Clone, Debug)]
pub struct ExecutionOptions {
    /// Collection worker bound; 0 means unbounded
    pub max_parallel_threads: usize,
    pub disable_parallelization: bool,
    /// Polled before every test
    pub cancel: CancelFlag,
}

impl ExecutionOptions {
    pub fn new(config: &AssemblyConfig, cancel: CancelFlag) -> Self {
        Self {
            max_parallel_threads: config.max_parallel_threads,
            disable_parallelization: !config.parallelize_test_collections,
            cancel,
        }
    }
}

/// Opens assemblies
pub trait TestFramework: Send + Sync {
    /// Load an assembly. The controller owns every resource it needs and
    /// releases them when dropped.
    fn open(&self, assembly: &AssemblyDescriptor) -> Result<Box<dyn FrontController>, RunnerError>;
}

/// Handle to one opened assembly
#[async_trait]
pub trait FrontController: Send + Sync {
    /// Enumerate all test cases, finishing with `DiscoveryComplete`
    async fn find(&self, options: DiscoveryOptions, sink: DiscoverySender) -> Result<(), RunnerError>;

    /// Run `tests`, finishing with `AssemblyFinished`
    async fn run_tests(
        &self,
        tests: Vec<TestCase>,
        options: ExecutionOptions,
        sink: ExecutionSender,
    ) -> Result<(), RunnerError>;
}
