//! Discovery and execution messages
//!
//! Engines report progress by sending these over a channel. Discovery ends
//! with `DiscoveryComplete`, execution with `AssemblyFinished`.

use serde::Serialize;
use tokio::sync::mpsc;

use super::TestCase;

pub type DiscoverySender = mpsc::UnboundedSender<DiscoveryMessage>;
pub type ExecutionSender = mpsc::UnboundedSender<ExecutionMessage>;

/// Messages produced while enumerating an assembly
#[derive(Clone, Debug)]
pub enum DiscoveryMessage {
    TestCaseDiscovered(TestCase),
    DiscoveryComplete,
}

/// Counts reported by the engine when an assembly finishes
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AssemblyTotals {
    pub total: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Execution time in seconds
    pub time: f64,
}

/// Messages produced while running tests
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionMessage {
    AssemblyStarting {
        assembly: String,
        test_count: usize,
    },
    TestStarting {
        test: TestCase,
    },
    TestPassed {
        test: TestCase,
        time: f64,
        output: String,
    },
    TestFailed {
        test: TestCase,
        time: f64,
        message: String,
        output: String,
    },
    TestSkipped {
        test: TestCase,
        reason: String,
    },
    ErrorMessage {
        message: String,
    },
    AssemblyFinished {
        assembly: String,
        totals: AssemblyTotals,
    },
}
