//! Structured run record
//!
//! Built from the execution message stream of each assembly and merged in
//! project order before output transforms are applied.

use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;

use crate::models::{AssemblyDescriptor, ExecutionMessage, TestCase};

/// Outcome of one test
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TestOutcome {
    Pass,
    Fail,
    Skip,
}

impl TestOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            TestOutcome::Pass => "Pass",
            TestOutcome::Fail => "Fail",
            TestOutcome::Skip => "Skip",
        }
    }
}

/// One executed test
#[derive(Clone, Debug, Serialize)]
pub struct TestRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub class_name: String,
    pub method: String,
    pub result: TestOutcome,
    pub time: f64,
    pub traits: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl TestRecord {
    fn new(test: &TestCase, result: TestOutcome, time: f64) -> Self {
        Self {
            name: test.display_name.clone(),
            class_name: test.class_name.clone(),
            method: test.method_name.clone(),
            result,
            time,
            traits: test
                .traits
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            failure_message: None,
            output: String::new(),
            skip_reason: None,
        }
    }
}

/// Everything recorded for one assembly
#[derive(Clone, Debug, Serialize)]
pub struct AssemblyRecord {
    pub name: String,
    pub assembly_file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub run_date: String,
    pub run_time: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub time: f64,
    pub error_messages: Vec<String>,
    pub tests: Vec<TestRecord>,
}

/// Records of every assembly, in project order
#[derive(Clone, Debug, Default, Serialize)]
pub struct AssembliesRecord {
    pub assemblies: Vec<AssemblyRecord>,
}

impl AssembliesRecord {
    pub fn new(assemblies: Vec<AssemblyRecord>) -> Self {
        Self { assemblies }
    }
}

/// Accumulates an `AssemblyRecord` from execution messages
pub struct RecordBuilder {
    record: AssemblyRecord,
}

impl RecordBuilder {
    pub fn new(assembly: &AssemblyDescriptor) -> Self {
        let now = Local::now();
        Self {
            record: AssemblyRecord {
                name: assembly.display_name(),
                assembly_file: assembly.assembly_file.clone(),
                config_file: assembly.config_file.clone(),
                run_date: now.format("%Y-%m-%d").to_string(),
                run_time: now.format("%H:%M:%S").to_string(),
                total: 0,
                passed: 0,
                failed: 0,
                skipped: 0,
                errors: 0,
                time: 0.0,
                error_messages: Vec::new(),
                tests: Vec::new(),
            },
        }
    }

    pub fn observe(&mut self, message: &ExecutionMessage) {
        let record = &mut self.record;
        match message {
            ExecutionMessage::TestPassed { test, time, output } => {
                let mut entry = TestRecord::new(test, TestOutcome::Pass, *time);
                entry.output = output.clone();
                record.tests.push(entry);
            }
            ExecutionMessage::TestFailed {
                test,
                time,
                message,
                output,
            } => {
                let mut entry = TestRecord::new(test, TestOutcome::Fail, *time);
                entry.failure_message = Some(message.clone());
                entry.output = output.clone();
                record.tests.push(entry);
            }
            ExecutionMessage::TestSkipped { test, reason } => {
                let mut entry = TestRecord::new(test, TestOutcome::Skip, 0.0);
                entry.skip_reason = Some(reason.clone());
                record.tests.push(entry);
            }
            ExecutionMessage::ErrorMessage { message } => {
                record.errors += 1;
                record.error_messages.push(message.clone());
            }
            ExecutionMessage::AssemblyFinished { totals, .. } => {
                record.total = totals.total;
                record.failed = totals.failed;
                record.skipped = totals.skipped;
                record.passed = totals.total.saturating_sub(totals.failed + totals.skipped);
                record.time = totals.time;
            }
            ExecutionMessage::AssemblyStarting { .. } | ExecutionMessage::TestStarting { .. } => {}
        }
    }

    pub fn finish(self) -> AssemblyRecord {
        self.record
    }
}
