//! TeamCity service-message sink
//!
//! Writes `##teamcity[...]` lines that the TeamCity build agent turns into
//! its test tree. Selected automatically when `TEAMCITY_PROJECT_NAME` is set.

use std::sync::Arc;

use super::{ResultSink, SinkContext};
use crate::executor::RunContext;
use crate::models::ExecutionMessage;

pub struct TeamCitySink {
    flow_id: String,
    run: Arc<RunContext>,
}

impl TeamCitySink {
    pub fn create(context: SinkContext) -> Box<dyn ResultSink> {
        Box::new(Self {
            flow_id: escape(&context.assembly_name),
            run: context.run,
        })
    }

    fn emit(&self, lines: &[String]) {
        let mut console = self.run.console();
        for line in lines {
            console.line(line);
        }
    }

    fn service(&self, name: &str, attributes: &[(&str, &str)]) -> String {
        let mut line = format!("##teamcity[{name}");
        for (key, value) in attributes {
            line.push_str(&format!(" {key}='{}'", escape(value)));
        }
        line.push_str(&format!(" flowId='{}']", self.flow_id));
        line
    }
}

/// Escape a value for use inside a service message attribute
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '|' => escaped.push_str("||"),
            '\'' => escaped.push_str("|'"),
            '\n' => escaped.push_str("|n"),
            '\r' => escaped.push_str("|r"),
            '[' => escaped.push_str("|["),
            ']' => escaped.push_str("|]"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn millis(seconds: f64) -> String {
    format!("{}", (seconds * 1000.0).round() as u64)
}

impl ResultSink for TeamCitySink {
    fn on_message(&mut self, message: &ExecutionMessage) {
        let lines = match message {
            ExecutionMessage::AssemblyStarting { assembly, .. } => {
                vec![self.service("testSuiteStarted", &[("name", assembly.as_str())])]
            }
            ExecutionMessage::TestStarting { test } => {
                vec![self.service("testStarted", &[("name", test.display_name.as_str())])]
            }
            ExecutionMessage::TestPassed { test, time, output } => {
                let mut lines = Vec::new();
                if !output.is_empty() {
                    lines.push(self.service(
                        "testStdOut",
                        &[("name", test.display_name.as_str()), ("out", output.as_str())],
                    ));
                }
                lines.push(self.service(
                    "testFinished",
                    &[("name", test.display_name.as_str()), ("duration", millis(*time).as_str())],
                ));
                lines
            }
            ExecutionMessage::TestFailed {
                test,
                time,
                message,
                output,
            } => vec![
                self.service(
                    "testFailed",
                    &[
                        ("name", test.display_name.as_str()),
                        ("message", message.as_str()),
                        ("details", output.as_str()),
                    ],
                ),
                self.service(
                    "testFinished",
                    &[("name", test.display_name.as_str()), ("duration", millis(*time).as_str())],
                ),
            ],
            ExecutionMessage::TestSkipped { test, reason } => vec![
                self.service(
                    "testIgnored",
                    &[("name", test.display_name.as_str()), ("message", reason.as_str())],
                ),
                self.service("testFinished", &[("name", test.display_name.as_str())]),
            ],
            ExecutionMessage::ErrorMessage { message } => {
                vec![self.service("message", &[("status", "ERROR"), ("text", message.as_str())])]
            }
            ExecutionMessage::AssemblyFinished { assembly, .. } => {
                vec![self.service("testSuiteFinished", &[("name", assembly.as_str())])]
            }
        };
        self.emit(&lines);
    }
}
