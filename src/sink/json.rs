//! Line-delimited JSON sink
//!
//! One object per execution message, tagged with the assembly it belongs
//! to, for tools that consume the run as a stream.

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::{ResultSink, SinkContext};
use crate::executor::RunContext;
use crate::models::ExecutionMessage;

#[derive(Serialize)]
struct Envelope<'a> {
    assembly: &'a str,
    #[serde(flatten)]
    event: &'a ExecutionMessage,
}

pub struct JsonSink {
    assembly_name: String,
    run: Arc<RunContext>,
}

impl JsonSink {
    pub fn create(context: SinkContext) -> Box<dyn ResultSink> {
        Box::new(Self {
            assembly_name: context.assembly_name,
            run: context.run,
        })
    }
}

impl ResultSink for JsonSink {
    fn on_message(&mut self, message: &ExecutionMessage) {
        let envelope = Envelope {
            assembly: &self.assembly_name,
            event: message,
        };
        match serde_json::to_string(&envelope) {
            Ok(line) => self.run.console().line(line),
            Err(e) => warn!("Failed to serialize message: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssemblyTotals, TestCase};
    use crate::output::SharedBuffer;

    #[test]
    fn test_one_object_per_line() {
        let buffer = SharedBuffer::new();
        let mut sink = JsonSink::create(SinkContext {
            assembly_name: "Sample".into(),
            run: Arc::new(RunContext::new(buffer.console())),
        });

        sink.on_message(&ExecutionMessage::TestPassed {
            test: TestCase::new("A", "b"),
            time: 0.5,
            output: String::new(),
        });
        sink.on_message(&ExecutionMessage::AssemblyFinished {
            assembly: "Sample".into(),
            totals: AssemblyTotals {
                total: 1,
                ..Default::default()
            },
        });

        let contents = buffer.contents();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["assembly"], "Sample");
        assert_eq!(lines[0]["type"], "test_passed");
        assert_eq!(lines[0]["test"]["class_name"], "A");
        assert_eq!(lines[1]["type"], "assembly_finished");
        assert_eq!(lines[1]["totals"]["total"], 1);
    }
}
