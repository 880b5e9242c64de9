//! Human-readable console sink

use std::sync::Arc;

use super::{ResultSink, SinkContext};
use crate::executor::RunContext;
use crate::models::ExecutionMessage;
use crate::output::{Color, Console};

/// Prints failures, skips and errors; passing tests stay quiet
pub struct ConsoleSink {
    run: Arc<RunContext>,
}

impl ConsoleSink {
    pub fn create(context: SinkContext) -> Box<dyn ResultSink> {
        Box::new(Self { run: context.run })
    }
}

fn indented(console: &mut Console, text: &str, indent: &str) {
    for line in text.lines() {
        console.line(format!("{indent}{line}"));
    }
}

impl ResultSink for ConsoleSink {
    fn on_message(&mut self, message: &ExecutionMessage) {
        let mut console = self.run.console();
        match message {
            ExecutionMessage::AssemblyStarting { assembly, .. } => {
                console.line(format!("Starting:    {assembly}"));
            }
            ExecutionMessage::TestFailed {
                test,
                message,
                output,
                ..
            } => {
                console.colored(Color::Red, format!("   {test} [FAIL]"));
                indented(&mut console, message, "      ");
                if !output.is_empty() {
                    console.line("      Output:");
                    indented(&mut console, output, "        ");
                }
            }
            ExecutionMessage::TestSkipped { test, reason } => {
                console.colored(Color::Yellow, format!("   {test} [SKIP]"));
                indented(&mut console, reason, "      ");
            }
            ExecutionMessage::ErrorMessage { message } => {
                console.colored(Color::Red, format!("   [ERROR] {message}"));
            }
            ExecutionMessage::AssemblyFinished { assembly, .. } => {
                console.line(format!("Finished:    {assembly}"));
            }
            ExecutionMessage::TestStarting { .. } | ExecutionMessage::TestPassed { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssemblyTotals, TestCase};
    use crate::output::SharedBuffer;

    fn sink(buffer: &SharedBuffer) -> Box<dyn ResultSink> {
        ConsoleSink::create(SinkContext {
            assembly_name: "Sample".into(),
            run: Arc::new(RunContext::new(buffer.console())),
        })
    }

    #[test]
    fn test_console_lines() {
        let buffer = SharedBuffer::new();
        let mut sink = sink(&buffer);
        let test = TestCase::new("A", "b");

        sink.on_message(&ExecutionMessage::AssemblyStarting {
            assembly: "Sample".into(),
            test_count: 3,
        });
        sink.on_message(&ExecutionMessage::TestPassed {
            test: test.clone(),
            time: 0.1,
            output: "quiet".into(),
        });
        sink.on_message(&ExecutionMessage::TestFailed {
            test: test.clone(),
            time: 0.1,
            message: "expected 1\ngot 2".into(),
            output: "log line".into(),
        });
        sink.on_message(&ExecutionMessage::TestSkipped {
            test,
            reason: "flaky".into(),
        });
        sink.on_message(&ExecutionMessage::AssemblyFinished {
            assembly: "Sample".into(),
            totals: AssemblyTotals::default(),
        });

        let expected = "\
Starting:    Sample
   A.b [FAIL]
      expected 1
      got 2
      Output:
        log line
   A.b [SKIP]
      flaky
Finished:    Sample
";
        assert_eq!(buffer.contents(), expected);
    }

    #[test]
    fn test_error_message() {
        let buffer = SharedBuffer::new();
        sink(&buffer).on_message(&ExecutionMessage::ErrorMessage {
            message: "boom".into(),
        });
        assert_eq!(buffer.contents(), "   [ERROR] boom\n");
    }
}
