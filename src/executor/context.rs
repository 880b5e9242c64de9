//! Run-wide shared state
//!
//! One `RunContext` lives for the whole run and is shared by every assembly
//! pipeline: the cancellation flag, the console lock, the per-assembly
//! summaries and the sticky failure flag.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::models::ExecutionSummary;
use crate::output::{Color, Console};

/// Largest status a process can report; higher failure counts saturate here
const MAX_EXIT_CODE: usize = 255;

/// Cooperative cancellation flag
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raise the flag. Returns true only for the call that raised it.
    pub fn request(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }
}

/// State shared by all assemblies of one run
pub struct RunContext {
    cancel: CancelFlag,
    console: Mutex<Console>,
    summaries: Mutex<HashMap<String, ExecutionSummary>>,
    failed: AtomicBool,
}

impl RunContext {
    pub fn new(console: Console) -> Self {
        Self {
            cancel: CancelFlag::new(),
            console: Mutex::new(console),
            summaries: Mutex::new(HashMap::new()),
            failed: AtomicBool::new(false),
        }
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn request_cancel(&self) -> bool {
        self.cancel.request()
    }

    /// Exclusive access to the console; hold it for a whole block of lines
    pub fn console(&self) -> MutexGuard<'_, Console> {
        // A panic while printing leaves the console usable
        self.console
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store the summary of a finished assembly, keyed by display name
    pub fn record_summary(&self, assembly: impl Into<String>, summary: ExecutionSummary) {
        self.summaries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(assembly.into(), summary);
    }

    /// Snapshot of all summaries in key order
    pub fn summaries(&self) -> BTreeMap<String, ExecutionSummary> {
        self.summaries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Record a fatal error; never cleared
    pub fn mark_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// 1 after any fatal error, otherwise the number of failed tests
    /// (capped at 255 so the status never wraps to success)
    pub fn exit_code(&self) -> i32 {
        if self.has_failed() {
            return 1;
        }
        let failed: usize = self.summaries().values().map(|s| s.failed).sum();
        failed.min(MAX_EXIT_CODE) as i32
    }

    /// Turn Ctrl+C into a cancellation request instead of process termination
    pub fn watch_ctrl_c(self: &Arc<Self>) {
        let run = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Unable to listen for Ctrl+C: {}", e);
                    return;
                }
                if run.request_cancel() {
                    debug!("Cancellation requested");
                    run.console()
                        .colored(Color::Yellow, "Canceling... (waiting for running tests to finish)");
                } else {
                    run.console().colored(Color::Yellow, "Already canceling...");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::SharedBuffer;

    fn summary(failed: usize) -> ExecutionSummary {
        ExecutionSummary {
            total: 5,
            failed,
            ..Default::default()
        }
    }

    #[test]
    fn test_cancel_flag_first_request_wins() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        assert!(clone.request());
        assert!(!flag.request());
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_exit_code_sums_failures() {
        let run = RunContext::new(SharedBuffer::new().console());
        assert_eq!(run.exit_code(), 0);

        run.record_summary("A", summary(2));
        run.record_summary("B", summary(3));
        assert_eq!(run.exit_code(), 5);
    }

    #[test]
    fn test_exit_code_saturates_instead_of_wrapping() {
        let run = RunContext::new(SharedBuffer::new().console());
        run.record_summary("A", summary(200));
        run.record_summary("B", summary(56));
        assert_eq!(run.exit_code(), 255);

        run.record_summary("C", summary(10_000));
        assert_eq!(run.exit_code(), 255);
    }

    #[test]
    fn test_exit_code_after_fatal_error() {
        let run = RunContext::new(SharedBuffer::new().console());
        run.record_summary("A", summary(4));
        run.mark_failed();
        assert!(run.has_failed());
        assert_eq!(run.exit_code(), 1);
    }

    #[test]
    fn test_summaries_sorted_by_name() {
        let run = RunContext::new(SharedBuffer::new().console());
        run.record_summary("Zeta", summary(0));
        run.record_summary("Alpha", summary(1));
        let names: Vec<_> = run.summaries().into_keys().collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_console_is_shared() {
        let buffer = SharedBuffer::new();
        let run = RunContext::new(buffer.console());
        run.console().line("hello");
        assert_eq!(buffer.contents(), "hello\n");
    }
}
