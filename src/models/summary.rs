//! Per-assembly execution summary

use serde::{Deserialize, Serialize};
use std::fmt;

use super::AssemblyTotals;

/// Aggregate counts for one assembly run
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Elapsed time in seconds
    pub time: f64,
}

impl ExecutionSummary {
    /// Build from the engine's totals plus the error messages seen on the way
    pub fn from_totals(totals: AssemblyTotals, errors: usize) -> Self {
        Self {
            total: totals.total,
            failed: totals.failed,
            skipped: totals.skipped,
            errors,
            time: totals.time,
        }
    }

    pub fn passed(&self) -> usize {
        self.total.saturating_sub(self.failed + self.skipped)
    }
}

impl fmt::Display for ExecutionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {}, Errors: {}, Failed: {}, Skipped: {}, Time: {:.3}s",
            self.total, self.errors, self.failed, self.skipped, self.time
        )
    }
}
