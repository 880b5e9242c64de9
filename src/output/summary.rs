//! End-of-run summary table
//!
//! One row per assembly in name order, plus a grand total row when more than
//! one assembly reported.

use std::collections::BTreeMap;
use std::time::Duration;

use super::console::{Color, Console};
use crate::models::ExecutionSummary;

pub const HEADER: &str = "=== TEST EXECUTION SUMMARY ===";
const GRAND_TOTAL: &str = "GRAND TOTAL:";

fn seconds(value: f64) -> String {
    format!("{value:.3}s")
}

fn widest(rows: &[ExecutionSummary], column: impl Fn(&ExecutionSummary) -> String) -> usize {
    rows.iter().map(|s| column(s).len()).max().unwrap_or(0)
}

struct Widths {
    name: usize,
    total: usize,
    errors: usize,
    failed: usize,
    skipped: usize,
    time: usize,
}

/// Summary table over the per-assembly summaries of a run
pub struct SummaryReport<'a> {
    summaries: &'a BTreeMap<String, ExecutionSummary>,
    wall_clock: Duration,
}

impl<'a> SummaryReport<'a> {
    pub fn new(summaries: &'a BTreeMap<String, ExecutionSummary>, wall_clock: Duration) -> Self {
        Self {
            summaries,
            wall_clock,
        }
    }

    /// Sums of the count columns; `time` is the wall clock of the whole run,
    /// since assembly times overlap when assemblies run in parallel
    pub fn grand_total(&self) -> ExecutionSummary {
        let counts = self
            .summaries
            .values()
            .fold(ExecutionSummary::default(), |acc, s| ExecutionSummary {
                total: acc.total + s.total,
                failed: acc.failed + s.failed,
                skipped: acc.skipped + s.skipped,
                errors: acc.errors + s.errors,
                time: 0.0,
            });
        ExecutionSummary {
            time: self.wall_clock.as_secs_f64(),
            ..counts
        }
    }

    fn shows_grand_total(&self) -> bool {
        self.summaries.len() > 1
    }

    fn widths(&self) -> Widths {
        let mut rows: Vec<ExecutionSummary> = self.summaries.values().copied().collect();
        let mut name = self.summaries.keys().map(String::len).max().unwrap_or(0);
        if self.shows_grand_total() {
            rows.push(self.grand_total());
            name = name.max(GRAND_TOTAL.len());
        }

        Widths {
            name,
            total: widest(&rows, |s| s.total.to_string()),
            errors: widest(&rows, |s| s.errors.to_string()),
            failed: widest(&rows, |s| s.failed.to_string()),
            skipped: widest(&rows, |s| s.skipped.to_string()),
            time: widest(&rows, |s| seconds(s.time)),
        }
    }

    /// Table lines, header first; empty when nothing reported
    pub fn lines(&self) -> Vec<String> {
        if self.summaries.is_empty() {
            return Vec::new();
        }

        let w = self.widths();
        let mut lines = vec![HEADER.to_string()];

        for (name, s) in self.summaries {
            lines.push(format!(
                "   {:<nw$}  Total: {:>tw$}, Errors: {:>ew$}, Failed: {:>fw$}, Skipped: {:>sw$}, Time: {:>xw$}",
                name,
                s.total,
                s.errors,
                s.failed,
                s.skipped,
                seconds(s.time),
                nw = w.name,
                tw = w.total,
                ew = w.errors,
                fw = w.failed,
                sw = w.skipped,
                xw = w.time,
            ));
        }

        if self.shows_grand_total() {
            let dashes = |n: usize| "-".repeat(n);
            lines.push(format!(
                "   {}         {}          {}          {}           {}        {}",
                " ".repeat(w.name),
                dashes(w.total),
                dashes(w.errors),
                dashes(w.failed),
                dashes(w.skipped),
                dashes(w.time),
            ));

            let t = self.grand_total();
            lines.push(format!(
                "           {:>nw$} {:>tw$}          {:>ew$}          {:>fw$}           {:>sw$}        {:>xw$}",
                GRAND_TOTAL,
                t.total,
                t.errors,
                t.failed,
                t.skipped,
                seconds(t.time),
                nw = w.name,
                tw = w.total,
                ew = w.errors,
                fw = w.failed,
                sw = w.skipped,
                xw = w.time,
            ));
        }

        lines
    }

    #[cfg(test)]
    pub fn render(&self) -> String {
        self.lines().iter().map(|l| format!("{l}\n")).collect()
    }

    /// Print to the console after a blank line, header highlighted
    pub fn print(&self, console: &mut Console) {
        let lines = self.lines();
        let Some((header, rows)) = lines.split_first() else {
            return;
        };
        console.blank();
        console.colored(Color::White, header);
        for row in rows {
            console.line(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(total: usize, errors: usize, failed: usize, skipped: usize, time: f64) -> ExecutionSummary {
        ExecutionSummary {
            total,
            failed,
            skipped,
            errors,
            time,
        }
    }

    #[test]
    fn test_empty_report() {
        let summaries = BTreeMap::new();
        let report = SummaryReport::new(&summaries, Duration::from_secs(1));
        assert!(report.lines().is_empty());
        assert_eq!(report.render(), "");
    }

    #[test]
    fn test_single_assembly_has_no_grand_total() {
        let mut summaries = BTreeMap::new();
        summaries.insert("Sample".to_string(), summary(10, 0, 2, 1, 1.5));
        let report = SummaryReport::new(&summaries, Duration::from_secs(2));

        let expected = "\
=== TEST EXECUTION SUMMARY ===
   Sample  Total: 10, Errors: 0, Failed: 2, Skipped: 1, Time: 1.500s
";
        assert_eq!(report.render(), expected);
    }

    #[test]
    fn test_grand_total_layout() {
        let mut summaries = BTreeMap::new();
        summaries.insert("B".to_string(), summary(3, 0, 1, 0, 0.25));
        summaries.insert("A".to_string(), summary(10, 1, 0, 2, 1.0));
        let report = SummaryReport::new(&summaries, Duration::from_millis(900));

        let expected = "\
=== TEST EXECUTION SUMMARY ===
   A             Total: 10, Errors: 1, Failed: 0, Skipped: 2, Time: 1.000s
   B             Total:  3, Errors: 0, Failed: 1, Skipped: 0, Time: 0.250s
                        --          -          -           -        ------
           GRAND TOTAL: 13          1          1           2        0.900s
";
        assert_eq!(report.render(), expected);
    }

    #[test]
    fn test_grand_total_arithmetic() {
        let mut summaries = BTreeMap::new();
        summaries.insert("A".to_string(), summary(4, 1, 2, 1, 0.5));
        summaries.insert("B".to_string(), summary(6, 0, 3, 0, 0.75));
        summaries.insert("C".to_string(), summary(1, 2, 0, 1, 0.25));
        let report = SummaryReport::new(&summaries, Duration::from_secs(1));

        assert_eq!(report.grand_total(), summary(11, 3, 5, 2, 1.0));
    }

    #[test]
    fn test_grand_total_time_is_wall_clock() {
        let mut summaries = BTreeMap::new();
        summaries.insert("A".to_string(), summary(1, 0, 0, 0, 2.0));
        summaries.insert("B".to_string(), summary(1, 0, 0, 0, 2.0));
        let report = SummaryReport::new(&summaries, Duration::from_millis(2100));

        let last = report.lines().pop().unwrap();
        assert!(last.ends_with(" 2.100s"), "{last}");
        assert!(!last.contains("4.000s"), "{last}");
    }

    #[test]
    fn test_wall_clock_widens_time_column() {
        let mut summaries = BTreeMap::new();
        summaries.insert("A".to_string(), summary(1, 0, 0, 0, 1.0));
        summaries.insert("B".to_string(), summary(1, 0, 0, 0, 0.5));
        let report = SummaryReport::new(&summaries, Duration::from_millis(12_500));

        let lines = report.lines();
        assert!(lines[1].ends_with("Time:  1.000s"), "{}", lines[1]);
        assert!(lines[3].ends_with("-------"), "{}", lines[3]);
        assert!(lines[4].ends_with(" 12.500s"), "{}", lines[4]);
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut summaries = BTreeMap::new();
        summaries.insert("Alpha".to_string(), summary(120, 0, 7, 3, 12.345));
        summaries.insert("Beta".to_string(), summary(5, 2, 0, 0, 0.001));
        let report = SummaryReport::new(&summaries, Duration::from_secs(13));
        assert_eq!(report.render(), report.render());
    }
}
