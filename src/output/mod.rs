//! Output module
//!
//! Console writer, end-of-run summary, run record and file transforms.

mod console;
mod record;
mod summary;
pub mod transform;

pub use console::{Color, Console};
#[cfg(test)]
pub use console::SharedBuffer;
pub use record::{AssembliesRecord, AssemblyRecord, RecordBuilder};
pub use summary::SummaryReport;
