//! Test execution
//!
//! Run-wide context, the per-assembly pipeline and the orchestrator that
//! fans assemblies out.

mod context;
mod orchestrator;
mod pipeline;

pub use context::{CancelFlag, RunContext};
pub use orchestrator::{Orchestrator, RunOptions};
pub use pipeline::ListMode;
