//! Data models for test orchestration
//!
//! This module contains the data structures shared by the engine, the
//! pipeline and the reporters.

mod message;
mod project;
mod summary;
mod test_case;

pub use message::{
    AssemblyTotals, DiscoveryMessage, DiscoverySender, ExecutionMessage, ExecutionSender,
};
pub use project::{AssemblyDescriptor, ParallelismOption, Project};
pub use summary::ExecutionSummary;
pub use test_case::{TestCase, TraitMap};
