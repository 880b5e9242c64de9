//! Runner error types
//!
//! Typed failures that cross module boundaries. Everything else travels as
//! `anyhow::Error` with context attached.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the runner
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("{0}")]
    Usage(String),

    #[error("visitor with name {0} was not found")]
    UnknownSink(String),

    #[error("visitor {0} is registered more than once")]
    DuplicateSink(String),

    #[error("could not load assembly {path}: {reason}")]
    AssemblyLoad { path: PathBuf, reason: String },

    #[error("engine stopped before sending {0}")]
    ChannelClosed(&'static str),
}

impl RunnerError {
    /// Short category printed in front of the message at the pipeline boundary
    pub fn category(&self) -> &'static str {
        match self {
            RunnerError::Usage(_) => "UsageError",
            RunnerError::UnknownSink(_) | RunnerError::DuplicateSink(_) => "VisitorError",
            RunnerError::AssemblyLoad { .. } => "BadImageFormat",
            RunnerError::ChannelClosed(_) => "EngineError",
        }
    }
}

/// Category of an arbitrary error, falling back to a generic label
pub fn error_category(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<RunnerError>() {
        Some(e) => e.category(),
        None if err.downcast_ref::<std::io::Error>().is_some() => "IoError",
        None => "Error",
    }
}
