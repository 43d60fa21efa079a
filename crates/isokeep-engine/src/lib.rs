//! The update engine: what to keep current, and how a run executes.
//!
//! A [`TitleSpec`] describes one managed title as data: its filename
//! template, its upstream source and its verification policy. The
//! built-in [`catalog`](builtin_titles) covers the supported titles; a
//! [`RunConfig`] chooses which of them to run, with which variants,
//! into which folders. The [`Dispatcher`] expands that into independent
//! tasks and runs them under a concurrency bound, collecting one
//! [`UpdateOutcome`] per task.
//!
//! Failure isolation is the core contract: a task error is caught at
//! the task boundary and reported, never propagated to siblings. The
//! only exception is a full target disk, which aborts the remaining
//! run.

mod catalog;
mod config;
mod dispatch;
mod error;
mod local;
mod task;
mod title;

pub use catalog::{builtin_titles, find_title};
pub use config::{ConfigEntry, ConfigError, RunConfig};
pub use dispatch::{Dispatcher, ProgressFactory, DEFAULT_CONCURRENCY};
pub use error::{ErrorKind, TaskError};
pub use local::{current_artifact, LocalArtifact};
pub use task::{TaskId, UpdateOutcome};
pub use title::{ChecksumPolicy, SignatureSpec, TitleSpec};
