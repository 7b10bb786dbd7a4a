//! Background removal jobs.
//!
//! ## Components
//!
//! - `JobRecord`: job state, progress, result and cancellation token
//! - `JobStore`: registry of jobs and their lifecycle transitions
//! - `JobRunner`: validates requests and runs workflows on tokio tasks
//! - `JobReaper`: periodically evicts finished jobs
//!
//! ## Lifecycle
//!
//! `Pending -> Running -> {Completed, Failed}`, and `Pending | Running ->
//! Cancelled`. Nothing leaves a terminal state.

pub mod error;
pub mod reaper;
pub mod runner;
pub mod store;
pub mod types;

pub use error::JobError;
pub use reaper::{JobReaper, ReaperHandle};
pub use runner::{JobRunner, RunnerConfig};
pub use store::{DEFAULT_RETENTION, InMemoryJobStore, JobStore};
pub use types::{JobId, JobKind, JobOutcome, JobProgress, JobRecord, JobStatus};
