//! `grouppurge-core`: shared building blocks.
//!
//! Identifiers, the domain error model and the progress update type shared by
//! the removal workflow and the job runner. No infrastructure concerns.

pub mod error;
pub mod id;
pub mod progress;

pub use error::{DomainError, DomainResult};
pub use id::{GroupId, HistoryEntryId, QueueEntryId, UserId};
pub use progress::{ProgressFn, ProgressUpdate};
