//! `grouppurge-removal`
//!
//! **Responsibility:** the batched member-removal workflow and the ports it
//! consumes.
//!
//! - `model`: entities owned by the storage layer, typed for the ports
//! - `ports`: async collaborator boundaries (directory, memberships, whitelist,
//!   removal queue, removal history, external remover)
//! - `workflow`: sync phase + delayed batch removal phase
//! - `populate`: direct population of the removal queue
//!
//! Storage and the messaging platform client live elsewhere; this crate only
//! depends on their contracts.

pub mod error;
pub mod model;
pub mod populate;
pub mod ports;
pub mod workflow;

pub use error::{RemoveCallError, WorkflowError};
pub use model::{
    Group, HistoryEntry, Membership, NewHistoryEntry, QueueEntry, RemovalCandidate, RemovalConfig,
    RemovalOutcome, User, inactivity_cutoff,
};
pub use populate::{PopulateReport, populate_queue};
pub use ports::{
    Directory, MemberRemover, MembershipRepository, RemovalHistory, RemovalPorts, RemovalQueue,
    Whitelist,
};
pub use workflow::{RemovalSummary, RemovalWorkflow, WorkflowMode};
