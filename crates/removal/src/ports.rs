//! Collaborator boundaries consumed by the workflow.
//!
//! Storage ports report failures as [`DomainError`](grouppurge_core::DomainError);
//! the external remover reports [`RemoveCallError`]. Implementations must be
//! safe to share between concurrently running jobs.

use std::sync::Arc;

use async_trait::async_trait;

use grouppurge_core::{DomainResult, GroupId, QueueEntryId, UserId};

use crate::error::RemoveCallError;
use crate::model::{Group, HistoryEntry, Membership, NewHistoryEntry, QueueEntry, RemovalCandidate, User};

/// Lookup of groups and users by their external platform id.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_group(&self, whatsapp_id: &str) -> DomainResult<Option<Group>>;

    async fn find_user(&self, whatsapp_id: &str) -> DomainResult<Option<User>>;
}

/// Membership records of groups.
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// All memberships of a group.
    async fn list_for_group(&self, group_id: GroupId) -> DomainResult<Vec<Membership>>;

    /// Delete a membership. Returns `false` when there was nothing to delete.
    async fn delete(&self, user_id: UserId, group_id: GroupId) -> DomainResult<bool>;
}

/// Members that must never be removed from a group.
#[async_trait]
pub trait Whitelist: Send + Sync {
    async fn contains(&self, user_id: UserId, group_id: GroupId) -> DomainResult<bool>;
}

/// Staging list of members awaiting removal.
#[async_trait]
pub trait RemovalQueue: Send + Sync {
    /// Insert the candidate unless the `(user, group)` pair is already queued.
    ///
    /// Returns the stored entry and whether it was newly created.
    async fn upsert(&self, candidate: RemovalCandidate) -> DomainResult<(QueueEntry, bool)>;

    /// Up to `limit` entries of a group, oldest enqueued first.
    async fn fetch_oldest(&self, group_id: GroupId, limit: usize) -> DomainResult<Vec<QueueEntry>>;

    /// Remove an entry. Returns `false` if it was already gone.
    async fn delete(&self, id: QueueEntryId) -> DomainResult<bool>;

    async fn count(&self, group_id: GroupId) -> DomainResult<u64>;

    async fn list(&self, group_id: GroupId) -> DomainResult<Vec<QueueEntry>>;
}

/// Append-only audit log of removal attempts.
#[async_trait]
pub trait RemovalHistory: Send + Sync {
    async fn append(&self, entry: NewHistoryEntry) -> DomainResult<HistoryEntry>;

    async fn list(&self, group_id: GroupId) -> DomainResult<Vec<HistoryEntry>>;
}

/// Messaging platform call removing members from a group.
///
/// One call per batch; the outcome applies to the whole batch.
#[async_trait]
pub trait MemberRemover: Send + Sync {
    async fn remove_members(
        &self,
        group_whatsapp_id: &str,
        member_whatsapp_ids: &[String],
    ) -> Result<(), RemoveCallError>;
}

/// The full set of collaborators a workflow run needs.
#[derive(Clone)]
pub struct RemovalPorts {
    pub directory: Arc<dyn Directory>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub whitelist: Arc<dyn Whitelist>,
    pub queue: Arc<dyn RemovalQueue>,
    pub history: Arc<dyn RemovalHistory>,
    pub remover: Arc<dyn MemberRemover>,
}
