//! In-memory implementations of the removal ports.
//!
//! Intended for tests/dev. State lives behind `RwLock`s; a poisoned lock is
//! reported as a storage error.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use grouppurge_core::{DomainError, DomainResult, GroupId, HistoryEntryId, QueueEntryId, UserId};
use grouppurge_removal::{
    Directory, Group, HistoryEntry, MemberRemover, Membership, MembershipRepository,
    NewHistoryEntry, QueueEntry, RemovalCandidate, RemovalHistory, RemovalPorts, RemovalQueue,
    RemoveCallError, User, Whitelist,
};

fn poisoned<T>(_: PoisonError<T>) -> DomainError {
    DomainError::storage("lock poisoned")
}

/// Groups and users keyed by external id.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    groups: RwLock<HashMap<String, Group>>,
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group, or return the one already known under this id.
    pub fn add_group(&self, whatsapp_id: &str, name: &str) -> DomainResult<Group> {
        let mut groups = self.groups.write().map_err(poisoned)?;
        let group = groups.entry(whatsapp_id.to_string()).or_insert_with(|| Group {
            id: GroupId::new(),
            whatsapp_id: whatsapp_id.to_string(),
            name: name.to_string(),
        });
        Ok(group.clone())
    }

    /// Register a user, or return the one already known under this id.
    pub fn add_user(&self, whatsapp_id: &str) -> DomainResult<User> {
        let mut users = self.users.write().map_err(poisoned)?;
        let user = users.entry(whatsapp_id.to_string()).or_insert_with(|| User {
            id: UserId::new(),
            whatsapp_id: whatsapp_id.to_string(),
        });
        Ok(user.clone())
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn find_group(&self, whatsapp_id: &str) -> DomainResult<Option<Group>> {
        let groups = self.groups.read().map_err(poisoned)?;
        Ok(groups.get(whatsapp_id).cloned())
    }

    async fn find_user(&self, whatsapp_id: &str) -> DomainResult<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(whatsapp_id).cloned())
    }
}

/// Memberships in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryMemberships {
    members: RwLock<Vec<Membership>>,
}

impl InMemoryMemberships {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the membership of `(user, group)`.
    pub fn upsert(&self, membership: Membership) -> DomainResult<()> {
        let mut members = self.members.write().map_err(poisoned)?;
        match members
            .iter_mut()
            .find(|m| m.user_id == membership.user_id && m.group_id == membership.group_id)
        {
            Some(existing) => *existing = membership,
            None => members.push(membership),
        }
        Ok(())
    }

    pub fn get(&self, user_id: UserId, group_id: GroupId) -> DomainResult<Option<Membership>> {
        let members = self.members.read().map_err(poisoned)?;
        Ok(members
            .iter()
            .find(|m| m.user_id == user_id && m.group_id == group_id)
            .cloned())
    }
}

#[async_trait]
impl MembershipRepository for InMemoryMemberships {
    async fn list_for_group(&self, group_id: GroupId) -> DomainResult<Vec<Membership>> {
        let members = self.members.read().map_err(poisoned)?;
        Ok(members
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, user_id: UserId, group_id: GroupId) -> DomainResult<bool> {
        let mut members = self.members.write().map_err(poisoned)?;
        let before = members.len();
        members.retain(|m| !(m.user_id == user_id && m.group_id == group_id));
        Ok(members.len() != before)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWhitelist {
    entries: RwLock<HashSet<(UserId, GroupId)>>,
}

impl InMemoryWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, user_id: UserId, group_id: GroupId) -> DomainResult<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert((user_id, group_id));
        Ok(())
    }
}

#[async_trait]
impl Whitelist for InMemoryWhitelist {
    async fn contains(&self, user_id: UserId, group_id: GroupId) -> DomainResult<bool> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.contains(&(user_id, group_id)))
    }
}

/// Removal queue kept in enqueue order.
#[derive(Debug, Default)]
pub struct InMemoryRemovalQueue {
    entries: RwLock<Vec<QueueEntry>>,
}

impl InMemoryRemovalQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RemovalQueue for InMemoryRemovalQueue {
    async fn upsert(&self, candidate: RemovalCandidate) -> DomainResult<(QueueEntry, bool)> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        if let Some(existing) = entries
            .iter()
            .find(|e| e.user_id == candidate.user_id && e.group_id == candidate.group_id)
        {
            return Ok((existing.clone(), false));
        }

        let entry = QueueEntry {
            id: QueueEntryId::new(),
            user_id: candidate.user_id,
            group_id: candidate.group_id,
            whatsapp_id: candidate.whatsapp_id,
            reason: candidate.reason,
            enqueued_at: Utc::now(),
        };
        entries.push(entry.clone());
        Ok((entry, true))
    }

    async fn fetch_oldest(&self, group_id: GroupId, limit: usize) -> DomainResult<Vec<QueueEntry>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .iter()
            .filter(|e| e.group_id == group_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: QueueEntryId) -> DomainResult<bool> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        Ok(entries.len() != before)
    }

    async fn count(&self, group_id: GroupId) -> DomainResult<u64> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.iter().filter(|e| e.group_id == group_id).count() as u64)
    }

    async fn list(&self, group_id: GroupId) -> DomainResult<Vec<QueueEntry>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .iter()
            .filter(|e| e.group_id == group_id)
            .cloned()
            .collect())
    }
}

/// Append-only removal history.
#[derive(Debug, Default)]
pub struct InMemoryRemovalHistory {
    entries: RwLock<Vec<HistoryEntry>>,
}

impl InMemoryRemovalHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RemovalHistory for InMemoryRemovalHistory {
    async fn append(&self, entry: NewHistoryEntry) -> DomainResult<HistoryEntry> {
        let stored = HistoryEntry {
            id: HistoryEntryId::new(),
            user_id: entry.user_id,
            group_id: entry.group_id,
            whatsapp_id: entry.whatsapp_id,
            outcome: entry.outcome,
            reason: entry.reason,
            recorded_at: Utc::now(),
        };
        self.entries
            .write()
            .map_err(poisoned)?
            .push(stored.clone());
        Ok(stored)
    }

    async fn list(&self, group_id: GroupId) -> DomainResult<Vec<HistoryEntry>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .iter()
            .filter(|e| e.group_id == group_id)
            .cloned()
            .collect())
    }
}

/// A call received by [`RecordingRemover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveCall {
    pub group_whatsapp_id: String,
    pub member_whatsapp_ids: Vec<String>,
}

/// Remover that records every call and fails the calls it was told to.
#[derive(Debug, Default)]
pub struct RecordingRemover {
    calls: Mutex<Vec<RemoveCall>>,
    /// Failures keyed by 1-based call number.
    failures: Mutex<HashMap<usize, RemoveCallError>>,
}

impl RecordingRemover {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th call (1-based) fail with `error`.
    pub fn fail_call(&self, n: usize, error: RemoveCallError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(n, error);
    }

    pub fn calls(&self) -> Vec<RemoveCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MemberRemover for RecordingRemover {
    async fn remove_members(
        &self,
        group_whatsapp_id: &str,
        member_whatsapp_ids: &[String],
    ) -> Result<(), RemoveCallError> {
        let n = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.push(RemoveCall {
                group_whatsapp_id: group_whatsapp_id.to_string(),
                member_whatsapp_ids: member_whatsapp_ids.to_vec(),
            });
            calls.len()
        };

        let failure = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&n);
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Every in-memory adapter, wired together.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    pub directory: Arc<InMemoryDirectory>,
    pub memberships: Arc<InMemoryMemberships>,
    pub whitelist: Arc<InMemoryWhitelist>,
    pub queue: Arc<InMemoryRemovalQueue>,
    pub history: Arc<InMemoryRemovalHistory>,
    pub remover: Arc<RecordingRemover>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ports backed by this store, removing through the recording remover.
    pub fn ports(&self) -> RemovalPorts {
        self.ports_with_remover(self.remover.clone())
    }

    pub fn ports_with_remover(&self, remover: Arc<dyn MemberRemover>) -> RemovalPorts {
        RemovalPorts {
            directory: self.directory.clone(),
            memberships: self.memberships.clone(),
            whitelist: self.whitelist.clone(),
            queue: self.queue.clone(),
            history: self.history.clone(),
            remover,
        }
    }

    pub fn add_group(&self, whatsapp_id: &str, name: &str) -> DomainResult<Group> {
        self.directory.add_group(whatsapp_id, name)
    }

    /// Register `whatsapp_id` as a member of `group`.
    pub fn add_member(
        &self,
        group: &Group,
        whatsapp_id: &str,
        joined_at: DateTime<Utc>,
        last_active_at: Option<DateTime<Utc>>,
    ) -> DomainResult<User> {
        let user = self.directory.add_user(whatsapp_id)?;
        self.memberships.upsert(Membership {
            user_id: user.id,
            group_id: group.id,
            whatsapp_id: user.whatsapp_id.clone(),
            joined_at,
            last_active_at,
        })?;
        Ok(user)
    }

    pub fn whitelist(&self, user: &User, group: &Group) -> DomainResult<()> {
        self.whitelist.add(user.id, group.id)
    }
}
