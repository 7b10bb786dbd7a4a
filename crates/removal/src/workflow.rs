//! Two-phase batched removal.
//!
//! 1. **Sync**: queue every inactive, non-whitelisted member of the group.
//! 2. **Removal**: drain the queue oldest-first in batches of `batch_size`,
//!    one external call per batch, pausing `delay` between batches.
//!
//! Cancellation is cooperative: the token is checked at phase boundaries and
//! before every batch. A batch already in flight always runs to completion,
//! including its archival writes.

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use grouppurge_core::{DomainError, ProgressFn, ProgressUpdate};

use crate::error::WorkflowError;
use crate::model::{
    Group, NewHistoryEntry, QueueEntry, RemovalCandidate, RemovalConfig, RemovalOutcome, inactivity_cutoff,
};
use crate::ports::RemovalPorts;

/// Reason recorded on queue entries produced by the sync phase.
pub const INACTIVE_REASON: &str = "inactive";

/// Which phases a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowMode {
    /// Sync inactive members into the queue, then remove them.
    SyncAndRemove,
    /// Remove whatever is already queued for the group.
    RemoveOnly,
}

/// What a run actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalSummary {
    /// External ids removed by successful batches, in removal order.
    pub removed_whatsapp_ids: Vec<String>,
    /// Queue entries processed, whatever their batch outcome.
    pub processed: u64,
    pub batches: u32,
    pub failed_batches: u32,
    /// Whether the run stopped early because its token was cancelled.
    pub cancelled: bool,
}

/// Batched removal workflow over a set of collaborator ports.
#[derive(Clone)]
pub struct RemovalWorkflow {
    ports: RemovalPorts,
}

impl RemovalWorkflow {
    pub fn new(ports: RemovalPorts) -> Self {
        Self { ports }
    }

    pub fn ports(&self) -> &RemovalPorts {
        &self.ports
    }

    /// Run the workflow to completion, cancellation, or the first structural
    /// failure.
    pub async fn run(
        &self,
        mode: WorkflowMode,
        config: &RemovalConfig,
        cancel: &CancellationToken,
        progress: &ProgressFn,
    ) -> Result<RemovalSummary, WorkflowError> {
        let mut summary = RemovalSummary::default();
        if cancel.is_cancelled() {
            return Ok(self.report_cancelled(summary, progress));
        }

        let group = self.resolve_group(&config.group_id).await?;

        if mode == WorkflowMode::SyncAndRemove {
            progress(
                ProgressUpdate::processed(0)
                    .with_message(format!("syncing inactive members of group {}", group.whatsapp_id)),
            );

            let window = config.inactivity_window().ok_or_else(|| {
                DomainError::validation("inactivity window is required for sync")
            })?;
            let queued = self.sync_group(&group, window).await?;
            info!(group = %group.whatsapp_id, queued = queued.len(), "sync phase complete");
        }

        if cancel.is_cancelled() {
            return Ok(self.report_cancelled(summary, progress));
        }

        let total = self.ports.queue.count(group.id).await?;
        progress(
            ProgressUpdate::processed(summary.processed)
                .with_total(total)
                .with_message(format!(
                    "removing {total} queued members in batches of {}",
                    config.batch_size
                )),
        );

        loop {
            if cancel.is_cancelled() {
                return Ok(self.report_cancelled(summary, progress));
            }

            let batch = self
                .ports
                .queue
                .fetch_oldest(group.id, config.batch_size)
                .await?;
            if batch.is_empty() {
                break;
            }

            summary.batches += 1;
            let message = self.remove_batch(&group, &batch, config, &mut summary).await?;
            progress(
                ProgressUpdate::processed(summary.processed)
                    .with_batch(summary.batches)
                    .with_message(message),
            );

            tokio::time::sleep(config.delay()).await;
        }

        info!(
            group = %group.whatsapp_id,
            processed = summary.processed,
            removed = summary.removed_whatsapp_ids.len(),
            failed_batches = summary.failed_batches,
            "removal phase complete"
        );
        Ok(summary)
    }

    /// Queue every inactive, non-whitelisted member of `group`.
    ///
    /// Re-running is idempotent: members already queued are returned as they
    /// are stored rather than duplicated.
    pub async fn sync_group(
        &self,
        group: &Group,
        inactivity_window: std::time::Duration,
    ) -> Result<Vec<QueueEntry>, WorkflowError> {
        let cutoff = inactivity_cutoff(Utc::now(), inactivity_window).ok_or_else(|| {
            DomainError::validation(format!(
                "inactivity window of {}ms is out of range",
                inactivity_window.as_millis()
            ))
        })?;

        let members = self.ports.memberships.list_for_group(group.id).await?;
        let mut queued = Vec::new();

        for member in members.into_iter().filter(|m| m.is_inactive(cutoff)) {
            if self.ports.whitelist.contains(member.user_id, group.id).await? {
                debug!(group = %group.whatsapp_id, member = %member.whatsapp_id, "whitelisted, skipping");
                continue;
            }

            let (entry, created) = self
                .ports
                .queue
                .upsert(RemovalCandidate {
                    user_id: member.user_id,
                    group_id: group.id,
                    whatsapp_id: member.whatsapp_id,
                    reason: INACTIVE_REASON.to_string(),
                })
                .await?;
            if created {
                debug!(group = %group.whatsapp_id, member = %entry.whatsapp_id, "queued for removal");
            }
            queued.push(entry);
        }

        Ok(queued)
    }

    async fn resolve_group(&self, whatsapp_id: &str) -> Result<Group, WorkflowError> {
        self.ports
            .directory
            .find_group(whatsapp_id)
            .await?
            .ok_or_else(|| WorkflowError::GroupNotFound(whatsapp_id.to_string()))
    }

    /// Attempt one batch and archive every entry with the batch outcome.
    ///
    /// Returns the progress message describing the batch.
    async fn remove_batch(
        &self,
        group: &Group,
        batch: &[QueueEntry],
        config: &RemovalConfig,
        summary: &mut RemovalSummary,
    ) -> Result<String, WorkflowError> {
        let ids: Vec<String> = batch.iter().map(|e| e.whatsapp_id.clone()).collect();
        let n = summary.batches;

        let attempt = if config.dry_run {
            info!(group = %group.whatsapp_id, batch = n, members = ?ids, "dry run: would remove members");
            Ok(())
        } else {
            self.ports.remover.remove_members(&group.whatsapp_id, &ids).await
        };

        let (outcome, reason, message) = match attempt {
            Ok(()) if config.dry_run => (
                RemovalOutcome::Success,
                "dry run: batch removal succeeded".to_string(),
                format!("batch {n}: dry run, {} members", ids.len()),
            ),
            Ok(()) => (
                RemovalOutcome::Success,
                "batch removal succeeded".to_string(),
                format!("batch {n}: removed {} members", ids.len()),
            ),
            Err(e) => {
                warn!(group = %group.whatsapp_id, batch = n, error = %e, "batch removal failed");
                (
                    RemovalOutcome::Failure,
                    format!("batch removal failed: {e}"),
                    format!("batch {n}: failed for {} members: {e}", ids.len()),
                )
            }
        };

        for entry in batch {
            self.ports.queue.delete(entry.id).await?;
            self.ports
                .history
                .append(NewHistoryEntry {
                    user_id: entry.user_id,
                    group_id: entry.group_id,
                    whatsapp_id: entry.whatsapp_id.clone(),
                    outcome,
                    reason: reason.clone(),
                })
                .await?;

            match self.ports.memberships.delete(entry.user_id, entry.group_id).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(member = %entry.whatsapp_id, "no membership record left, skipping")
                }
                Err(e) => {
                    warn!(member = %entry.whatsapp_id, error = %e, "failed to delete membership")
                }
            }
        }

        summary.processed += batch.len() as u64;
        match outcome {
            RemovalOutcome::Success => summary.removed_whatsapp_ids.extend(ids),
            RemovalOutcome::Failure => summary.failed_batches += 1,
        }

        Ok(message)
    }

    fn report_cancelled(&self, mut summary: RemovalSummary, progress: &ProgressFn) -> RemovalSummary {
        summary.cancelled = true;
        progress(
            ProgressUpdate::processed(summary.processed)
                .with_message(format!("cancelled after {} processed", summary.processed)),
        );
        summary
    }
}
