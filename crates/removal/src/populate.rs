//! Direct population of the removal queue from a list of external ids.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::WorkflowError;
use crate::model::RemovalCandidate;
use crate::ports::RemovalPorts;

/// Reason recorded on entries queued by direct population.
pub const MANUAL_REASON: &str = "manual";

/// Outcome of a direct population request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulateReport {
    /// Entries newly added to the queue.
    pub inserted: u64,
    /// Entries that were already queued.
    pub already_queued: u64,
    pub skipped_whitelisted: u64,
    /// Whitelisted ids exactly as they were supplied.
    pub skipped_whitelisted_ids: Vec<String>,
    /// Ids with no known user.
    pub not_found: Vec<String>,
}

/// Queue the given members of a group for removal, skipping whitelisted ones.
///
/// The group must exist; unknown users are reported rather than failing the
/// request.
pub async fn populate_queue(
    ports: &RemovalPorts,
    group_whatsapp_id: &str,
    whatsapp_ids: &[String],
) -> Result<PopulateReport, WorkflowError> {
    let group = ports
        .directory
        .find_group(group_whatsapp_id)
        .await?
        .ok_or_else(|| WorkflowError::GroupNotFound(group_whatsapp_id.to_string()))?;

    let mut report = PopulateReport::default();

    for whatsapp_id in whatsapp_ids {
        let Some(user) = ports.directory.find_user(whatsapp_id).await? else {
            debug!(group = %group.whatsapp_id, member = %whatsapp_id, "unknown user");
            report.not_found.push(whatsapp_id.clone());
            continue;
        };

        if ports.whitelist.contains(user.id, group.id).await? {
            report.skipped_whitelisted += 1;
            report.skipped_whitelisted_ids.push(whatsapp_id.clone());
            continue;
        }

        let (_, created) = ports
            .queue
            .upsert(RemovalCandidate {
                user_id: user.id,
                group_id: group.id,
                whatsapp_id: user.whatsapp_id,
                reason: MANUAL_REASON.to_string(),
            })
            .await?;
        if created {
            report.inserted += 1;
        } else {
            report.already_queued += 1;
        }
    }

    info!(
        group = %group.whatsapp_id,
        inserted = report.inserted,
        skipped_whitelisted = report.skipped_whitelisted,
        not_found = report.not_found.len(),
        "removal queue populated"
    );
    Ok(report)
}
