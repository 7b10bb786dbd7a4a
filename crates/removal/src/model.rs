//! Entities the removal workflow reads and writes through its ports.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use grouppurge_core::{GroupId, HistoryEntryId, QueueEntryId, UserId};

/// A messaging group, addressed externally by its platform id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub whatsapp_id: String,
    pub name: String,
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub whatsapp_id: String,
}

/// Membership of a user in a group.
///
/// `whatsapp_id` is the member's external id, denormalized by the storage layer
/// so batches can be sent without a second lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub user_id: UserId,
    pub group_id: GroupId,
    pub whatsapp_id: String,
    pub joined_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl Membership {
    /// Last observed activity; members who never spoke count from their join.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_active_at.unwrap_or(self.joined_at)
    }

    /// Whether the member has been silent since before `cutoff`.
    pub fn is_inactive(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_activity() < cutoff
    }
}

/// A `(user, group)` pair staged for removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalCandidate {
    pub user_id: UserId,
    pub group_id: GroupId,
    pub whatsapp_id: String,
    pub reason: String,
}

/// An entry of the removal queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: QueueEntryId,
    pub user_id: UserId,
    pub group_id: GroupId,
    pub whatsapp_id: String,
    pub reason: String,
    pub enqueued_at: DateTime<Utc>,
}

/// Outcome of the batch an archived entry belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemovalOutcome {
    Success,
    Failure,
}

/// History record to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub user_id: UserId,
    pub group_id: GroupId,
    pub whatsapp_id: String,
    pub outcome: RemovalOutcome,
    pub reason: String,
}

/// Archived removal attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    pub user_id: UserId,
    pub group_id: GroupId,
    pub whatsapp_id: String,
    pub outcome: RemovalOutcome,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

/// Parameters of one removal run, captured when the job is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalConfig {
    /// External id of the target group.
    pub group_id: String,
    pub batch_size: usize,
    /// Pause between batches, protecting the platform rate limit.
    pub delay_ms: u64,
    #[serde(default)]
    pub dry_run: bool,
    /// Required when the run includes the sync phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactivity_window_ms: Option<u64>,
}

impl RemovalConfig {
    pub fn new(group_id: impl Into<String>, batch_size: usize, delay: Duration) -> Self {
        Self {
            group_id: group_id.into(),
            batch_size,
            delay_ms: millis(delay),
            dry_run: false,
            inactivity_window_ms: None,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_inactivity_window(mut self, window: Duration) -> Self {
        self.inactivity_window_ms = Some(millis(window));
        self
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn inactivity_window(&self) -> Option<Duration> {
        self.inactivity_window_ms.map(Duration::from_millis)
    }
}

/// Millisecond count of `d`, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// The instant `window` before `now`, or `None` when chrono cannot represent it.
pub fn inactivity_cutoff(now: DateTime<Utc>, window: Duration) -> Option<DateTime<Utc>> {
    let window = chrono::Duration::from_std(window).ok()?;
    now.checked_sub_signed(window)
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;

    fn membership(joined_days_ago: i64, active_days_ago: Option<i64>) -> Membership {
        let now = Utc::now();
        Membership {
            user_id: UserId::new(),
            group_id: GroupId::new(),
            whatsapp_id: "5511999990000".to_string(),
            joined_at: now - ChronoDuration::days(joined_days_ago),
            last_active_at: active_days_ago.map(|d| now - ChronoDuration::days(d)),
        }
    }

    #[test]
    fn inactivity_uses_last_activity_when_present() {
        let cutoff = Utc::now() - ChronoDuration::days(30);

        assert!(membership(90, Some(45)).is_inactive(cutoff));
        assert!(!membership(90, Some(2)).is_inactive(cutoff));
    }

    #[test]
    fn inactivity_falls_back_to_join_time() {
        let cutoff = Utc::now() - ChronoDuration::days(30);

        assert!(membership(60, None).is_inactive(cutoff));
        assert!(!membership(5, None).is_inactive(cutoff));
    }

    #[test]
    fn config_deserializes_from_camel_case() {
        let cfg: RemovalConfig = serde_json::from_value(serde_json::json!({
            "groupId": "120363000000@g.us",
            "batchSize": 2,
            "delayMs": 10000,
            "dryRun": true,
            "inactivityWindowMs": 86400000u64
        }))
        .unwrap();

        assert_eq!(cfg.batch_size, 2);
        assert_eq!(cfg.delay(), Duration::from_secs(10));
        assert!(cfg.dry_run);
        assert_eq!(cfg.inactivity_window(), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn outcome_serializes_upper_case() {
        assert_eq!(
            serde_json::to_value(RemovalOutcome::Failure).unwrap(),
            serde_json::json!("FAILURE")
        );
    }

    #[test]
    fn oversized_durations_saturate_instead_of_wrapping() {
        let config = RemovalConfig::new("g1@g.us", 1, Duration::MAX)
            .with_inactivity_window(Duration::MAX);
        assert_eq!(config.delay_ms, u64::MAX);
        assert_eq!(config.inactivity_window_ms, Some(u64::MAX));
    }

    #[test]
    fn cutoff_is_none_outside_chrono_range() {
        let now = Utc::now();
        assert_eq!(
            inactivity_cutoff(now, Duration::from_secs(60)),
            Some(now - ChronoDuration::seconds(60))
        );
        assert!(inactivity_cutoff(now, Duration::from_millis(10_u64.pow(16))).is_none());
        assert!(inactivity_cutoff(now, Duration::MAX).is_none());
    }
}
