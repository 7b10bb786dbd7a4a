//! Partial progress updates reported by long-running work.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A partial progress report.
///
/// Every field is optional: a consumer merges the present fields into its own
/// progress summary and leaves the others untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_batch: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressUpdate {
    /// Update carrying a cumulative processed count.
    pub fn processed(processed: u64) -> Self {
        Self {
            processed: Some(processed),
            ..Default::default()
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_batch(mut self, batch: u32) -> Self {
        self.current_batch = Some(batch);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Callback receiving progress updates.
pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;
