//! JSON seed data for the in-memory backend.
//!
//! ```json
//! {
//!   "groups": [{
//!     "whatsappId": "120363000000@g.us",
//!     "name": "Neighbourhood",
//!     "members": [
//!       { "whatsappId": "5511900000001", "joinedAt": "2025-01-01T00:00:00Z" },
//!       { "whatsappId": "5511900000002", "joinedAt": "2025-01-01T00:00:00Z",
//!         "lastActiveAt": "2025-06-01T00:00:00Z", "whitelisted": true }
//!     ]
//!   }]
//! }
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use grouppurge_core::DomainError;

use super::in_memory::InMemoryBackend;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid seed data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] DomainError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub groups: Vec<SeedGroup>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedGroup {
    pub whatsapp_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub members: Vec<SeedMember>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedMember {
    pub whatsapp_id: String,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub last_active_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub whitelisted: bool,
}

impl Seed {
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

impl InMemoryBackend {
    /// Load groups, members and whitelist entries. Existing data is kept.
    pub fn seed(&self, seed: &Seed) -> Result<(), SeedError> {
        let mut members = 0usize;
        for g in &seed.groups {
            let group = self.add_group(&g.whatsapp_id, &g.name)?;
            for m in &g.members {
                let user = self.add_member(&group, &m.whatsapp_id, m.joined_at, m.last_active_at)?;
                if m.whitelisted {
                    self.whitelist(&user, &group)?;
                }
                members += 1;
            }
        }

        info!(groups = seed.groups.len(), members, "seed data loaded");
        Ok(())
    }
}
