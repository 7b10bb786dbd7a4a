use async_trait::async_trait;
use tracing::info;

use grouppurge_removal::{MemberRemover, RemoveCallError};

/// Remover that only logs the calls it receives.
///
/// Stands in for the messaging platform client when none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMemberRemover;

#[async_trait]
impl MemberRemover for LoggingMemberRemover {
    async fn remove_members(
        &self,
        group_whatsapp_id: &str,
        member_whatsapp_ids: &[String],
    ) -> Result<(), RemoveCallError> {
        info!(
            group = %group_whatsapp_id,
            members = ?member_whatsapp_ids,
            count = member_whatsapp_ids.len(),
            "remove members"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_succeeds() {
        let ids = vec!["5511900000001".to_string()];
        assert!(LoggingMemberRemover.remove_members("g1@g.us", &ids).await.is_ok());
    }
}
