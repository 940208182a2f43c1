//! Operator broadcast to every registered, non-blocked owner

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::transfer::retry_rate_limited;
use crate::access::Requester;
use crate::errors::{LinkRelayError, Result};
use crate::storage::SeaOrmStorage;
use crate::transport::{ChatId, Transport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReport {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct BroadcastService {
    storage: Arc<SeaOrmStorage>,
    transport: Arc<dyn Transport>,
}

impl BroadcastService {
    pub fn new(storage: Arc<SeaOrmStorage>, transport: Arc<dyn Transport>) -> Self {
        Self { storage, transport }
    }

    /// Send `text` to each recipient in turn; one failed recipient does not stop the rest
    pub async fn broadcast(&self, text: &str, requester: &Requester) -> Result<BroadcastReport> {
        if !requester.is_operator {
            return Err(LinkRelayError::permission_denied(format!(
                "用户 {} 不是管理员，不能广播",
                requester.id
            )));
        }
        if text.trim().is_empty() {
            return Err(LinkRelayError::validation("broadcast text cannot be empty"));
        }

        let recipients = self.storage.list_active_owner_ids().await?;
        let mut report = BroadcastReport {
            total: recipients.len(),
            ..Default::default()
        };

        for owner_id in recipients {
            let chat = ChatId(owner_id);
            match retry_rate_limited(&format!("broadcast to {}", chat), |_| {
                self.transport.send_text(chat, text)
            })
            .await
            {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    warn!("Broadcast to {} failed: {}", chat, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Broadcast by {} finished: {}/{} sent, {} failed",
            requester.id, report.sent, report.total, report.failed
        );
        Ok(report)
    }
}
