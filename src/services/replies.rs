//! Faculty replies to feedback

use crate::error::{PortalError, Result};
use crate::storage::{ReplyOutcome, StorageBackend};
use crate::types::{FacultyReply, FeedbackDetail};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyRequest {
    #[serde(default)]
    pub reply: Option<String>,
}

pub struct ReplyService {
    storage: Arc<dyn StorageBackend>,
}

impl ReplyService {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Attach a reply to an unreplied feedback record
    pub async fn reply(&self, feedback_id: &str, text: Option<&str>) -> Result<FeedbackDetail> {
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return Err(PortalError::InvalidInput("Reply message is required".to_string()));
        };

        let reply = FacultyReply {
            reply: text.to_string(),
            replied_at: Utc::now(),
        };

        match self.storage.record_reply(feedback_id, &reply).await? {
            ReplyOutcome::Applied => info!("Reply recorded on feedback {}", feedback_id),
            ReplyOutcome::AlreadyReplied => {
                debug!("Feedback {} already has a reply", feedback_id);
                return Err(PortalError::AlreadyReplied(feedback_id.to_string()));
            }
            ReplyOutcome::NotFound => {
                return Err(PortalError::NotFound(format!("feedback {}", feedback_id)))
            }
        }

        self.storage
            .get_feedback(feedback_id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("feedback {}", feedback_id)))
    }
}
