//! Feedback submission
//!
//! Accepts a student's feedback for a faculty member, labels its sentiment and
//! persists it with the semester/subject metadata in their own fields.

use crate::error::{PortalError, Result};
use crate::services::sentiment::SentimentAnalyzer;
use crate::storage::StorageBackend;
use crate::types::{new_id, Feedback, FeedbackDetail, Ratings};
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::info;

/// Submission body. Metadata fields accept strings or numbers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    pub student_id: Option<String>,
    pub faculty_id: Option<String>,
    #[serde(default)]
    pub ratings: Option<Ratings>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub semester: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub subject_id: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub subject_name: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub subject_code: Option<String>,
}

fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, got {}",
            other
        ))),
    }
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Stores new feedback
pub struct SubmissionService {
    storage: Arc<dyn StorageBackend>,
    analyzer: Arc<dyn SentimentAnalyzer>,
}

impl SubmissionService {
    pub fn new(storage: Arc<dyn StorageBackend>, analyzer: Arc<dyn SentimentAnalyzer>) -> Self {
        Self { storage, analyzer }
    }

    /// Validate and persist a submission, returning the stored record
    pub async fn submit(&self, submission: FeedbackSubmission) -> Result<FeedbackDetail> {
        let (Some(student_id), Some(faculty_id)) = (
            required(submission.student_id),
            required(submission.faculty_id),
        ) else {
            return Err(PortalError::InvalidInput(
                "Missing required fields: studentId or facultyId".to_string(),
            ));
        };

        let comment = submission.comment.unwrap_or_default();
        let verdict = self.analyzer.analyze(&comment);

        let feedback = Feedback {
            id: new_id(),
            student_id,
            faculty_id,
            ratings: submission.ratings.unwrap_or_default(),
            comment,
            sentiment: verdict.label,
            sentiment_analyzed: verdict.analyzed,
            semester: submission.semester,
            subject_id: submission.subject_id,
            subject_name: submission.subject_name,
            subject_code: submission.subject_code,
            created_at: Utc::now(),
            reply: None,
        };

        self.storage.insert_feedback(&feedback).await?;
        info!(
            "Stored feedback {} from {} for {}",
            feedback.id, feedback.student_id, feedback.faculty_id
        );

        self.storage
            .get_feedback(&feedback.id)
            .await?
            .ok_or_else(|| PortalError::Database(format!("feedback {} vanished after insert", feedback.id)))
    }
}
