//! CSV export of all feedback

use crate::error::{PortalError, Result};
use crate::storage::{FeedbackQuery, StorageBackend};
use crate::types::{Feedback, FeedbackDetail};
use chrono::SecondsFormat;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

pub const EXPORT_FILENAME: &str = "feedback_report.csv";

pub const EXPORT_HEADER: [&str; 11] = [
    "Student Name",
    "USN",
    "Student Email",
    "Semester",
    "Branch",
    "Faculty Name",
    "Faculty Email",
    "Faculty Department",
    "Comment",
    "Sentiment",
    "Submitted At",
];

/// Collapse line breaks so each record stays on one line
pub fn single_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Comment column text: the comment followed by any submission metadata as
/// `[Semester: S, Subject: NAME (CODE)]`
pub fn export_comment(fb: &Feedback) -> String {
    let has_metadata = fb.semester.is_some()
        || fb.subject_id.is_some()
        || fb.subject_name.is_some()
        || fb.subject_code.is_some();
    if !has_metadata {
        return fb.comment.clone();
    }

    let suffix = format!(
        "[Semester: {}, Subject: {} ({})]",
        fb.semester.as_deref().unwrap_or_default(),
        fb.subject_name.as_deref().unwrap_or_default(),
        fb.subject_code.as_deref().unwrap_or_default()
    );
    if fb.comment.is_empty() {
        suffix
    } else {
        format!("{} {}", fb.comment, suffix)
    }
}

fn record(detail: &FeedbackDetail) -> [String; 11] {
    let student = &detail.student;
    let faculty = &detail.faculty;
    let fb = &detail.feedback;

    [
        single_line(&student.name),
        single_line(&student.usn),
        single_line(&student.email),
        student.semester.to_string(),
        single_line(&student.branch),
        single_line(&faculty.name),
        single_line(&faculty.email),
        single_line(&faculty.branch),
        single_line(&export_comment(fb)),
        fb.sentiment.to_string(),
        fb.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    ]
}

/// Write the header and one quoted record per feedback
pub fn write_feedback_csv<W: Write>(writer: W, rows: &[FeedbackDetail]) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    out.write_record(EXPORT_HEADER)?;
    for detail in rows {
        out.write_record(record(detail))?;
    }
    out.flush()?;
    Ok(())
}

pub fn feedback_csv(rows: &[FeedbackDetail]) -> Result<String> {
    let mut buf = Vec::new();
    write_feedback_csv(&mut buf, rows)?;
    String::from_utf8(buf).map_err(|e| PortalError::Other(format!("CSV output is not UTF-8: {}", e)))
}

pub struct ExportService {
    storage: Arc<dyn StorageBackend>,
}

impl ExportService {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Every feedback record, newest-first, as a CSV document
    pub async fn export_all(&self) -> Result<String> {
        let rows = self.storage.list_feedback(&FeedbackQuery::all()).await?;
        info!("Exporting {} feedback records", rows.len());
        feedback_csv(&rows)
    }
}
