//! Storage layer for the feedback portal
//!
//! Provides the abstraction over persisted students, faculty and feedback,
//! and the libSQL implementation behind it.

pub mod libsql;

#[cfg(test)]
pub mod test_utils;

use crate::error::Result;
use crate::types::{Faculty, FacultyReply, Feedback, FeedbackDetail, Student, WindowBounds};
use async_trait::async_trait;

/// Filter for feedback listings. Results are always newest-first.
#[derive(Debug, Clone, Default)]
pub struct FeedbackQuery {
    pub bounds: Option<WindowBounds>,
    pub student_id: Option<String>,
    pub faculty_id: Option<String>,
    pub limit: Option<usize>,
}

impl FeedbackQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn within(bounds: WindowBounds) -> Self {
        Self {
            bounds: Some(bounds),
            ..Self::default()
        }
    }

    pub fn for_faculty(faculty_id: impl Into<String>) -> Self {
        Self {
            faculty_id: Some(faculty_id.into()),
            ..Self::default()
        }
    }

    pub fn for_student(student_id: impl Into<String>) -> Self {
        Self {
            student_id: Some(student_id.into()),
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Totals over a window of feedback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackCounts {
    pub total: usize,
    pub distinct_faculty: usize,
    pub distinct_students: usize,
}

/// Result of attempting to attach a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Applied,
    AlreadyReplied,
    NotFound,
}

/// Storage backend trait defining all required operations
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Insert a student; returns false when the id, usn or email already exists
    async fn insert_student(&self, student: &Student) -> Result<bool>;

    /// Insert a faculty member; returns false when the id or email already exists
    async fn insert_faculty(&self, faculty: &Faculty) -> Result<bool>;

    async fn get_student(&self, id: &str) -> Result<Option<Student>>;

    async fn get_faculty(&self, id: &str) -> Result<Option<Faculty>>;

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>>;

    async fn find_student_by_usn(&self, usn: &str) -> Result<Option<Student>>;

    async fn find_faculty_by_email(&self, email: &str) -> Result<Option<Faculty>>;

    /// All faculty ordered by name
    async fn list_faculty(&self) -> Result<Vec<Faculty>>;

    async fn count_students(&self) -> Result<usize>;

    /// Store a new feedback record. Unknown student/faculty references fail.
    async fn insert_feedback(&self, feedback: &Feedback) -> Result<()>;

    async fn get_feedback(&self, id: &str) -> Result<Option<FeedbackDetail>>;

    /// Feedback joined with student and faculty, newest-first
    async fn list_feedback(&self, query: &FeedbackQuery) -> Result<Vec<FeedbackDetail>>;

    async fn feedback_counts(&self, bounds: WindowBounds) -> Result<FeedbackCounts>;

    /// Attach a reply to an unreplied feedback record in a single statement
    async fn record_reply(&self, feedback_id: &str, reply: &FacultyReply) -> Result<ReplyOutcome>;

    /// Check that the database answers queries
    async fn check_health(&self) -> Result<()>;
}
