//! Test fixtures for storage-backed unit tests
//!
//! libSQL `:memory:` databases are private to one connection, so fixtures use
//! a migrated file inside a temporary directory that lives as long as the
//! returned guard.

use crate::storage::libsql::LibsqlStorage;
use crate::types::{new_id, Faculty, Feedback, Ratings, Sentiment, Student};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tempfile::TempDir;

/// Open a freshly migrated database in a temp directory
pub async fn create_test_storage() -> (TempDir, Arc<LibsqlStorage>) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("portal.db");
    let storage = LibsqlStorage::open_local(path.to_str().expect("utf-8 temp path"))
        .await
        .expect("open test storage");
    (dir, Arc::new(storage))
}

pub fn student(usn: &str, email: &str) -> Student {
    Student {
        id: new_id(),
        usn: usn.to_string(),
        name: format!("Student {}", usn),
        email: email.to_string(),
        password_hash: "hash".to_string(),
        semester: 5,
        branch: "CS".to_string(),
    }
}

pub fn faculty(email: &str) -> Faculty {
    Faculty {
        id: new_id(),
        name: format!("Faculty {}", email),
        email: email.to_string(),
        password_hash: "hash".to_string(),
        branch: "CS".to_string(),
    }
}

/// Feedback created `age` ago
pub fn feedback(student_id: &str, faculty_id: &str, age: Duration) -> Feedback {
    Feedback {
        id: new_id(),
        student_id: student_id.to_string(),
        faculty_id: faculty_id.to_string(),
        ratings: Ratings::from([("communication", 5.0), ("clarity", 4.0)]),
        comment: "Clear lectures".to_string(),
        sentiment: Sentiment::Positive,
        sentiment_analyzed: false,
        semester: Some("5".to_string()),
        subject_id: None,
        subject_name: Some("DBMS".to_string()),
        subject_code: Some("CS501".to_string()),
        created_at: Utc::now() - age,
        reply: None,
    }
}
