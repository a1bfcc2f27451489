//! Feedback Portal - college feedback backend
//!
//! A REST service through which students rate and comment on faculty, faculty
//! read and reply to their feedback, and administrators watch aggregate
//! activity and export everything as CSV.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core records (Student, Faculty, Feedback) and time windows
//! - **Storage**: libSQL backend behind the `StorageBackend` trait
//! - **Services**: Authentication, submission, aggregation, replies, export
//! - **API**: axum router, handlers and the bearer-token session extractor
//!
//! # Example
//!
//! ```ignore
//! use feedback_portal::{api::{build_router, AppState}, LibsqlStorage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Arc::new(LibsqlStorage::open_local("feedback_portal.db").await?);
//!     let router = build_router(AppState::new(storage, b"secret"));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:4000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod seed;
pub mod services;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::PortalConfig;
pub use error::{PortalError, Result};
pub use storage::{
    libsql::{ConnectionMode, LibsqlStorage},
    FeedbackQuery, StorageBackend,
};
pub use types::{
    Faculty, FacultyReply, FacultySummary, Feedback, FeedbackDetail, Ratings, Role, Sentiment,
    Student, StudentSummary, TimeWindow, UserSummary,
};
