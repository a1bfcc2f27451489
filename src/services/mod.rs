//! Services layer for the feedback portal
//!
//! Authentication, submission, aggregation, replies and export, each built on
//! a shared `StorageBackend`.

pub mod aggregation;
pub mod auth;
pub mod export;
pub mod replies;
pub mod sentiment;
pub mod submission;

pub use aggregation::{
    AggregationService, FacultyFeedbackFilter, FacultyReport, FacultyStatistics,
    FeedbackStatistics, Period, SentimentCounts, TodayListing,
};
pub use auth::{AuthService, Claims, LoginRequest, LoginResponse};
pub use export::{ExportService, EXPORT_FILENAME};
pub use replies::{ReplyRequest, ReplyService};
pub use sentiment::{PlaceholderAnalyzer, SentimentAnalyzer, SentimentVerdict};
pub use submission::{FeedbackSubmission, SubmissionService};
