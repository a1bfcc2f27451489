//! Feedback aggregation
//!
//! Windowed counts, listings and statistics for the admin dashboard, plus the
//! per-faculty statistics and filters behind the faculty dashboard. Statistics
//! are computed on read; nothing here is cached.

use crate::error::{PortalError, Result};
use crate::storage::{FeedbackCounts, FeedbackQuery, StorageBackend};
use crate::types::{local_date, local_midnight, FeedbackDetail, Sentiment, TimeWindow};
use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_WINDOW_DAYS: u32 = 7;
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Trailing span counted as "recent" on the faculty dashboard
pub const RECENT_ACTIVITY_DAYS: i64 = 7;

/// Admin dashboard statistics for one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStatistics {
    pub total_feedback: usize,
    pub active_faculties: usize,
    pub active_students: usize,
    pub average_feedback_per_faculty: f64,
}

impl From<FeedbackCounts> for FeedbackStatistics {
    fn from(counts: FeedbackCounts) -> Self {
        let average = if counts.distinct_faculty == 0 {
            0.0
        } else {
            counts.total as f64 / counts.distinct_faculty as f64
        };

        Self {
            total_feedback: counts.total,
            active_faculties: counts.distinct_faculty,
            active_students: counts.distinct_students,
            average_feedback_per_faculty: average,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentCounts {
    fn record(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
    }
}

/// Faculty dashboard statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyStatistics {
    pub total_feedbacks: usize,
    pub unique_students: usize,
    pub average_rating: f64,
    pub sentiment_counts: SentimentCounts,
    pub recent_feedbacks: usize,
}

impl FacultyStatistics {
    pub fn compute(feedback: &[FeedbackDetail], now: DateTime<Utc>) -> Self {
        let recent_start = now - Duration::days(RECENT_ACTIVITY_DAYS);
        let mut sentiment_counts = SentimentCounts::default();
        let mut students = HashSet::new();
        let mut score_sum = 0.0;
        let mut recent = 0;

        for detail in feedback {
            let fb = &detail.feedback;
            students.insert(fb.student_id.as_str());
            sentiment_counts.record(fb.sentiment);
            score_sum += fb.ratings.score();
            if fb.created_at >= recent_start {
                recent += 1;
            }
        }

        let average_rating = if feedback.is_empty() {
            0.0
        } else {
            score_sum / feedback.len() as f64
        };

        Self {
            total_feedbacks: feedback.len(),
            unique_students: students.len(),
            average_rating,
            sentiment_counts,
            recent_feedbacks: recent,
        }
    }
}

/// Period filter on the faculty dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Period {
    #[default]
    All,
    /// Since local midnight
    Today,
    /// Trailing seven days
    Week,
    /// Since the same instant one calendar month ago
    Month,
}

impl FromStr for Period {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Period::All),
            "today" => Ok(Period::Today),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            other => Err(PortalError::InvalidInput(format!("Unknown period: {}", other))),
        }
    }
}

impl Period {
    /// Earliest creation time the period admits
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Period::All => None,
            Period::Today => Some(local_midnight(local_date(now))),
            Period::Week => Some(now - Duration::days(7)),
            Period::Month => Some(
                now.checked_sub_months(Months::new(1))
                    .unwrap_or(now - Duration::days(30)),
            ),
        }
    }
}

/// Filters applied to one faculty member's feedback
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacultyFeedbackFilter {
    /// Case-insensitive match on student name, usn or comment
    pub search: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub period: Period,
}

impl FacultyFeedbackFilter {
    /// Build a filter from raw query values; blank values are ignored
    pub fn parse(
        search: Option<&str>,
        sentiment: Option<&str>,
        period: Option<&str>,
    ) -> Result<Self> {
        let blank = |v: &&str| !v.trim().is_empty();

        Ok(Self {
            search: search.filter(blank).map(|s| s.trim().to_lowercase()),
            sentiment: sentiment
                .filter(blank)
                .map(|s| s.trim().parse())
                .transpose()?,
            period: period
                .filter(blank)
                .map(|p| p.trim().parse())
                .transpose()?
                .unwrap_or_default(),
        })
    }

    pub fn matches(&self, detail: &FeedbackDetail, now: DateTime<Utc>) -> bool {
        let fb = &detail.feedback;

        if let Some(needle) = &self.search {
            let hit = [&detail.student.name, &detail.student.usn, &fb.comment]
                .iter()
                .any(|field| field.to_lowercase().contains(needle.as_str()));
            if !hit {
                return false;
            }
        }

        if self.sentiment.is_some_and(|s| s != fb.sentiment) {
            return false;
        }

        self.period.since(now).map_or(true, |since| fb.created_at >= since)
    }
}

/// Feedback created on the current local calendar day
#[derive(Debug, Clone)]
pub struct TodayListing {
    pub date: NaiveDate,
    pub feedback: Vec<FeedbackDetail>,
}

/// Faculty dashboard: filtered feedback and statistics over it
#[derive(Debug, Clone)]
pub struct FacultyReport {
    pub statistics: FacultyStatistics,
    pub feedback: Vec<FeedbackDetail>,
}

/// Read-side queries over stored feedback
pub struct AggregationService {
    storage: Arc<dyn StorageBackend>,
}

impl AggregationService {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    pub async fn count(&self, window: TimeWindow) -> Result<usize> {
        let counts = self.storage.feedback_counts(window.bounds(Utc::now())).await?;
        Ok(counts.total)
    }

    /// Newest-first feedback in the window, at most `limit` records
    pub async fn recent(&self, window: TimeWindow, limit: usize) -> Result<Vec<FeedbackDetail>> {
        let query = FeedbackQuery::within(window.bounds(Utc::now())).limit(limit);
        self.storage.list_feedback(&query).await
    }

    pub async fn statistics(&self, window: TimeWindow) -> Result<FeedbackStatistics> {
        let counts = self.storage.feedback_counts(window.bounds(Utc::now())).await?;
        debug!("Statistics over {:?}: {:?}", window, counts);
        Ok(counts.into())
    }

    pub async fn today(&self) -> Result<TodayListing> {
        let now = Utc::now();
        let query = FeedbackQuery::within(TimeWindow::Today.bounds(now));
        Ok(TodayListing {
            date: local_date(now),
            feedback: self.storage.list_feedback(&query).await?,
        })
    }

    pub async fn for_faculty(&self, faculty_id: &str) -> Result<Vec<FeedbackDetail>> {
        self.storage
            .list_feedback(&FeedbackQuery::for_faculty(faculty_id))
            .await
    }

    pub async fn for_student(&self, student_id: &str) -> Result<Vec<FeedbackDetail>> {
        self.storage
            .list_feedback(&FeedbackQuery::for_student(student_id))
            .await
    }

    pub async fn faculty_report(
        &self,
        faculty_id: &str,
        filter: &FacultyFeedbackFilter,
    ) -> Result<FacultyReport> {
        let now = Utc::now();
        let feedback: Vec<FeedbackDetail> = self
            .for_faculty(faculty_id)
            .await?
            .into_iter()
            .filter(|detail| filter.matches(detail, now))
            .collect();

        Ok(FacultyReport {
            statistics: FacultyStatistics::compute(&feedback, now),
            feedback,
        })
    }
}
