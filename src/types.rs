//! Core data types for the feedback portal
//!
//! Students, faculty, feedback records and the public summaries that are safe
//! to send to dashboards. Wire names are camelCase to match the REST surface.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{PortalError, Result};

/// Rating categories the dashboards ask students to score
pub const RATING_CATEGORIES: [&str; 5] =
    ["communication", "clarity", "knowledge", "punctuality", "behavior"];

/// Score assumed for a feedback whose ratings carry none of the categories
pub const DEFAULT_RATING: f64 = 4.0;

/// Generate a new record identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Account role used at login and inside session tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
}

impl FromStr for Role {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "student" => Ok(Role::Student),
            "faculty" => Ok(Role::Faculty),
            other => Err(PortalError::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Faculty => write!(f, "faculty"),
        }
    }
}

/// Stored student record, including the password hash
#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: String,
    /// University serial number
    pub usn: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub semester: i64,
    pub branch: String,
}

impl Student {
    pub fn summary(&self) -> StudentSummary {
        StudentSummary {
            id: self.id.clone(),
            usn: self.usn.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            semester: self.semester,
            branch: self.branch.clone(),
        }
    }
}

/// Stored faculty record, including the password hash
#[derive(Debug, Clone, PartialEq)]
pub struct Faculty {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    /// Department
    pub branch: String,
}

impl Faculty {
    pub fn summary(&self) -> FacultySummary {
        FacultySummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            branch: self.branch.clone(),
        }
    }
}

/// Public view of a student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: String,
    pub usn: String,
    pub name: String,
    pub email: String,
    pub semester: i64,
    pub branch: String,
}

/// Public view of a faculty member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultySummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub branch: String,
}

/// User summary returned at login, tagged with the role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum UserSummary {
    Student(StudentSummary),
    Faculty(FacultySummary),
}

impl UserSummary {
    pub fn id(&self) -> &str {
        match self {
            UserSummary::Student(s) => &s.id,
            UserSummary::Faculty(f) => &f.id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            UserSummary::Student(_) => Role::Student,
            UserSummary::Faculty(_) => Role::Faculty,
        }
    }
}

/// Named sub-scores, stored as submitted. Keys and value types are not
/// enforced; only JSON numbers take part in averages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ratings(pub BTreeMap<String, Value>);

impl Ratings {
    /// Numeric score for `category`; null, text and other shapes read as absent
    pub fn get(&self, category: &str) -> Option<f64> {
        self.0.get(category).and_then(Value::as_f64)
    }

    /// Mean of the known categories that carry a positive score
    pub fn present_average(&self) -> Option<f64> {
        let present: Vec<f64> = RATING_CATEGORIES
            .iter()
            .filter_map(|c| self.get(c))
            .filter(|v| *v > 0.0)
            .collect();

        if present.is_empty() {
            None
        } else {
            Some(present.iter().sum::<f64>() / present.len() as f64)
        }
    }

    /// Per-feedback score used by the faculty dashboard
    pub fn score(&self) -> f64 {
        self.present_average().unwrap_or(DEFAULT_RATING)
    }
}

impl<const N: usize> From<[(&str, f64); N]> for Ratings {
    fn from(pairs: [(&str, f64); N]) -> Self {
        Ratings(pairs.iter().map(|(k, v)| (k.to_string(), Value::from(*v))).collect())
    }
}

/// Sentiment label attached to feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl FromStr for Sentiment {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            other => Err(PortalError::InvalidInput(format!("Unknown sentiment: {}", other))),
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A faculty reply; text and timestamp always travel together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyReply {
    pub reply: String,
    pub replied_at: DateTime<Utc>,
}

/// A feedback record as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub student_id: String,
    pub faculty_id: String,
    pub ratings: Ratings,
    pub comment: String,
    pub sentiment: Sentiment,
    /// False while the sentiment label comes from the placeholder analyzer
    pub sentiment_analyzed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_code: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub reply: Option<FacultyReply>,
}

/// Older records packed submission metadata into the comment text
static LEGACY_COMMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(.*?)\s*\[Semester: ([^,\]]*), Subject: (.*) \(([^()]*)\)\]\s*$")
        .expect("legacy comment pattern is valid")
});

fn legacy_value(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "undefined" || raw == "null" {
        None
    } else {
        Some(raw.to_string())
    }
}

impl Feedback {
    pub fn is_replied(&self) -> bool {
        self.reply.is_some()
    }

    fn has_metadata(&self) -> bool {
        self.semester.is_some()
            || self.subject_id.is_some()
            || self.subject_name.is_some()
            || self.subject_code.is_some()
    }

    /// Split a legacy `"... [Semester: S, Subject: NAME (CODE)]"` comment into
    /// the dedicated fields. Returns true if the comment was rewritten.
    pub fn unpack_legacy_comment(&mut self) -> bool {
        if self.has_metadata() {
            return false;
        }

        let Some(caps) = LEGACY_COMMENT.captures(&self.comment) else {
            return false;
        };

        let comment = caps[1].to_string();
        self.semester = legacy_value(&caps[2]);
        self.subject_name = legacy_value(&caps[3]);
        self.subject_code = legacy_value(&caps[4]);
        self.comment = comment;
        true
    }
}

/// Feedback joined with the student and faculty it references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackDetail {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub student: StudentSummary,
    pub faculty: FacultySummary,
}

/// Time window applied to feedback queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    AllTime,
    /// Trailing window of N * 24 hours ending now
    TrailingDays(u32),
    /// Current calendar day in server local time
    Today,
}

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow::TrailingDays(7)
    }
}

/// Half-open `[start, end)` bounds; `None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl WindowBounds {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at < e)
    }
}

impl TimeWindow {
    pub fn bounds(&self, now: DateTime<Utc>) -> WindowBounds {
        match self {
            TimeWindow::AllTime => WindowBounds { start: None, end: None },
            TimeWindow::TrailingDays(days) => {
                let start = now
                    .checked_sub_signed(chrono::Duration::days(i64::from(*days)))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC);
                WindowBounds { start: Some(start), end: None }
            }
            TimeWindow::Today => {
                let today = local_date(now);
                let tomorrow = today.succ_opt().unwrap_or(today);
                WindowBounds {
                    start: Some(local_midnight(today)),
                    end: Some(local_midnight(tomorrow)),
                }
            }
        }
    }
}

/// Calendar date of `now` in server local time
pub fn local_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

/// Start of `date` in server local time, as UTC
pub fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        // Midnight skipped by a DST jump
        None => Utc.from_utc_datetime(&naive),
    }
}

/// Fixed-width RFC 3339 text so lexical order matches time order in SQL
pub fn to_db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_db_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PortalError::Database(format!("Invalid timestamp '{}': {}", raw, e)))
}
