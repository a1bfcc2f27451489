//! LibSQL storage backend implementation
//!
//! Persists students, faculty and feedback in a local libSQL/SQLite file (or a
//! remote libSQL server). Foreign keys are enforced on every local connection,
//! so feedback can only reference existing students and faculty.

use crate::error::{PortalError, Result};
use crate::storage::{FeedbackCounts, FeedbackQuery, ReplyOutcome, StorageBackend};
use crate::types::{
    parse_db_timestamp, to_db_timestamp, Faculty, FacultyReply, FacultySummary, Feedback,
    FeedbackDetail, Ratings, Sentiment, Student, StudentSummary, WindowBounds,
};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{params, Builder, Connection, Database};
use tracing::{debug, info, warn};

/// Embedded migrations, applied in order and recorded in `_migrations_applied`
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_initial_schema.sql",
        include_str!("../../migrations/libsql/001_initial_schema.sql"),
    ),
    (
        "002_add_indexes.sql",
        include_str!("../../migrations/libsql/002_add_indexes.sql"),
    ),
    (
        "003_flag_legacy_comments.sql",
        include_str!("../../migrations/libsql/003_flag_legacy_comments.sql"),
    ),
];

const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

const STUDENT_COLUMNS: &str = "id, usn, name, email, password, semester, branch";
const FACULTY_COLUMNS: &str = "id, name, email, password, branch";

/// Feedback joined with its student and faculty. Column order is read by
/// `row_to_detail`.
const FEEDBACK_DETAIL_SELECT: &str = r#"
    SELECT f.id, f.student_id, f.faculty_id, f.ratings, f.comment,
           f.sentiment, f.sentiment_analyzed,
           f.semester, f.subject_id, f.subject_name, f.subject_code,
           f.created_at, f.reply, f.replied_at,
           s.id, s.usn, s.name, s.email, s.semester, s.branch,
           fa.id, fa.name, fa.email, fa.branch,
           f.legacy_comment
    FROM feedback f
    JOIN students s ON s.id = f.student_id
    JOIN faculty fa ON fa.id = f.faculty_id
"#;

/// Database connection mode
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database
    Local(String),
    /// Remote libSQL server
    Remote { url: String, token: String },
}

impl ConnectionMode {
    /// Parse a connection string:
    /// - "libsql://..." / "https://..." → Remote (requires a token)
    /// - "sqlite://path" or "file:path" → Local with the prefix stripped
    /// - anything else → Local file path
    pub fn from_url(database_url: &str, token: Option<&str>) -> Result<Self> {
        if database_url.starts_with("libsql://") || database_url.starts_with("https://") {
            let token = token.filter(|t| !t.is_empty()).ok_or_else(|| {
                PortalError::Other(format!(
                    "Remote database '{}' requires DATABASE_AUTH_TOKEN",
                    database_url
                ))
            })?;
            return Ok(ConnectionMode::Remote {
                url: database_url.to_string(),
                token: token.to_string(),
            });
        }

        let path = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("file:"))
            .unwrap_or(database_url);

        if path.is_empty() || path == ":memory:" {
            return Err(PortalError::Other(format!(
                "Unsupported database path '{}': a file path is required",
                database_url
            )));
        }

        Ok(ConnectionMode::Local(path.to_string()))
    }
}

/// LibSQL storage backend
pub struct LibsqlStorage {
    db: Database,
    local: bool,
}

impl LibsqlStorage {
    /// Open (creating if needed) the database and apply pending migrations
    ///
    /// # Example
    /// ```ignore
    /// let storage = LibsqlStorage::open(ConnectionMode::Local("portal.db".into())).await?;
    /// ```
    pub async fn open(mode: ConnectionMode) -> Result<Self> {
        info!("Connecting to LibSQL database: {}", describe(&mode));

        let (db, local) = match mode {
            ConnectionMode::Local(ref path) => {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            PortalError::Database(format!(
                                "Failed to create database directory {}: {}",
                                parent.display(),
                                e
                            ))
                        })?;
                    }
                }

                let db = Builder::new_local(path).build().await.map_err(|e| {
                    PortalError::Database(format!("Failed to create local database: {}", e))
                })?;
                (db, true)
            }
            ConnectionMode::Remote { ref url, ref token } => {
                let db = Builder::new_remote(url.clone(), token.clone())
                    .build()
                    .await
                    .map_err(|e| {
                        PortalError::Database(format!("Failed to create remote database: {}", e))
                    })?;
                (db, false)
            }
        };

        info!("LibSQL database connection established");

        let storage = Self { db, local };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a local database file
    pub async fn open_local(path: &str) -> Result<Self> {
        Self::open(ConnectionMode::Local(path.to_string())).await
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        debug!("Running database migrations...");

        let conn = self.get_conn().await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations_applied (
                migration_name TEXT PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )",
            params![],
        )
        .await
        .map_err(|e| PortalError::Migration(format!("Failed to create migrations table: {}", e)))?;

        for (name, sql) in MIGRATIONS {
            let mut rows = conn
                .query(
                    "SELECT COUNT(*) FROM _migrations_applied WHERE migration_name = ?",
                    params![*name],
                )
                .await?;

            let already_applied = match rows.next().await? {
                Some(row) => row.get::<i64>(0)? > 0,
                None => false,
            };

            if already_applied {
                debug!("Skipping already applied migration: {}", name);
                continue;
            }

            conn.execute_batch(sql).await.map_err(|e| {
                PortalError::Migration(format!("Failed to execute {}: {}", name, e))
            })?;

            conn.execute(
                "INSERT INTO _migrations_applied (migration_name, applied_at) VALUES (?, ?)",
                params![*name, Utc::now().timestamp()],
            )
            .await
            .map_err(|e| PortalError::Migration(format!("Failed to record migration: {}", e)))?;

            info!("Executed migration: {}", name);
        }

        debug!("Database migrations completed");
        Ok(())
    }

    /// Get a connection from the database
    async fn get_conn(&self) -> Result<Connection> {
        let conn = self
            .db
            .connect()
            .map_err(|e| PortalError::Database(format!("Failed to get connection: {}", e)))?;

        if self.local {
            conn.execute_batch(CONNECTION_PRAGMAS).await?;
        }

        Ok(conn)
    }

    async fn query_student(&self, column: &str, value: &str) -> Result<Option<Student>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM students WHERE {} = ?", STUDENT_COLUMNS, column);
        let mut rows = conn.query(&sql, params![value]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_student(&row)?)),
            None => Ok(None),
        }
    }

    async fn query_faculty(&self, column: &str, value: &str) -> Result<Option<Faculty>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM faculty WHERE {} = ?", FACULTY_COLUMNS, column);
        let mut rows = conn.query(&sql, params![value]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_faculty(&row)?)),
            None => Ok(None),
        }
    }
}

fn describe(mode: &ConnectionMode) -> String {
    match mode {
        ConnectionMode::Local(path) => format!("local file {}", path),
        ConnectionMode::Remote { url, .. } => format!("remote {}", url),
    }
}

fn row_to_student(row: &libsql::Row) -> Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        usn: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        semester: row.get(5)?,
        branch: row.get(6)?,
    })
}

fn row_to_faculty(row: &libsql::Row) -> Result<Faculty> {
    Ok(Faculty {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        branch: row.get(4)?,
    })
}

/// Convert a row of `FEEDBACK_DETAIL_SELECT` to a joined record
fn row_to_detail(row: &libsql::Row) -> Result<FeedbackDetail> {
    let ratings_json: String = row.get(3)?;
    let ratings: Ratings = serde_json::from_str(&ratings_json)?;

    let sentiment_str: String = row.get(5)?;
    let sentiment: Sentiment = sentiment_str
        .parse()
        .map_err(|_| PortalError::Database(format!("Unknown sentiment: {}", sentiment_str)))?;

    let created_at: String = row.get(11)?;
    let reply: Option<String> = row.get(12)?;
    let replied_at: Option<String> = row.get(13)?;

    let reply = match (reply, replied_at) {
        (Some(reply), Some(at)) => Some(FacultyReply {
            reply,
            replied_at: parse_db_timestamp(&at)?,
        }),
        (None, None) => None,
        _ => {
            return Err(PortalError::Database(
                "Feedback row has reply without timestamp".to_string(),
            ))
        }
    };

    let mut feedback = Feedback {
        id: row.get(0)?,
        student_id: row.get(1)?,
        faculty_id: row.get(2)?,
        ratings,
        comment: row.get(4)?,
        sentiment,
        sentiment_analyzed: row.get::<i64>(6)? != 0,
        semester: row.get(7)?,
        subject_id: row.get(8)?,
        subject_name: row.get(9)?,
        subject_code: row.get(10)?,
        created_at: parse_db_timestamp(&created_at)?,
        reply,
    };
    if row.get::<i64>(24)? != 0 {
        feedback.unpack_legacy_comment();
    }

    Ok(FeedbackDetail {
        feedback,
        student: StudentSummary {
            id: row.get(14)?,
            usn: row.get(15)?,
            name: row.get(16)?,
            email: row.get(17)?,
            semester: row.get(18)?,
            branch: row.get(19)?,
        },
        faculty: FacultySummary {
            id: row.get(20)?,
            name: row.get(21)?,
            email: row.get(22)?,
            branch: row.get(23)?,
        },
    })
}

/// Append window bounds on `column` to a WHERE clause
fn push_bounds(
    clauses: &mut Vec<String>,
    values: &mut Vec<libsql::Value>,
    column: &str,
    bounds: &WindowBounds,
) {
    if let Some(start) = bounds.start {
        clauses.push(format!("{} >= ?", column));
        values.push(libsql::Value::Text(to_db_timestamp(start)));
    }
    if let Some(end) = bounds.end {
        clauses.push(format!("{} < ?", column));
        values.push(libsql::Value::Text(to_db_timestamp(end)));
    }
}

fn where_sql(clauses: &[String]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    }
}

#[async_trait]
impl StorageBackend for LibsqlStorage {
    async fn insert_student(&self, student: &Student) -> Result<bool> {
        let conn = self.get_conn().await?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO students (id, usn, name, email, password, semester, branch)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    student.id.clone(),
                    student.usn.clone(),
                    student.name.clone(),
                    student.email.clone(),
                    student.password_hash.clone(),
                    student.semester,
                    student.branch.clone(),
                ],
            )
            .await?;

        if inserted == 0 {
            debug!("Student {} already exists, skipped", student.email);
        }
        Ok(inserted > 0)
    }

    async fn insert_faculty(&self, faculty: &Faculty) -> Result<bool> {
        let conn = self.get_conn().await?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO faculty (id, name, email, password, branch)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    faculty.id.clone(),
                    faculty.name.clone(),
                    faculty.email.clone(),
                    faculty.password_hash.clone(),
                    faculty.branch.clone(),
                ],
            )
            .await?;

        if inserted == 0 {
            debug!("Faculty {} already exists, skipped", faculty.email);
        }
        Ok(inserted > 0)
    }

    async fn get_student(&self, id: &str) -> Result<Option<Student>> {
        self.query_student("id", id).await
    }

    async fn get_faculty(&self, id: &str) -> Result<Option<Faculty>> {
        self.query_faculty("id", id).await
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>> {
        self.query_student("email", email).await
    }

    async fn find_student_by_usn(&self, usn: &str) -> Result<Option<Student>> {
        self.query_student("usn", usn).await
    }

    async fn find_faculty_by_email(&self, email: &str) -> Result<Option<Faculty>> {
        self.query_faculty("email", email).await
    }

    async fn list_faculty(&self) -> Result<Vec<Faculty>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM faculty ORDER BY name, id", FACULTY_COLUMNS);
        let mut rows = conn.query(&sql, params![]).await?;

        let mut faculty = Vec::new();
        while let Some(row) = rows.next().await? {
            faculty.push(row_to_faculty(&row)?);
        }
        Ok(faculty)
    }

    async fn count_students(&self) -> Result<usize> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query("SELECT COUNT(*) FROM students", params![]).await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as usize),
            None => Ok(0),
        }
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<()> {
        debug!(
            "Storing feedback {} (student {}, faculty {})",
            feedback.id, feedback.student_id, feedback.faculty_id
        );

        let conn = self.get_conn().await?;
        conn.execute(
            r#"
            INSERT INTO feedback (
                id, student_id, faculty_id, ratings, comment,
                sentiment, sentiment_analyzed,
                semester, subject_id, subject_name, subject_code,
                created_at, reply, replied_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                feedback.id.clone(),
                feedback.student_id.clone(),
                feedback.faculty_id.clone(),
                serde_json::to_string(&feedback.ratings)?,
                feedback.comment.clone(),
                feedback.sentiment.as_str(),
                if feedback.sentiment_analyzed { 1i64 } else { 0i64 },
                feedback.semester.clone(),
                feedback.subject_id.clone(),
                feedback.subject_name.clone(),
                feedback.subject_code.clone(),
                to_db_timestamp(feedback.created_at),
                feedback.reply.as_ref().map(|r| r.reply.clone()),
                feedback.reply.as_ref().map(|r| to_db_timestamp(r.replied_at)),
            ],
        )
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("FOREIGN KEY") {
                warn!(
                    "Feedback {} references unknown student {} or faculty {}",
                    feedback.id, feedback.student_id, feedback.faculty_id
                );
            }
            PortalError::Database(msg)
        })?;

        Ok(())
    }

    async fn get_feedback(&self, id: &str) -> Result<Option<FeedbackDetail>> {
        let conn = self.get_conn().await?;
        let sql = format!("{} WHERE f.id = ?", FEEDBACK_DETAIL_SELECT);
        let mut rows = conn.query(&sql, params![id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_detail(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_feedback(&self, query: &FeedbackQuery) -> Result<Vec<FeedbackDetail>> {
        debug!("Listing feedback: {:?}", query);

        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(bounds) = &query.bounds {
            push_bounds(&mut clauses, &mut values, "f.created_at", bounds);
        }
        if let Some(student_id) = &query.student_id {
            clauses.push("f.student_id = ?".to_string());
            values.push(libsql::Value::Text(student_id.clone()));
        }
        if let Some(faculty_id) = &query.faculty_id {
            clauses.push("f.faculty_id = ?".to_string());
            values.push(libsql::Value::Text(faculty_id.clone()));
        }

        // LIMIT -1 is unbounded in SQLite
        let limit = query.limit.map_or(-1, |l| l.min(i64::MAX as usize) as i64);
        values.push(libsql::Value::Integer(limit));

        let sql = format!(
            "{} {} ORDER BY f.created_at DESC, f.rowid DESC LIMIT ?",
            FEEDBACK_DETAIL_SELECT,
            where_sql(&clauses)
        );

        let conn = self.get_conn().await?;
        let mut rows = conn.query(&sql, libsql::params_from_iter(values)).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(row_to_detail(&row)?);
        }

        debug!("Listed {} feedback records", results.len());
        Ok(results)
    }

    async fn feedback_counts(&self, bounds: WindowBounds) -> Result<FeedbackCounts> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        push_bounds(&mut clauses, &mut values, "created_at", &bounds);

        let sql = format!(
            "SELECT COUNT(*), COUNT(DISTINCT faculty_id), COUNT(DISTINCT student_id) FROM feedback {}",
            where_sql(&clauses)
        );

        let conn = self.get_conn().await?;
        let mut rows = conn.query(&sql, libsql::params_from_iter(values)).await?;

        match rows.next().await? {
            Some(row) => Ok(FeedbackCounts {
                total: row.get::<i64>(0)? as usize,
                distinct_faculty: row.get::<i64>(1)? as usize,
                distinct_students: row.get::<i64>(2)? as usize,
            }),
            None => Ok(FeedbackCounts::default()),
        }
    }

    async fn record_reply(&self, feedback_id: &str, reply: &FacultyReply) -> Result<ReplyOutcome> {
        let conn = self.get_conn().await?;
        let updated = conn
            .execute(
                "UPDATE feedback SET reply = ?, replied_at = ? WHERE id = ? AND reply IS NULL",
                params![
                    reply.reply.clone(),
                    to_db_timestamp(reply.replied_at),
                    feedback_id,
                ],
            )
            .await?;

        if updated > 0 {
            debug!("Reply recorded for feedback {}", feedback_id);
            return Ok(ReplyOutcome::Applied);
        }

        let mut rows = conn
            .query("SELECT COUNT(*) FROM feedback WHERE id = ?", params![feedback_id])
            .await?;
        let exists = match rows.next().await? {
            Some(row) => row.get::<i64>(0)? > 0,
            None => false,
        };

        Ok(if exists {
            ReplyOutcome::AlreadyReplied
        } else {
            ReplyOutcome::NotFound
        })
    }

    async fn check_health(&self) -> Result<()> {
        let conn = self.get_conn().await.map_err(|e| {
            PortalError::Database(format!("Health check failed: cannot establish connection: {}", e))
        })?;

        conn.query("SELECT 1", params![])
            .await
            .map_err(|e| PortalError::Database(format!("Health check failed: {}", e)))?;

        Ok(())
    }
}
