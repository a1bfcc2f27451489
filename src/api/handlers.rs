//! Request handlers for the REST surface

use super::error::ApiResult;
use super::session::Session;
use super::state::AppState;
use crate::services::{
    FacultyFeedbackFilter, FacultyStatistics, FeedbackStatistics, FeedbackSubmission,
    LoginRequest, LoginResponse, ReplyRequest, EXPORT_FILENAME,
};
use crate::services::aggregation::{DEFAULT_RECENT_LIMIT, DEFAULT_WINDOW_DAYS};
use crate::types::{FacultySummary, FeedbackDetail, TimeWindow, UserSummary};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Raw `days`/`limit` query values; unparseable values fall back to defaults
#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    pub days: Option<String>,
    pub limit: Option<String>,
}

impl WindowParams {
    pub fn days(&self) -> u32 {
        parse_or(self.days.as_deref(), DEFAULT_WINDOW_DAYS)
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::TrailingDays(self.days())
    }

    pub fn limit(&self) -> usize {
        parse_or(self.limit.as_deref(), DEFAULT_RECENT_LIMIT)
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[derive(Debug, Default, Deserialize)]
pub struct FacultyFilterParams {
    pub search: Option<String>,
    pub sentiment: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub db: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = match state.storage.check_health().await {
        Ok(()) => true,
        Err(e) => {
            debug!("Storage health check failed: {}", e);
            false
        }
    };
    Json(HealthResponse { ok: true, db })
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = payload?;
    Ok(Json(state.auth.login(&request).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: UserSummary,
    pub expires_at: DateTime<Utc>,
}

pub async fn session(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<SessionResponse>> {
    let user = state.auth.resolve_user(&session.claims).await?;
    Ok(Json(SessionResponse {
        user,
        expires_at: session.claims.expires_at(),
    }))
}

pub async fn list_faculty(State(state): State<AppState>) -> ApiResult<Json<Vec<FacultySummary>>> {
    let faculty = state.storage.list_faculty().await?;
    Ok(Json(faculty.iter().map(|f| f.summary()).collect()))
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

pub async fn student_count(State(state): State<AppState>) -> ApiResult<Json<CountResponse>> {
    Ok(Json(CountResponse {
        count: state.storage.count_students().await?,
    }))
}

pub async fn student_feedback(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> ApiResult<Json<Vec<FeedbackDetail>>> {
    Ok(Json(state.aggregation.for_student(&student_id).await?))
}

/// Feedback for one faculty member, with the submitting student's profile
pub async fn faculty_feedback(
    State(state): State<AppState>,
    Path(faculty_id): Path<String>,
) -> ApiResult<Json<Vec<FeedbackDetail>>> {
    Ok(Json(state.aggregation.for_faculty(&faculty_id).await?))
}

#[derive(Debug, Serialize)]
pub struct FacultySummaryResponse {
    pub success: bool,
    pub statistics: FacultyStatistics,
    pub count: usize,
    pub data: Vec<FeedbackDetail>,
}

pub async fn faculty_summary(
    State(state): State<AppState>,
    Path(faculty_id): Path<String>,
    Query(params): Query<FacultyFilterParams>,
) -> ApiResult<Json<FacultySummaryResponse>> {
    let filter = FacultyFeedbackFilter::parse(
        params.search.as_deref(),
        params.sentiment.as_deref(),
        params.period.as_deref(),
    )?;
    let report = state.aggregation.faculty_report(&faculty_id, &filter).await?;

    Ok(Json(FacultySummaryResponse {
        success: true,
        statistics: report.statistics,
        count: report.feedback.len(),
        data: report.feedback,
    }))
}

#[derive(Debug, Serialize)]
pub struct WindowCountResponse {
    pub success: bool,
    pub count: usize,
}

pub async fn feedback_count(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> ApiResult<Json<WindowCountResponse>> {
    Ok(Json(WindowCountResponse {
        success: true,
        count: state.aggregation.count(params.window()).await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<FeedbackDetail>,
}

pub async fn recent_feedback(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> ApiResult<Json<ListingResponse>> {
    let data = state
        .aggregation
        .recent(params.window(), params.limit())
        .await?;
    Ok(Json(ListingResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub period: String,
    pub statistics: FeedbackStatistics,
}

pub async fn feedback_stats(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> ApiResult<Json<StatsResponse>> {
    let days = params.days();
    let statistics = state.aggregation.statistics(params.window()).await?;
    Ok(Json(StatsResponse {
        success: true,
        period: format!("Last {} days", days),
        statistics,
    }))
}

#[derive(Debug, Serialize)]
pub struct TodayResponse {
    pub success: bool,
    pub date: NaiveDate,
    pub count: usize,
    pub data: Vec<FeedbackDetail>,
}

pub async fn todays_feedback(State(state): State<AppState>) -> ApiResult<Json<TodayResponse>> {
    let today = state.aggregation.today().await?;
    Ok(Json(TodayResponse {
        success: true,
        date: today.date,
        count: today.feedback.len(),
        data: today.feedback,
    }))
}

#[derive(Debug, Serialize)]
pub struct FeedbackMutationResponse {
    pub ok: bool,
    pub feedback: FeedbackDetail,
    pub message: String,
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackSubmission>, JsonRejection>,
) -> ApiResult<Json<FeedbackMutationResponse>> {
    let Json(submission) = payload?;
    let feedback = state.submissions.submit(submission).await?;
    Ok(Json(FeedbackMutationResponse {
        ok: true,
        feedback,
        message: "Feedback submitted successfully!".to_string(),
    }))
}

pub async fn reply_to_feedback(
    State(state): State<AppState>,
    Path(feedback_id): Path<String>,
    payload: Result<Json<ReplyRequest>, JsonRejection>,
) -> ApiResult<Json<FeedbackMutationResponse>> {
    let Json(request) = payload?;
    let feedback = state
        .replies
        .reply(&feedback_id, request.reply.as_deref())
        .await?;
    Ok(Json(FeedbackMutationResponse {
        ok: true,
        feedback,
        message: "Reply sent successfully!".to_string(),
    }))
}

pub async fn export_feedback(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let body = state.export.export_all().await?;
    let disposition = format!("attachment; filename={}", EXPORT_FILENAME);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
