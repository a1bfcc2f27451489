//! HTTP API server

use super::{handlers, state::AppState};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
    /// Base URL the dashboards are pointed at, for the startup log
    pub public_url: Option<String>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([0, 0, 0, 0], 4000).into(),
            public_url: None,
        }
    }
}

/// Build the router for every portal endpoint
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        // Accounts
        .route("/api/login", post(handlers::login))
        .route("/api/session", get(handlers::session))
        .route("/api/faculty", get(handlers::list_faculty))
        .route("/api/students/count", get(handlers::student_count))
        .route("/api/students/:id/feedback", get(handlers::student_feedback))
        // Faculty dashboard
        .route("/api/faculty/:id/feedback", get(handlers::faculty_feedback))
        .route("/api/faculty/:id/summary", get(handlers::faculty_summary))
        // Feedback
        .route("/api/feedback", post(handlers::submit_feedback))
        .route("/api/feedback/count", get(handlers::feedback_count))
        .route("/api/feedback/recent", get(handlers::recent_feedback))
        .route("/api/feedback/stats", get(handlers::feedback_stats))
        .route("/api/feedback/today", get(handlers::todays_feedback))
        .route("/api/feedback/:id", get(handlers::faculty_feedback))
        .route("/api/feedback/:id/reply", post(handlers::reply_to_feedback))
        .route("/api/export/feedback", get(handlers::export_feedback))
        // State
        .with_state(state)
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Bind the configured address and serve until the process exits
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;

        info!("API server listening on http://{}", listener.local_addr()?);
        if let Some(url) = &self.config.public_url {
            info!("Dashboards should target {}", url);
        }

        axum::serve(listener, router).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::create_test_storage;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_dir, storage) = create_test_storage().await;
        let router = build_router(AppState::new(storage, b"test-secret"));

        let response = router
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (_dir, storage) = create_test_storage().await;
        let server = ApiServer::new(ApiServerConfig::default(), AppState::new(storage, b"s"));

        let response = server
            .router()
            .oneshot(Request::get("/api/nothing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
