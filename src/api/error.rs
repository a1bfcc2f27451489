//! HTTP mapping for `PortalError`

use crate::error::PortalError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl PortalError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PortalError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PortalError::InvalidCredentials | PortalError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::AlreadyReplied(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request rejected ({}): {}", status, self);
        }

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for PortalError {
    fn from(rejection: JsonRejection) -> Self {
        PortalError::InvalidInput(rejection.body_text())
    }
}

pub type ApiResult<T> = std::result::Result<T, PortalError>;
