// ConductorError -> HTTP status + JSON body

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::ConductorError;

impl ConductorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConductorError::Validation(_) | ConductorError::Conflict { .. } => {
                StatusCode::BAD_REQUEST
            }
            ConductorError::NotFound(_) => StatusCode::NOT_FOUND,
            ConductorError::Gateway(_) | ConductorError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ConductorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
