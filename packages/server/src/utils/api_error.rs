use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use werewolf_rules::GameError;

/// Maps engine errors onto HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub GameError);

impl From<GameError> for ApiError {
    fn from(e: GameError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            GameError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::Permission(_) => StatusCode::FORBIDDEN,
            GameError::State(_) | GameError::ConcurrencyConflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() || self.0.is_retryable() {
            log::warn!("{}", self.0);
        } else {
            log::debug!("{}", self.0);
        }
        let body = json!({
            "success": false,
            "kind": self.0.kind(),
            "error": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
