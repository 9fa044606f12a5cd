//! Mapping from engine errors to HTTP responses.

use axum::Json;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use taskd_core::error::TaskdError;

/// A [`TaskdError`] on its way out as JSON.
#[derive(Debug)]
pub struct ApiError(pub TaskdError);

impl From<TaskdError> for ApiError {
    fn from(err: TaskdError) -> Self {
        Self(err)
    }
}

/// Unreadable form bodies are client errors like any other bad input.
impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        tracing::warn!("Rejected form body: {rejection}");
        Self(TaskdError::invalid_input(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            TaskdError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TaskdError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            TaskdError::NotFound(_) => "Task not found or already completed".to_string(),
            TaskdError::InvalidInput(msg) => msg.clone(),
            other => {
                tracing::error!("Request failed: {other}");
                other.to_string()
            }
        };

        let mut body = serde_json::json!({ "error": message });
        if let Some(task_id) = self.0.task_id() {
            body["taskId"] = serde_json::Value::from(task_id);
        }
        (status, Json(body)).into_response()
    }
}
