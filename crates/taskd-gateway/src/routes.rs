//! API route handlers for the gateway.

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Form, Json};
use serde::Deserialize;
use std::sync::Arc;

use taskd_core::error::TaskdError;
use taskd_scheduler::{SubmitRequest, parse_delay};

use super::error::ApiError;
use super::server::AppState;

/// Form body of `POST /api/schedule`.
#[derive(Debug, Default, Deserialize)]
pub struct ScheduleForm {
    pub name: Option<String>,
    pub delay: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
}

/// Form body of `POST /api/cancel`.
#[derive(Debug, Default, Deserialize)]
pub struct CancelForm {
    #[serde(rename = "taskId")]
    pub task_id: Option<String>,
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let status = if state.engine.health_check() { "healthy" } else { "unhealthy" };
    Json(serde_json::json!({ "status": status }))
}

/// Service information endpoint.
pub async fn system_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime = state.start_time.elapsed();
    Json(serde_json::json!({
        "name": "taskd",
        "version": env!("CARGO_PKG_VERSION"),
        "platform": format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        "uptimeSecs": uptime.as_secs(),
        "tasks": state.engine.stats(),
    }))
}

/// Submit a task.
pub async fn schedule_task(
    State(state): State<Arc<AppState>>,
    form: Result<Form<ScheduleForm>, FormRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Form(form) = form?;
    let default_delay = state.engine.config().default_delay_secs;
    let delay_secs = parse_delay(form.delay.as_deref(), default_delay).inspect_err(|e| {
        tracing::warn!("Rejected schedule request: {e}");
    })?;

    let submission = state.engine.submit(SubmitRequest {
        name: form.name,
        delay_secs,
        task_type: form.task_type,
    })?;

    Ok(Json(serde_json::json!({
        "taskId": submission.task_id,
        "status": "scheduled",
        "delay": submission.delay_secs,
    })))
}

/// Cancel a task by id.
pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    form: Result<Form<CancelForm>, FormRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Form(form) = form?;
    let task_id = form
        .task_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| TaskdError::invalid_input("missing taskId"))?;

    let record = state.engine.cancel(&task_id)?;
    Ok(Json(serde_json::json!({
        "status": "cancelled",
        "taskId": record.id,
    })))
}

/// List every task in submission order.
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "tasks": state.engine.list() }))
}

/// Look up one task.
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = state.engine.get(&task_id)?;
    Ok(Json(serde_json::json!(record)))
}

/// Any method other than the one a route serves.
pub async fn method_not_allowed() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({ "error": "Method not allowed" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskd_core::config::{GatewayConfig, SchedulerConfig};
    use taskd_scheduler::{SchedulerEngine, TaskStatus};

    fn test_state() -> Arc<AppState> {
        let engine = SchedulerEngine::new(SchedulerConfig::default());
        Arc::new(AppState::new(Arc::new(engine), GatewayConfig::default()))
    }

    fn form(name: &str, delay: &str) -> Result<Form<ScheduleForm>, FormRejection> {
        Ok(Form(ScheduleForm {
            name: Some(name.into()),
            delay: Some(delay.into()),
            task_type: None,
        }))
    }

    fn cancel_form(task_id: Option<&str>) -> Result<Form<CancelForm>, FormRejection> {
        Ok(Form(CancelForm {
            task_id: task_id.map(String::from),
        }))
    }

    #[tokio::test]
    async fn test_health_check() {
        let json = health_check(State(test_state())).await.0;
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_system_info() {
        let state = test_state();
        schedule_task(State(state.clone()), form("A", "30")).await.unwrap();

        let json = system_info(State(state)).await.0;
        assert_eq!(json["name"], "taskd");
        assert!(json["version"].is_string());
        assert_eq!(json["tasks"]["total"], 1);
        assert_eq!(json["tasks"]["scheduled"], 1);
        assert_eq!(json["tasks"]["liveTimers"], 1);
        assert_eq!(json["tasks"]["freeSlots"], 10);
    }

    #[tokio::test]
    async fn test_schedule_and_list() {
        let state = test_state();
        let json = schedule_task(State(state.clone()), form("Backup", "30"))
            .await
            .unwrap()
            .0;
        assert_eq!(json["taskId"], "task-1");
        assert_eq!(json["status"], "scheduled");
        assert_eq!(json["delay"], 30);

        let list = list_tasks(State(state)).await.0;
        let tasks = list["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["name"], "Backup");
        assert_eq!(tasks[0]["type"], "simple");
        assert_eq!(tasks[0]["status"], "SCHEDULED");
    }

    #[tokio::test]
    async fn test_schedule_uses_default_delay() {
        let state = test_state();
        let json = schedule_task(State(state), Ok(Form(ScheduleForm::default())))
            .await
            .unwrap()
            .0;
        assert_eq!(json["delay"], 5);
    }

    #[tokio::test]
    async fn test_schedule_rejects_bad_delay() {
        let state = test_state();
        for delay in ["-1", "abc", "2.5"] {
            let err = schedule_task(State(state.clone()), form("bad", delay))
                .await
                .unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "delay={delay}");
        }
        assert!(state.engine.list().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_flow() {
        let state = test_state();
        schedule_task(State(state.clone()), form("A", "30")).await.unwrap();

        let json = cancel_task(State(state.clone()), cancel_form(Some("task-1")))
            .await
            .unwrap()
            .0;
        assert_eq!(json["status"], "cancelled");
        assert_eq!(json["taskId"], "task-1");
        assert_eq!(state.engine.get("task-1").unwrap().status, TaskStatus::Cancelled);

        let err = cancel_task(State(state), cancel_form(Some("task-1")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_requires_id() {
        let err = cancel_task(State(test_state()), cancel_form(None))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_task() {
        let state = test_state();
        schedule_task(State(state.clone()), form("A", "30")).await.unwrap();

        let json = get_task(State(state.clone()), Path("task-1".into()))
            .await
            .unwrap()
            .0;
        assert_eq!(json["id"], "task-1");

        let err = get_task(State(state), Path("task-2".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
