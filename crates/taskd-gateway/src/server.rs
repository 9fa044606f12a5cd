//! HTTP server: router assembly, static assets, graceful shutdown.

use axum::Router;
use axum::routing::{get, post};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use taskd_core::config::GatewayConfig;
use taskd_core::error::{Result, TaskdError};
use taskd_scheduler::SchedulerEngine;

use super::routes;

/// Shared state handed to every handler.
pub struct AppState {
    pub engine: Arc<SchedulerEngine>,
    pub config: GatewayConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<SchedulerEngine>, config: GatewayConfig) -> Self {
        Self {
            engine,
            config,
            start_time: Instant::now(),
        }
    }
}

pub struct GatewayServer;

impl GatewayServer {
    /// Build the full router: API routes, then static files for everything else.
    pub fn router(state: Arc<AppState>) -> Router {
        let web_dir = Path::new(&state.config.web_dir);
        let index = web_dir.join("index.html");
        let assets = ServeDir::new(web_dir).fallback(ServeFile::new(index));

        let api = Router::new()
            .route(
                "/api/schedule",
                post(routes::schedule_task).fallback(routes::method_not_allowed),
            )
            .route(
                "/api/cancel",
                post(routes::cancel_task).fallback(routes::method_not_allowed),
            )
            .route(
                "/api/tasks",
                get(routes::list_tasks).fallback(routes::method_not_allowed),
            )
            .route("/api/tasks/{id}", get(routes::get_task))
            .route(
                "/api/health",
                get(routes::health_check).fallback(routes::method_not_allowed),
            )
            .route("/api/info", get(routes::system_info));

        let mut app = api
            .fallback_service(assets)
            .layer(TraceLayer::new_for_http())
            .with_state(state.clone());

        if state.config.cors {
            app = app.layer(CorsLayer::permissive());
        }
        app
    }

    /// Serve until Ctrl-C, then cancel outstanding tasks.
    pub async fn start(state: Arc<AppState>) -> Result<()> {
        Self::serve(state, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {e}");
            }
        })
        .await
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve<F>(state: Arc<AppState>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = state.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TaskdError::gateway(format!("bind {addr}: {e}")))?;
        tracing::info!("🚀 Task scheduler listening on http://{addr}");

        let app = Self::router(state.clone());
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| TaskdError::gateway(e.to_string()))?;

        let cancelled = state.engine.shutdown();
        tracing::info!("👋 Gateway stopped ({cancelled} task(s) cancelled)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use taskd_core::config::SchedulerConfig;
    use tower::ServiceExt;

    fn state_with_web_dir(web_dir: &str) -> Arc<AppState> {
        let engine = SchedulerEngine::new(SchedulerConfig::default());
        let config = GatewayConfig {
            web_dir: web_dir.into(),
            ..GatewayConfig::default()
        };
        Arc::new(AppState::new(Arc::new(engine), config))
    }

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_schedule_list_cancel_over_http() {
        let app = GatewayServer::router(state_with_web_dir("web"));

        let resp = app
            .clone()
            .oneshot(form_post("/api/schedule", "name=Nightly%20report&delay=60&type=report"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["taskId"], "task-1");
        assert_eq!(json["delay"], 60);

        let resp = app
            .clone()
            .oneshot(Request::get("/api/tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["tasks"][0]["name"], "Nightly report");
        assert_eq!(json["tasks"][0]["type"], "report");
        assert_eq!(json["tasks"][0]["status"], "SCHEDULED");

        let resp = app
            .clone()
            .oneshot(form_post("/api/cancel", "taskId=task-1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .clone()
            .oneshot(form_post("/api/cancel", "taskId=task-1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .oneshot(Request::get("/api/tasks/task-1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["status"], "CANCELLED");
        assert!(json["completedAt"].is_string());
    }

    #[tokio::test]
    async fn test_negative_delay_is_bad_request() {
        let state = state_with_web_dir("web");
        let app = GatewayServer::router(state.clone());
        let resp = app
            .oneshot(form_post("/api/schedule", "delay=-1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(state.engine.list().is_empty());
    }

    #[tokio::test]
    async fn test_non_form_body_gets_json_error() {
        let state = state_with_web_dir("web");
        let app = GatewayServer::router(state.clone());

        let requests = [
            Request::post("/api/schedule")
                .body(Body::from("name=A&delay=1"))
                .unwrap(),
            Request::post("/api/cancel")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"taskId":"task-1"}"#))
                .unwrap(),
        ];
        for request in requests {
            let resp = app.clone().oneshot(request).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let json = body_json(resp).await;
            assert!(json["error"].is_string());
        }
        assert!(state.engine.list().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_method() {
        let app = GatewayServer::router(state_with_web_dir("web"));
        let resp = app
            .oneshot(Request::get("/api/schedule").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_health_and_cors() {
        let app = GatewayServer::router(state_with_web_dir("web"));
        let resp = app
            .oneshot(
                Request::get("/api/health")
                    .header(header::ORIGIN, "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
        assert_eq!(body_json(resp).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_static_files_fall_back_to_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>tasks</h1>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log('hi');").unwrap();

        let app = GatewayServer::router(state_with_web_dir(&dir.path().to_string_lossy()));

        let resp = app
            .clone()
            .oneshot(Request::get("/app.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.contains("javascript"));

        for uri in ["/", "/missing/page"] {
            let resp = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
                .await
                .unwrap();
            assert_eq!(&bytes[..], b"<h1>tasks</h1>");
        }
    }

    #[tokio::test]
    async fn test_serve_shuts_down_and_cancels() {
        let engine = Arc::new(SchedulerEngine::new(SchedulerConfig::default()));
        let config = GatewayConfig {
            host: "127.0.0.1".into(),
            port: 0,
            ..GatewayConfig::default()
        };
        let state = Arc::new(AppState::new(engine.clone(), config));
        let id = engine
            .submit(taskd_scheduler::SubmitRequest {
                delay_secs: 600,
                ..Default::default()
            })
            .unwrap()
            .task_id;

        GatewayServer::serve(state, async {}).await.unwrap();
        assert_eq!(
            engine.get(&id).unwrap().status,
            taskd_scheduler::TaskStatus::Cancelled
        );
    }
}
