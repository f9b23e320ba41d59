//! axum adapter over [`Control`].

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::wire::{ErrorReply, HealthReply, StartReply, StopReply};
use super::Control;
use crate::error::ControlError;

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = match self {
            ControlError::UnknownService { .. } | ControlError::NotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            ControlError::Draining => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorReply {
            error: self.as_label().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Builds the control router.
pub fn router(control: Control) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/services", get(list_services))
        .route(
            "/services/{name}",
            post(start_service).delete(stop_service),
        )
        .with_state(control)
}

/// Serves the control router on `listener` until `stop` is cancelled.
pub async fn serve(
    listener: TcpListener,
    control: Control,
    stop: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(control))
        .with_graceful_shutdown(stop.cancelled_owned())
        .await
}

async fn health(State(control): State<Control>) -> Json<HealthReply> {
    Json(HealthReply {
        status: "healthy",
        phase: control.phase(),
    })
}

async fn list_services(State(control): State<Control>) -> impl IntoResponse {
    Json(control.list_services().await)
}

async fn start_service(
    State(control): State<Control>,
    Path(name): Path<String>,
) -> Result<Json<StartReply>, ControlError> {
    let token = control.start_service(&name).await?;
    Ok(Json(StartReply {
        status: "ok",
        token,
    }))
}

async fn stop_service(
    State(control): State<Control>,
    Path(name): Path<String>,
) -> Result<Json<StopReply>, ControlError> {
    let stopped = control.stop_service(&name).await?;
    Ok(Json(StopReply {
        status: "ok".to_string(),
        stopped,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::core::{LifecycleCoordinator, ServiceRegistry, SupervisionTree};
    use crate::error::ServiceError;
    use crate::events::Bus;
    use crate::services::{RunnableRef, ServiceContext, ServiceFn};

    fn idle(_ctx: &ServiceContext) -> RunnableRef {
        ServiceFn::arc("idle", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Ok::<_, ServiceError>(())
        })
    }

    fn control() -> (Control, Arc<LifecycleCoordinator>) {
        let mut reg = ServiceRegistry::new();
        reg.register("alpha", idle).unwrap();
        reg.register("beta", idle).unwrap();
        let bus = Bus::new(64);
        let root = CancellationToken::new();
        let tree = Arc::new(SupervisionTree::new(
            Arc::new(reg),
            Arc::new(Config::default()),
            bus.clone(),
            root.clone(),
        ));
        let lc = Arc::new(LifecycleCoordinator::new(
            tree.clone(),
            root,
            bus,
            Duration::from_secs(1),
        ));
        (Control::new(tree, lc.clone()), lc)
    }

    async fn call(control: &Control, method: Method, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let resp = router(control.clone()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn start_list_stop_over_http() {
        let (control, _lc) = control();

        let (status, body) = call(&control, Method::POST, "/services/alpha").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["token"], 1);

        call(&control, Method::POST, "/services/beta").await;
        let (status, body) = call(&control, Method::GET, "/services").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!([
                { "name": "alpha", "token": 1, "state": "running" },
                { "name": "beta", "token": 2, "state": "running" },
            ])
        );

        let (status, body) = call(&control, Method::DELETE, "/services/alpha").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stopped"], 1);

        let (_, body) = call(&control, Method::GET, "/services").await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "beta");
    }

    #[tokio::test]
    async fn errors_map_to_status_codes() {
        let (control, lc) = control();

        let (status, body) = call(&control, Method::POST, "/services/gamma").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown_service");

        let (status, body) = call(&control, Method::DELETE, "/services/alpha").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        lc.shutdown().await.unwrap();
        let (status, body) = call(&control, Method::POST, "/services/alpha").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "draining");
    }

    #[tokio::test]
    async fn health_reports_phase() {
        let (control, lc) = control();
        let (status, body) = call(&control, Method::GET, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "status": "healthy", "phase": "running" }));

        lc.shutdown().await.unwrap();
        let (_, body) = call(&control, Method::GET, "/health").await;
        assert_eq!(body["phase"], "terminated");
    }
}
