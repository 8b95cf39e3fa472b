//! HTTP submission endpoint for background tasks.
//!
//! This module defines [`TaskService`], which owns the worker pool and
//! exposes the `POST /queue-task` route. The endpoint decodes a small JSON
//! payload, hands the task to the pool without blocking, and maps the pool's
//! backpressure signal to `503 Service Unavailable` with a `Retry-After`
//! hint so callers know to slow down.
//!
//! ## Responsibilities
//!
//! - Construct and manage the background worker pool.
//! - Validate incoming submission payloads.
//! - Map engine errors to HTTP status codes.
//! - Drive graceful shutdown of the pool.

use crate::server::{
    config::ServerConfig,
    telemetry::{increment_requests, increment_tasks_queued, increment_tasks_rejected},
};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stoker::{CancellationToken, Error, PoolConfig, WorkerPool};
use tower_http::trace::TraceLayer;

/// How long a rejected caller should wait before retrying, in seconds.
const RETRY_AFTER_SECS: &str = "60";

/// HTTP facade over the background worker pool.
///
/// Cloning is cheap; all clones share one pool.
#[derive(Clone)]
pub struct TaskService {
    pool: Arc<WorkerPool>,
}

impl TaskService {
    /// Creates the service and its worker pool. Workers do not run until
    /// [`start`](TaskService::start).
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            pool: Arc::new(WorkerPool::new(PoolConfig {
                worker_count: config.worker_count,
                queue_capacity: config.queue_capacity,
            })),
        }
    }

    /// Starts the worker pool under the given cancellation scope.
    pub fn start(&self, parent: &CancellationToken) {
        self.pool.start(parent);
    }

    /// Gracefully shuts the worker pool down, blocking until every worker
    /// has exited. Called once after request intake has stopped.
    pub async fn shutdown(&self) {
        self.pool.stop().await;
    }

    /// Builds the router serving the submission endpoint.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/queue-task", post(queue_task))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct QueueTaskRequest {
    pub task_id: String,
    pub work_duration_ms: u64,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Handles `POST /queue-task`.
///
/// Malformed input is the caller's own error (`400`); a full queue is the
/// expected backpressure path (`503` + `Retry-After`); a submission racing
/// shutdown observes `503` without the retry hint.
async fn queue_task(
    State(service): State<TaskService>,
    payload: Result<Json<QueueTaskRequest>, JsonRejection>,
) -> Response {
    increment_requests();

    let Json(input) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::info!("failed to read POST body: {rejection}");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: "failed to read POST body".into(),
                }),
            )
                .into_response();
        }
    };

    match service
        .pool
        .submit(input.task_id, Duration::from_millis(input.work_duration_ms))
    {
        Ok(()) => {
            increment_tasks_queued();
            (
                StatusCode::ACCEPTED,
                Json(StatusBody {
                    status: "task queued successfully",
                }),
            )
                .into_response()
        }
        Err(err @ Error::Busy) => {
            increment_tasks_rejected();
            tracing::info!("failed to queue task: {err}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, RETRY_AFTER_SECS)],
                Json(ErrorBody {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
        Err(err) => {
            tracing::info!("failed to queue task: {err}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, header::CONTENT_TYPE},
    };
    use tower::ServiceExt;

    fn service(worker_count: usize, queue_capacity: usize) -> TaskService {
        TaskService::new(&ServerConfig {
            http_addr: "127.0.0.1:0".parse().unwrap(),
            worker_count,
            queue_capacity,
            grace_period: Duration::from_secs(1),
        })
    }

    fn queue_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/queue-task")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn accepted_submission_returns_202() {
        let service = service(1, 4);
        service.start(&CancellationToken::new());

        let response = service
            .router()
            .oneshot(queue_request(r#"{"task_id":"t1","work_duration_ms":0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        service.shutdown().await;
    }

    #[tokio::test]
    async fn full_queue_returns_503_with_retry_after() {
        // The pool is intentionally not started, so nothing drains the
        // queue and the capacity check is deterministic.
        let service = service(1, 1);
        let app = service.router();

        let first = app
            .clone()
            .oneshot(queue_request(r#"{"task_id":"t1","work_duration_ms":5000}"#))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);

        let second = app
            .oneshot(queue_request(r#"{"task_id":"t2","work_duration_ms":5000}"#))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(second.headers().get(header::RETRY_AFTER).unwrap(), "60");
    }

    #[tokio::test]
    async fn malformed_body_returns_400() {
        let service = service(1, 1);
        let response = service
            .router()
            .oneshot(queue_request("{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn submission_during_shutdown_returns_503_without_retry_hint() {
        let service = service(1, 2);
        service.start(&CancellationToken::new());
        service.shutdown().await;

        let response = service
            .router()
            .oneshot(queue_request(r#"{"task_id":"t","work_duration_ms":0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }
}
