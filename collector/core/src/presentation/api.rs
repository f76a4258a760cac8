// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::domain::source::IngestError;
use crate::domain::trace::{wire_timestamp, AgentId, LogLevel, TraceRecord};
use crate::infrastructure::trace_store::TraceStore;

pub struct AppState {
    pub store: TraceStore,
}

pub fn app(store: TraceStore) -> Router {
    let state = Arc::new(AppState { store });

    Router::new()
        .route("/health", get(health))
        .route("/agents", get(list_agents))
        .route("/logs", get(all_logs))
        .route(
            "/agents/{agent_id}/logs",
            get(agent_logs).post(append_log).delete(clear_logs),
        )
        .with_state(state)
}

/// Body accepted by `POST /agents/{agent_id}/logs`. The path names the agent;
/// a missing timestamp means "now" and a missing level means `INFO`.
#[derive(Debug, Deserialize)]
pub struct AppendLogRequest {
    #[serde(default)]
    pub level: Option<String>,
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = if state.store.is_disposed() { "disposed" } else { "ok" };
    Json(json!({
        "status": status,
        "agents": state.store.get_registered_agents().len(),
        "records": state.store.record_count(),
    }))
}

async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Vec<AgentId>> {
    Json(state.store.get_registered_agents())
}

async fn all_logs(State(state): State<Arc<AppState>>) -> Json<Vec<TraceRecord>> {
    Json(state.store.get_all_logs())
}

async fn agent_logs(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Json<Vec<TraceRecord>> {
    Json(state.store.get_agent_logs(&agent_id))
}

async fn append_log(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Json(payload): Json<AppendLogRequest>,
) -> Response {
    let record = match build_record(&agent_id, payload) {
        Ok(record) => record,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    match state.store.emit(&agent_id, record) {
        Ok(()) => {
            debug!(agent_id = %agent_id, "Appended record over HTTP");
            (StatusCode::CREATED, Json(json!({ "agent_id": agent_id }))).into_response()
        }
        Err(e @ IngestError::StoreDisposed) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn clear_logs(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> StatusCode {
    state.store.clear_agent_logs(&agent_id);
    StatusCode::NO_CONTENT
}

fn build_record(agent_id: &str, payload: AppendLogRequest) -> Result<TraceRecord, String> {
    let agent_id = AgentId::new(agent_id).map_err(|e| e.to_string())?;
    let level = match payload.level.as_deref() {
        None | Some("") => LogLevel::Info,
        Some(raw) => raw.parse::<LogLevel>().map_err(|e| e.to_string())?,
    };
    let timestamp = match payload.timestamp.as_deref() {
        None => chrono::Utc::now(),
        Some(raw) => wire_timestamp::parse(raw)?,
    };
    Ok(TraceRecord::new(agent_id, timestamp, level, payload.message))
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn send(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_post_then_get_agent_logs() {
        let store = TraceStore::new();
        let router = app(store.clone());

        let (status, _) = send(
            router.clone(),
            Method::POST,
            "/agents/architect/logs",
            Some(json!({
                "level": "ERROR",
                "message": "System too complex - timeout",
                "timestamp": "2024-05-01T12:00:00.123456"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(router, Method::GET, "/agents/architect/logs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["agent_id"], "architect");
        assert_eq!(body[0]["level"], "ERROR");
        assert_eq!(body[0]["timestamp"], "2024-05-01T12:00:00.123456Z");
        assert_eq!(store.record_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_agent_is_empty() {
        let router = app(TraceStore::new());
        let (status, body) = send(router, Method::GET, "/agents/ghost/logs", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_discovery_and_clear() {
        let store = TraceStore::new();
        store.register("product_manager").unwrap();
        store
            .emit(
                "architect",
                TraceRecord::now(AgentId::new("architect").unwrap(), LogLevel::Info, "design"),
            )
            .unwrap();
        let router = app(store.clone());

        let (_, agents) = send(router.clone(), Method::GET, "/agents", None).await;
        assert_eq!(agents, json!(["product_manager", "architect"]));

        let (status, _) = send(router.clone(), Method::DELETE, "/agents/architect/logs", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, logs) = send(router, Method::GET, "/logs", None).await;
        assert_eq!(logs, json!([]));
    }

    #[tokio::test]
    async fn test_bad_level_is_rejected() {
        let router = app(TraceStore::new());
        let (status, body) = send(
            router,
            Method::POST,
            "/agents/engineer/logs",
            Some(json!({ "level": "LOUD", "message": "hi" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("loud"));
    }

    #[tokio::test]
    async fn test_disposed_store_refuses_writes() {
        let store = TraceStore::new();
        store.dispose();
        let router = app(store);

        let (status, _) = send(
            router.clone(),
            Method::POST,
            "/agents/engineer/logs",
            Some(json!({ "message": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (_, health) = send(router, Method::GET, "/health", None).await;
        assert_eq!(health["status"], "disposed");
    }
}
