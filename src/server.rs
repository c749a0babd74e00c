//! JSON HTTP API for the suggestion review surface.
//!
//! Exposes the pending-suggestion listing plus the accept/reject lifecycle
//! endpoints the web client drives. Handlers talk to the [`Store`] trait,
//! never to SQL directly, so the same router serves the in-memory store in
//! tests.
//!
//! # Endpoints
//!
//! | Method   | Path | Description |
//! |----------|------|-------------|
//! | `GET`    | `/api/goals/{user_id}/ai-suggestions` | Pending suggestions, all three kinds |
//! | `POST`   | `/api/ai-goals/{id}/accept` | Promote a suggested goal to active |
//! | `DELETE` | `/api/ai-goals/{id}` | Reject (delete) a suggested goal |
//! | `POST`   | `/api/ai-tasks/{id}/accept` | Promote a suggested task |
//! | `DELETE` | `/api/ai-tasks/{id}` | Reject a suggested task |
//! | `POST`   | `/api/ai-habits/{id}/accept` | Promote a suggested habit |
//! | `DELETE` | `/api/ai-habits/{id}` | Reject a suggested habit |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! # Authentication
//!
//! The caller identifies itself with an `x-user-id` header (a session layer
//! in front of this service sets it). A missing header is `401`; a header
//! that does not own the addressed resource is `403`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no suggested goal with id g1" } }
//! ```
//!
//! Error codes: `unauthorized` (401), `forbidden` (403), `not_found` (404),
//! `internal` (500). Accept returns `200` with the updated record; reject
//! returns `204` with no body. Both are idempotence-hostile on purpose: a
//! second accept or reject of the same id is `404`, so double-submits
//! surface instead of silently succeeding.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted for the browser client.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::models::{Goal, Habit, Task, STATUS_SUGGESTED};
use crate::store::Store;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn Store>,
}

/// Builds the router. Split out from [`run_server`] so tests can drive it
/// in-process with `tower::ServiceExt::oneshot`.
pub fn build_router(store: Arc<dyn Store>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/goals/{user_id}/ai-suggestions",
            get(handle_list_suggestions),
        )
        .route("/api/ai-goals/{id}/accept", post(handle_accept_goal))
        .route("/api/ai-goals/{id}", delete(handle_reject_goal))
        .route("/api/ai-tasks/{id}/accept", post(handle_accept_task))
        .route("/api/ai-tasks/{id}", delete(handle_reject_task))
        .route("/api/ai-habits/{id}/accept", post(handle_accept_habit))
        .route("/api/ai-habits/{id}", delete(handle_reject_habit))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { store })
}

/// Starts the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config, store: Arc<dyn Store>) -> anyhow::Result<()> {
    let app = build_router(store);

    info!(bind = %config.server.bind, "api server listening");
    println!("API server listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn unauthorized() -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: "missing x-user-id header".to_string(),
    }
}

fn forbidden() -> AppError {
    AppError {
        status: StatusCode::FORBIDDEN,
        code: "forbidden".to_string(),
        message: "resource belongs to another user".to_string(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
    }
}

/// Extracts the authenticated user id from the `x-user-id` header.
fn require_user(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .ok_or_else(unauthorized)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/goals/{user_id}/ai-suggestions ============

/// JSON response body for the pending-suggestion listing.
#[derive(Serialize)]
struct SuggestionsResponse {
    goals: Vec<Goal>,
    tasks: Vec<Task>,
    habits: Vec<Habit>,
}

/// Lists every pending suggestion for a user, all three kinds in one
/// payload, so the review surface renders with a single round trip.
async fn handle_list_suggestions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SuggestionsResponse>, AppError> {
    let caller = require_user(&headers)?;
    if caller != user_id {
        return Err(forbidden());
    }

    let goals = state
        .store
        .goals_by_user_id(&user_id)
        .await
        .map_err(internal)?
        .into_iter()
        .filter(|g| g.status == STATUS_SUGGESTED)
        .collect();
    let tasks = state
        .store
        .tasks_by_user_id(&user_id)
        .await
        .map_err(internal)?
        .into_iter()
        .filter(|t| t.status == STATUS_SUGGESTED)
        .collect();
    let habits = state
        .store
        .habits_by_user_id(&user_id)
        .await
        .map_err(internal)?
        .into_iter()
        .filter(|h| h.status == STATUS_SUGGESTED)
        .collect();

    Ok(Json(SuggestionsResponse {
        goals,
        tasks,
        habits,
    }))
}

// ============ Accept / reject handlers ============

async fn handle_accept_goal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Goal>, AppError> {
    let caller = require_user(&headers)?;
    match state.store.get_goal(&id).await.map_err(internal)? {
        Some(goal) if goal.user_id != caller => return Err(forbidden()),
        _ => {}
    }
    match state.store.accept_goal(&id).await.map_err(internal)? {
        Some(goal) => {
            info!(goal_id = %id, user_id = %caller, "goal suggestion accepted");
            Ok(Json(goal))
        }
        None => Err(not_found(format!("no suggested goal with id {}", id))),
    }
}

async fn handle_reject_goal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let caller = require_user(&headers)?;
    match state.store.get_goal(&id).await.map_err(internal)? {
        Some(goal) if goal.user_id != caller => return Err(forbidden()),
        _ => {}
    }
    if state
        .store
        .delete_suggested_goal(&id)
        .await
        .map_err(internal)?
    {
        info!(goal_id = %id, user_id = %caller, "goal suggestion rejected");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(format!("no suggested goal with id {}", id)))
    }
}

async fn handle_accept_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Task>, AppError> {
    let caller = require_user(&headers)?;
    match state.store.get_task(&id).await.map_err(internal)? {
        Some(task) if task.user_id != caller => return Err(forbidden()),
        _ => {}
    }
    match state.store.accept_task(&id).await.map_err(internal)? {
        Some(task) => {
            info!(task_id = %id, user_id = %caller, "task suggestion accepted");
            Ok(Json(task))
        }
        None => Err(not_found(format!("no suggested task with id {}", id))),
    }
}

async fn handle_reject_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let caller = require_user(&headers)?;
    match state.store.get_task(&id).await.map_err(internal)? {
        Some(task) if task.user_id != caller => return Err(forbidden()),
        _ => {}
    }
    if state
        .store
        .delete_suggested_task(&id)
        .await
        .map_err(internal)?
    {
        info!(task_id = %id, user_id = %caller, "task suggestion rejected");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(format!("no suggested task with id {}", id)))
    }
}

async fn handle_accept_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Habit>, AppError> {
    let caller = require_user(&headers)?;
    match state.store.get_habit(&id).await.map_err(internal)? {
        Some(habit) if habit.user_id != caller => return Err(forbidden()),
        _ => {}
    }
    match state.store.accept_habit(&id).await.map_err(internal)? {
        Some(habit) => {
            info!(habit_id = %id, user_id = %caller, "habit suggestion accepted");
            Ok(Json(habit))
        }
        None => Err(not_found(format!("no suggested habit with id {}", id))),
    }
}

async fn handle_reject_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let caller = require_user(&headers)?;
    match state.store.get_habit(&id).await.map_err(internal)? {
        Some(habit) if habit.user_id != caller => return Err(forbidden()),
        _ => {}
    }
    if state
        .store
        .delete_suggested_habit(&id)
        .await
        .map_err(internal)?
    {
        info!(habit_id = %id, user_id = %caller, "habit suggestion rejected");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(format!("no suggested habit with id {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SOURCE_AI, STATUS_ACTIVE};
    use crate::store::memory::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    fn suggested_goal(id: &str, user_id: &str, name: &str) -> Goal {
        Goal {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: None,
            category: "Personal".to_string(),
            status: STATUS_SUGGESTED.to_string(),
            source: SOURCE_AI.to_string(),
            ai_explanation: Some("Generated from your journal entries".to_string()),
            journal_entry_id: Some("e1".to_string()),
            created_at: 0,
        }
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .create_goal(&suggested_goal("g1", "u1", "Learn Spanish"))
            .await
            .unwrap();
        store
    }

    fn request(method: &str, uri: &str, user: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_list_requires_auth() {
        let app = build_router(seeded_store().await);
        let response = app
            .oneshot(request("GET", "/api/goals/u1/ai-suggestions", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    async fn test_list_rejects_other_user() {
        let app = build_router(seeded_store().await);
        let response = app
            .oneshot(request("GET", "/api/goals/u1/ai-suggestions", Some("u2")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_list_returns_only_suggested() {
        let store = seeded_store().await;
        let mut active = suggested_goal("g2", "u1", "Active goal");
        active.status = STATUS_ACTIVE.to_string();
        store.create_goal(&active).await.unwrap();

        let app = build_router(store);
        let response = app
            .oneshot(request("GET", "/api/goals/u1/ai-suggestions", Some("u1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["goals"].as_array().unwrap().len(), 1);
        assert_eq!(json["goals"][0]["id"], "g1");
        assert!(json["tasks"].as_array().unwrap().is_empty());
        assert!(json["habits"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accept_promotes_once() {
        let store = seeded_store().await;
        let app = build_router(store.clone());

        let response = app
            .clone()
            .oneshot(request("POST", "/api/ai-goals/g1/accept", Some("u1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], STATUS_ACTIVE);

        // Second accept of the same id is 404
        let response = app
            .oneshot(request("POST", "/api/ai-goals/g1/accept", Some("u1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let goal = store.get_goal("g1").await.unwrap().unwrap();
        assert_eq!(goal.status, STATUS_ACTIVE);
    }

    #[tokio::test]
    async fn test_accept_checks_ownership() {
        let app = build_router(seeded_store().await);
        let response = app
            .oneshot(request("POST", "/api/ai-goals/g1/accept", Some("u2")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_reject_deletes_permanently() {
        let store = seeded_store().await;
        let app = build_router(store.clone());

        let response = app
            .clone()
            .oneshot(request("DELETE", "/api/ai-goals/g1", Some("u1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(store.get_goal("g1").await.unwrap().is_none());

        // Second reject is 404
        let response = app
            .oneshot(request("DELETE", "/api/ai-goals/g1", Some("u1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reject_leaves_active_items_alone() {
        let store = Arc::new(MemoryStore::new());
        let mut goal = suggested_goal("g1", "u1", "Learn Spanish");
        goal.status = STATUS_ACTIVE.to_string();
        store.create_goal(&goal).await.unwrap();

        let app = build_router(store.clone());
        let response = app
            .oneshot(request("DELETE", "/api/ai-goals/g1", Some("u1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(store.get_goal("g1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(Arc::new(MemoryStore::new()));
        let response = app
            .oneshot(request("GET", "/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_task_and_habit_lifecycle() {
        let store = Arc::new(MemoryStore::new());
        store
            .create_task(&Task {
                id: "t1".to_string(),
                user_id: "u1".to_string(),
                title: "Book dentist".to_string(),
                description: None,
                priority: "high".to_string(),
                status: STATUS_SUGGESTED.to_string(),
                source: SOURCE_AI.to_string(),
                ai_explanation: None,
                journal_entry_id: None,
                created_at: 0,
            })
            .await
            .unwrap();
        store
            .create_habit(&Habit {
                id: "h1".to_string(),
                user_id: "u1".to_string(),
                title: "Morning walk".to_string(),
                description: None,
                frequency: "daily".to_string(),
                status: STATUS_SUGGESTED.to_string(),
                source: SOURCE_AI.to_string(),
                ai_explanation: None,
                journal_entry_id: None,
                created_at: 0,
            })
            .await
            .unwrap();

        let app = build_router(store.clone());

        let response = app
            .clone()
            .oneshot(request("POST", "/api/ai-tasks/t1/accept", Some("u1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(request("DELETE", "/api/ai-habits/h1", Some("u1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(store.get_habit("h1").await.unwrap().is_none());
    }
}
