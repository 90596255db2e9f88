//! Request handlers for the task endpoints.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::AppState;
use crate::db::{Database, StoreError, StoreResult};
use crate::error::{ApiError, ApiResult};
use crate::types::{NewTask, Task, TaskId, TaskPatch, deserialize_present};
use crate::validation::compute_title_hash;

/// Success envelope: `{ "success": true, "count"?: n, "data": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            count: None,
            data,
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: Some(data.len()),
            data,
        }
    }
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Body of `PUT /api/tasks/{id}`. Fields not listed here are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default, deserialize_with = "deserialize_present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Run a store call on the blocking pool.
async fn with_db<F, T>(db: &Database, f: F) -> ApiResult<StoreResult<T>>
where
    F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(ApiError::server)
}

fn parse_id(raw: &str) -> ApiResult<TaskId> {
    TaskId::parse(raw).ok_or_else(ApiError::invalid_id)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "Rejected request body");
            Err(ApiError::validation(rejection.body_text()))
        }
    }
}

/// GET /api/tasks
pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<Task>>>> {
    let tasks = with_db(state.db(), |db| db.list_tasks()).await??;
    Ok(Json(ApiResponse::list(tasks)))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Task>>> {
    let id = parse_id(&raw_id)?;
    let task = with_db(state.db(), move |db| db.get_task(&id)).await??;
    Ok(Json(ApiResponse::ok(task)))
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = json_body(payload)?;

    let title = match request.title {
        Some(title) if !title.trim().is_empty() => title,
        _ => return Err(ApiError::title_required()),
    };

    // Advisory check; the unique index has the final word below.
    let hash = compute_title_hash(&title);
    if let Some(existing) = with_db(state.db(), move |db| db.find_task_by_hash(&hash, None)).await??
    {
        return Err(ApiError::duplicate_of(existing.id));
    }

    let new = NewTask {
        title,
        description: request.description,
        completed: request.completed.unwrap_or(false),
    };
    let task = with_db(state.db(), move |db| db.insert_task(new)).await??;

    info!(task_id = %task.id, "Task created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(task))))
}

/// PUT /api/tasks/{id}
pub async fn update_task(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Task>>> {
    let id = parse_id(&raw_id)?;
    let existing = with_db(state.db(), move |db| db.get_task(&id)).await??;
    let request = json_body(payload)?;

    let title = match request.title {
        None => None,
        Some(Some(title)) if !title.trim().is_empty() => Some(title),
        Some(_) => return Err(ApiError::title_required()),
    };

    if let Some(ref title) = title {
        if title.trim() != existing.title {
            let hash = compute_title_hash(title);
            let duplicate =
                with_db(state.db(), move |db| db.find_task_by_hash(&hash, Some(&id))).await??;
            if let Some(other) = duplicate {
                return Err(ApiError::duplicate_of(other.id));
            }
        }
    }

    let patch = TaskPatch {
        title,
        description: request.description,
        completed: request.completed,
    };
    let task = with_db(state.db(), move |db| db.update_task(&id, patch))
        .await?
        .map_err(|e| match e {
            StoreError::DuplicateKey => {
                ApiError::duplicate("Task with this title already exists")
            }
            other => ApiError::from(other),
        })?;

    info!(task_id = %task.id, "Task updated");
    Ok(Json(ApiResponse::ok(task)))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let id = parse_id(&raw_id)?;

    with_db(state.db(), move |db| {
        db.get_task(&id)?;
        db.delete_task(&id)
    })
    .await??;

    info!(task_id = %id, "Task deleted");
    Ok(Json(ApiResponse::ok(serde_json::json!({}))))
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// GET /api/health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "OK" })
}

/// GET /
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Welcome to the Task Manager API!" }))
}

/// Any unmatched route.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "message": "Not Found" })),
    )
}
