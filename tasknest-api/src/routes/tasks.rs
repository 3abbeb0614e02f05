/// Task endpoints
///
/// All routes sit behind the auth layer and operate only on the
/// authenticated user's tasks. Id routes load first and check ownership
/// second: an absent task is a 404, someone else's task is a 403, never
/// the other way around.
///
/// # Endpoints
///
/// - `POST   /v1/tasks` - create (201, status defaults to pending)
/// - `GET    /v1/tasks?status=` - list own tasks, newest first
/// - `GET    /v1/tasks/stats` - per-status counts (cached best-effort)
/// - `GET    /v1/tasks/:id` - fetch one
/// - `PUT    /v1/tasks/:id` - partial update
/// - `PATCH  /v1/tasks/:id/status` - status only
/// - `DELETE /v1/tasks/:id` - delete (204)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::{AppState, CurrentUser},
    error::{ApiError, ApiResult},
};
use tasknest_shared::{
    auth::ownership::require_found_and_owned,
    models::task::{CreateTask, Task, TaskPriority, TaskStats, TaskStatus, UpdateTask},
};

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Task title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    /// Optional description
    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: Option<String>,

    /// Priority, defaults to medium
    #[serde(default)]
    pub priority: TaskPriority,

    /// Optional deadline
    pub due_date: Option<DateTime<Utc>>,

    /// Labels to attach
    #[serde(default)]
    pub label_ids: Vec<Uuid>,
}

/// Update task request
///
/// Absent fields are left unchanged. `description` and `due_date` can be
/// cleared by sending an explicit null: a missing field deserializes to
/// None (skip), `null` to Some(None) (clear).
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "present_as_some")]
    pub description: Option<Option<String>>,

    pub priority: Option<TaskPriority>,

    pub status: Option<TaskStatus>,

    #[serde(default, deserialize_with = "present_as_some")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    pub label_ids: Option<Vec<Uuid>>,
}

/// Deserializes a present-but-possibly-null field as Some(inner)
///
/// Paired with `#[serde(default)]` this distinguishes "field absent"
/// (outer None) from "field: null" (Some(None)).
fn present_as_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Status-only update request
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

/// List filter
#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    /// Optional status filter
    pub status: Option<TaskStatus>,
}

/// Task response
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub label_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            user_id: task.user_id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
            label_ids: task.label_ids,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Cache key for a user's task stats
fn stats_cache_key(user_id: Uuid) -> String {
    format!("task_stats:{}", user_id)
}

/// Drops the cached stats after any task mutation
async fn invalidate_stats(state: &AppState, user_id: Uuid) {
    state.cache.delete(&stats_cache_key(user_id)).await;
}

/// Creates a task for the current user
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    req.validate().map_err(ApiError::from_validation)?;

    let task = Task::create(
        &state.db,
        user.0.id,
        CreateTask {
            title: req.title,
            description: req.description,
            priority: req.priority,
            due_date: req.due_date,
            label_ids: req.label_ids,
        },
    )
    .await?;

    invalidate_stats(&state, user.0.id).await;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

/// Lists the current user's tasks, optionally filtered by status
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = Task::list_by_owner(&state.db, user.0.id, query.status).await?;

    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// Returns per-status task counts for the current user
///
/// Served from the cache when possible; recomputed and re-cached on a
/// miss. The cache is best-effort, so a stale count can be returned
/// within the TTL window after a write from another instance.
pub async fn task_stats(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<TaskStats>> {
    let key = stats_cache_key(user.0.id);

    if let Some(stats) = state.cache.get_json::<TaskStats>(&key).await {
        return Ok(Json(stats));
    }

    let stats = Task::stats_by_owner(&state.db, user.0.id).await?;
    state.cache.set_json(&key, &stats, None).await;

    Ok(Json(stats))
}

/// Fetches a single task
pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = Task::find_by_id(&state.db, id).await?;
    let task = require_found_and_owned(task, user.0.id)?;

    Ok(Json(TaskResponse::from(task)))
}

/// Updates a task
pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    req.validate().map_err(ApiError::from_validation)?;

    let task = Task::find_by_id(&state.db, id).await?;
    let task = require_found_and_owned(task, user.0.id)?;

    let updated = Task::update(
        &state.db,
        task.id,
        UpdateTask {
            title: req.title,
            description: req.description,
            priority: req.priority,
            status: req.status,
            due_date: req.due_date,
            label_ids: req.label_ids,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    invalidate_stats(&state, user.0.id).await;

    Ok(Json(TaskResponse::from(updated)))
}

/// Updates only a task's status
pub async fn update_task_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let task = Task::find_by_id(&state.db, id).await?;
    let task = require_found_and_owned(task, user.0.id)?;

    let updated = Task::update_status(&state.db, task.id, req.status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    invalidate_stats(&state, user.0.id).await;

    Ok(Json(TaskResponse::from(updated)))
}

/// Deletes a task
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let task = Task::find_by_id(&state.db, id).await?;
    let task = require_found_and_owned(task, user.0.id)?;

    Task::delete(&state.db, task.id).await?;

    invalidate_stats(&state, user.0.id).await;

    Ok(StatusCode::NO_CONTENT)
}
