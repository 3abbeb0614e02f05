/// Label endpoints
///
/// Owner-scoped like tasks, with the same 404-before-403 guard on id
/// routes. Label names are unique per user; collisions are 409s. Deleting
/// a label cascades: the id is pulled from every task of the owner before
/// the label row goes away, so tasks never hold dangling references.
///
/// # Endpoints
///
/// - `POST   /v1/labels` - create (201)
/// - `GET    /v1/labels` - list own labels with task counts
/// - `GET    /v1/labels/:id` - fetch one
/// - `PUT    /v1/labels/:id` - rename / recolor
/// - `DELETE /v1/labels/:id` - delete with cascade (204)

use axum::{
    extract::{Path, State},
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
    models::{
        label::{CreateLabel, Label, LabelWithTaskCount, UpdateLabel},
        task::Task,
    },
};

/// Create label request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLabelRequest {
    /// Label name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Hex color, e.g. "#3B82F6" (defaults to blue)
    pub color: Option<String>,
}

/// Update label request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLabelRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub color: Option<String>,
}

/// Checks a "#RGB" / "#RRGGBB" hex color string
fn check_hex_color(color: Option<&str>) -> Result<(), ApiError> {
    let Some(color) = color else { return Ok(()) };

    let valid = color
        .strip_prefix('#')
        .map(|rest| {
            (rest.len() == 3 || rest.len() == 6) && rest.chars().all(|c| c.is_ascii_hexdigit())
        })
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(ApiError::ValidationError(vec![
            crate::error::ValidationErrorDetail {
                field: "color".to_string(),
                message: "Color must be a hex string like #3B82F6".to_string(),
            },
        ]))
    }
}

/// Label response
#[derive(Debug, Serialize, Deserialize)]
pub struct LabelResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl From<Label> for LabelResponse {
    fn from(label: Label) -> Self {
        Self {
            id: label.id,
            user_id: label.user_id,
            name: label.name,
            color: label.color,
            created_at: label.created_at,
        }
    }
}

/// Creates a label for the current user
///
/// # Errors
///
/// - `409 Conflict`: the user already has a label with this name
pub async fn create_label(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateLabelRequest>,
) -> ApiResult<(StatusCode, Json<LabelResponse>)> {
    req.validate().map_err(ApiError::from_validation)?;
    check_hex_color(req.color.as_deref())?;

    // Friendlier than surfacing the constraint violation; the unique
    // index still decides under concurrency
    if Label::is_name_taken(&state.db, user.0.id, &req.name, None).await? {
        return Err(ApiError::Conflict("Label name already exists".to_string()));
    }

    let label = Label::create(
        &state.db,
        user.0.id,
        CreateLabel {
            name: req.name,
            color: req.color,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(LabelResponse::from(label))))
}

/// Lists the current user's labels with per-label task counts
pub async fn list_labels(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<LabelWithTaskCount>>> {
    let labels = Label::list_with_task_count(&state.db, user.0.id).await?;

    Ok(Json(labels))
}

/// Fetches a single label
pub async fn get_label(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LabelResponse>> {
    let label = Label::find_by_id(&state.db, id).await?;
    let label = require_found_and_owned(label, user.0.id)?;

    Ok(Json(LabelResponse::from(label)))
}

/// Renames or recolors a label
///
/// # Errors
///
/// - `409 Conflict`: new name collides with another of the user's labels
pub async fn update_label(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLabelRequest>,
) -> ApiResult<Json<LabelResponse>> {
    req.validate().map_err(ApiError::from_validation)?;
    check_hex_color(req.color.as_deref())?;

    let label = Label::find_by_id(&state.db, id).await?;
    let label = require_found_and_owned(label, user.0.id)?;

    if let Some(ref name) = req.name {
        if name != &label.name
            && Label::is_name_taken(&state.db, user.0.id, name, Some(label.id)).await?
        {
            return Err(ApiError::Conflict("Label name already exists".to_string()));
        }
    }

    let updated = Label::update(
        &state.db,
        label.id,
        UpdateLabel {
            name: req.name,
            color: req.color,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Label not found".to_string()))?;

    Ok(Json(LabelResponse::from(updated)))
}

/// Deletes a label, pulling it from all of the owner's tasks first
pub async fn delete_label(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let label = Label::find_by_id(&state.db, id).await?;
    let label = require_found_and_owned(label, user.0.id)?;

    // Cascade before delete so no task is left referencing a dead id
    Task::pull_label(&state.db, user.0.id, label.id).await?;
    Label::delete(&state.db, label.id).await?;

    Ok(StatusCode::NO_CONTENT)
}
