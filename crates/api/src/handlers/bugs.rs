//! Handlers for the `/bugs` resource.
//!
//! Writes are validated here before any storage work; the repository runs
//! each one in a single transaction.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bugtrack_core::error::CoreError;
use bugtrack_core::types::DbId;
use bugtrack_db::models::bug::{CreateBug, UpdateBug};
use bugtrack_db::repositories::BugRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Bug", id })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/bugs
///
/// Create a bug. Unknown tag names are added to the registry.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateBug>,
) -> AppResult<impl IntoResponse> {
    input.validate_input()?;

    let bug = BugRepo::create(&state.pool, &input).await?;

    tracing::info!(bug_id = bug.bug.id, tags = bug.tags.len(), "Bug created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: bug })))
}

/// GET /api/v1/bugs
pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let bugs = BugRepo::list_all(&state.pool).await?;
    Ok(Json(DataResponse { data: bugs }))
}

/// GET /api/v1/bugs/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let bug = BugRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: bug }))
}

/// PATCH /api/v1/bugs/{id}
///
/// Merge the fields that were sent. Tags are added to the bug's set, never
/// removed. Responds with 204 and no body.
pub async fn update_partial(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateBug>,
) -> AppResult<StatusCode> {
    input.validate_input()?;

    BugRepo::update_partial(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(bug_id = id, fields = input.fields_set(), "Bug patched");

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/bugs/{id}
///
/// Replace every field. When `tags` is sent it replaces the bug's whole tag set.
pub async fn update_full(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CreateBug>,
) -> AppResult<impl IntoResponse> {
    input.validate_input()?;

    let bug = BugRepo::update_full(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(bug_id = id, tags = bug.tags.len(), "Bug replaced");

    Ok(Json(DataResponse { data: bug }))
}

/// DELETE /api/v1/bugs/{id}
///
/// Remove a bug and its tag links. The tags stay in the registry.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if BugRepo::delete(&state.pool, id).await? {
        tracing::info!(bug_id = id, "Bug deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}
