use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use bugtrack_db::repositories::TagRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/tags
///
/// List every tag in the registry, including tags no bug uses anymore.
pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let tags = TagRepo::list_all(&state.pool).await?;
    Ok(Json(DataResponse { data: tags }))
}
