pub mod bugs;
pub mod health;
pub mod tags;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /bugs                 list, create
/// /bugs/{id}            get, patch, put, delete
///
/// /tags                 list
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/bugs", bugs::router())
        .nest("/tags", tags::router())
}
