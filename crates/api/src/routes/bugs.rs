//! Route definitions for bugs.

use axum::routing::get;
use axum::Router;

use crate::handlers::bugs;
use crate::state::AppState;

/// Routes mounted at `/bugs`.
///
/// ```text
/// GET    /        -> list
/// POST   /        -> create
/// GET    /{id}    -> get_by_id
/// PATCH  /{id}    -> update_partial
/// PUT    /{id}    -> update_full
/// DELETE /{id}    -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(bugs::list).post(bugs::create))
        .route(
            "/{id}",
            get(bugs::get_by_id)
                .patch(bugs::update_partial)
                .put(bugs::update_full)
                .delete(bugs::delete),
        )
}
