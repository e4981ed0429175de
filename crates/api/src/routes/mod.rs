pub mod health;
pub mod scripts;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /scripts                       list, run (see scripts::router)
/// /stats                         current statistics window + profiles
/// /feed                          recent digest items, newest first
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/scripts", scripts::router())
        .route("/stats", get(handlers::scripts::get_stats))
        .route("/feed", get(handlers::scripts::list_feed))
}
