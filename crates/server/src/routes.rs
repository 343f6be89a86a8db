//! HTTP route definitions

use axum::Router;
use axum::routing::get;

use crate::handlers::{self, AppState};

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/bookmarks", get(handlers::list_bookmarks))
        .route("/tags", get(handlers::list_tags));

    let bookmark = Router::new()
        .route("/{id}/content", get(handlers::content))
        .route("/{id}/thumb", get(handlers::thumbnail))
        .route("/{id}/archive", get(handlers::archive_redirect))
        .route("/{id}/archive/", get(handlers::archive_root))
        .route("/{id}/archive/{*name}", get(handlers::archive_resource));

    Router::new().nest("/api", api).nest("/bookmark", bookmark).with_state(state)
}
