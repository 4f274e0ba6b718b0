use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use super::{handlers, AppState};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/blog/:slug", get(handlers::blog_post))
        .route(
            "/api/posts",
            get(handlers::api_list_posts).post(handlers::api_create_post),
        )
        .route(
            "/api/posts/:id",
            get(handlers::api_get_post)
                .put(handlers::api_update_post)
                .delete(handlers::api_delete_post),
        )
        .route("/api/published", get(handlers::api_list_published))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/files", get(handlers::api_list_files))
        .route("/api/files/:key", delete(handlers::api_delete_file))
        .route(
            "/api/upload",
            post(handlers::api_upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/health", get(handlers::health))
}
