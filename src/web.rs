mod extract;
mod handlers;
mod routes;


use axum::Router;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::auth::SessionGate;
use crate::files::{FileStore, LocalFileStore};
use crate::publishing::PostService;

pub const SESSION_COOKIE: &str = "session_id";

#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub gate: Arc<SessionGate>,
    pub files: Arc<dyn FileStore>,
}

impl AppState {
    pub fn new(posts: PostService, gate: Arc<SessionGate>, files: Arc<dyn FileStore>) -> Arc<Self> {
        Arc::new(Self { posts, gate, files })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PublishedQuery {
    pub limit: Option<u32>,
}

/// The full application: API, public pages and, when `uploads` has a local mount path,
/// the uploaded files under that prefix.
pub fn router(state: Arc<AppState>, uploads: &LocalFileStore) -> Router {
    let app = Router::new().merge(routes::create_routes());

    let app = match uploads.mount_path() {
        Some(prefix) => app.nest_service(prefix, ServeDir::new(uploads.root())),
        None => {
            tracing::info!("Uploads are served externally, not mounting a file route");
            app
        }
    };

    app.layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(
    addr: String,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Web server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::Error::Internal(e.to_string()))?;

    Ok(())
}
