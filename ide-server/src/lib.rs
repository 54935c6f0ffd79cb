//! `simple-ide-server`: HTTP/JSON facade over the project file store.
//!
//! Routes map one-to-one onto [`simple_ide_core::ProjectStore`] and
//! [`simple_ide_core::Compiler`] calls; see [`build_router`] for the table.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use simple_ide_core::{Compiler, ProjectStore, ServiceConfig};
use tokio::net::TcpListener;

pub mod http;
pub mod middleware;

/// Shared, immutable per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: ProjectStore,
    pub compiler: Arc<Compiler>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            store: ProjectStore::new(config.store_root.clone()),
            compiler: Arc::new(Compiler::new(config.compile.clone())),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(http::health::health_handler))
        .route(
            "/api/projects",
            get(http::projects::list_projects_handler).post(http::projects::create_project_handler),
        )
        .route(
            "/api/projects/:project_name/files",
            get(http::files::list_files_handler),
        )
        .route(
            "/api/projects/:project_name/file",
            post(http::files::create_file_handler),
        )
        .route(
            "/api/projects/:project_name/file/:file_name",
            get(http::files::read_file_handler)
                .put(http::files::update_file_handler)
                .delete(http::files::delete_file_handler),
        )
        .route(
            "/api/projects/:project_name/compile/:file_name",
            post(http::compile::compile_handler),
        )
        .layer(from_fn_with_state(state.clone(), middleware::cors_middleware))
        .layer(from_fn(middleware::request_tracing_middleware))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}

/// Serve `state` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
