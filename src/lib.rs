pub mod append;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod policy;
pub mod rate_key;
pub mod rate_limit;
pub mod state;
pub mod store;

use axum::{
    Router,
    routing::{get, put},
};
use std::sync::Arc;

use crate::handlers::{add_comment, create_thumbnail, health_handler, list_comments, metrics_handler};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route(
            "/api/projects/{project_id}/thumbnails/{thumbnail_id}",
            put(create_thumbnail),
        )
        .route(
            "/api/projects/{project_id}/thumbnails/{thumbnail_id}/comments",
            get(list_comments).post(add_comment),
        )
        .with_state(state)
}
