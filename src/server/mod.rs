use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::crew::llm::LlmClient;
use crate::utils::pdf::DocumentLoader;

pub mod analyze;
pub mod staging;
pub mod types;

#[derive(Clone)]
pub struct AppState {
    pub scratch_dir: PathBuf,
    pub llm: Arc<dyn LlmClient>,
    pub loader: Arc<dyn DocumentLoader>,
    pub max_iterations: usize,
    pub max_upload_bytes: usize,
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze::analyze))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
