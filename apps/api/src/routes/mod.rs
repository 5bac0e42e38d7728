pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::cv::handlers::{self, INGEST_BODY_LIMIT};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/cv/ingest",
            post(handlers::handle_ingest).layer(DefaultBodyLimit::max(INGEST_BODY_LIMIT)),
        )
        .with_state(state)
}
