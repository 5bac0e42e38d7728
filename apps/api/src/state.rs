use std::sync::Arc;

use crate::cv::pipeline::CvPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// CV pipeline. Holds the single long-lived LLM client handle.
    pub pipeline: Arc<CvPipeline>,
}
