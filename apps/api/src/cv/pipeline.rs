//! CV pipeline — classify → extract → vectorize.
//!
//! Extraction errors arrive already classified (`AppError::Extraction`, a client
//! error). Vectorization errors are not recovered: they surface as
//! `AppError::Llm`, a server error.

use std::sync::Arc;

use tracing::info;

use crate::cv::extractor::Extractor;
use crate::cv::vectorizer::{EmbeddingLimiter, Vectorizer};
use crate::errors::AppError;
use crate::llm_client::LlmApi;
use crate::models::cv::{EmbeddedSection, UploadedDocument};

/// Stateless across calls; one instance serves every request.
pub struct CvPipeline {
    extractor: Extractor,
    vectorizer: Vectorizer,
}

impl CvPipeline {
    pub fn new(llm: Arc<dyn LlmApi>, text_budget: usize, limiter: EmbeddingLimiter) -> Self {
        Self {
            extractor: Extractor::new(llm.clone(), text_budget),
            vectorizer: Vectorizer::new(llm, limiter),
        }
    }

    pub async fn process(
        &self,
        document: &UploadedDocument,
    ) -> Result<Vec<EmbeddedSection>, AppError> {
        info!(
            "Processing file: {} ({}, {} bytes)",
            document.name,
            document.media_type,
            document.size()
        );

        let resume = self.extractor.extract(document).await?;

        self.vectorizer
            .vectorize(&resume, &document.name)
            .await
            .map_err(|e| AppError::Llm(format!("Vectorization failed for {}: {e}", document.name)))
    }
}
