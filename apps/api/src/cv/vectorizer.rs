//! Section vectorization — flattens a `StructuredResume` into labelled snippets
//! and embeds each one with its own request.
//!
//! Requests are issued concurrently and joined with an all-or-nothing barrier:
//! the first failure fails the whole CV and no partial results are returned.
//! Output order always follows snippet order, never completion order.

use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cv::prompts::{experience_snippet, project_snippet, PROFILE_LABEL, SKILLS_LABEL};
use crate::llm_client::{EmbeddingRequest, LlmApi, LlmError, EMBEDDING_MODEL};
use crate::models::cv::{EmbeddedSection, SectionMetadata, SectionType, StructuredResume};

/// A labelled unit of text, the unit of embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub text: String,
    pub section: SectionType,
}

impl Snippet {
    fn new(text: String, section: SectionType) -> Self {
        Self { text, section }
    }
}

/// Flattens a résumé in output order: profile, skills, experience, projects.
pub fn flatten(resume: &StructuredResume) -> Vec<Snippet> {
    let mut snippets = Vec::with_capacity(2 + resume.experience.len() + resume.projects.len());

    if !resume.profile.trim().is_empty() {
        snippets.push(Snippet::new(
            format!("{PROFILE_LABEL}: {}", resume.profile),
            SectionType::Profile,
        ));
    }

    if !resume.skills.is_empty() {
        snippets.push(Snippet::new(
            format!("{SKILLS_LABEL}: {}", resume.skills.join(", ")),
            SectionType::Skills,
        ));
    }

    snippets.extend(resume.experience.iter().map(|exp| {
        Snippet::new(
            experience_snippet(&exp.role, &exp.company, &exp.dates, &exp.description),
            SectionType::Experience,
        )
    }));

    snippets.extend(resume.projects.iter().map(|proj| {
        Snippet::new(
            project_snippet(&proj.name, &proj.stack, &proj.details),
            SectionType::Project,
        )
    }));

    snippets
}

/// Optional cap on in-flight embedding requests for one CV.
/// `unbounded()` is the default and issues every request at once.
#[derive(Clone, Default)]
pub struct EmbeddingLimiter {
    permits: Option<usize>,
}

impl EmbeddingLimiter {
    pub fn unbounded() -> Self {
        Self { permits: None }
    }

    pub fn bounded(permits: usize) -> Self {
        Self {
            permits: Some(permits.max(1)),
        }
    }

    fn semaphore(&self) -> Option<Semaphore> {
        self.permits.map(Semaphore::new)
    }
}

pub struct Vectorizer {
    llm: Arc<dyn LlmApi>,
    limiter: EmbeddingLimiter,
}

impl Vectorizer {
    pub fn new(llm: Arc<dyn LlmApi>, limiter: EmbeddingLimiter) -> Self {
        Self { llm, limiter }
    }

    /// Embeds every snippet of `resume`. `source` is recorded as provenance.
    pub async fn vectorize(
        &self,
        resume: &StructuredResume,
        source: &str,
    ) -> Result<Vec<EmbeddedSection>, LlmError> {
        let snippets = flatten(resume);
        let semaphore = self.limiter.semaphore();

        let sections = try_join_all(
            snippets
                .into_iter()
                .map(|snippet| self.embed_snippet(snippet, source, semaphore.as_ref())),
        )
        .await?;

        info!("Vectorized {} sections from {}", sections.len(), source);
        Ok(sections)
    }

    async fn embed_snippet(
        &self,
        snippet: Snippet,
        source: &str,
        semaphore: Option<&Semaphore>,
    ) -> Result<EmbeddedSection, LlmError> {
        // Semaphore is never closed, so acquire cannot fail.
        let _permit = match semaphore {
            Some(s) => s.acquire().await.ok(),
            None => None,
        };

        let request = EmbeddingRequest {
            model: EMBEDDING_MODEL.to_string(),
            input: snippet.text,
        };
        let embedding = self.llm.embed(&request).await?.into_first()?;
        debug!(
            "Embedded {} snippet ({} dims)",
            snippet.section,
            embedding.len()
        );

        let text = request.input;
        Ok(EmbeddedSection {
            id: Uuid::new_v4().to_string(),
            metadata: SectionMetadata {
                source: source.to_string(),
                section: snippet.section,
                original_length: text.chars().count(),
            },
            text,
            embedding,
        })
    }
}
