// CV ingestion: classify an uploaded résumé, extract structured fields with one
// chat-completion call, embed every section, return the vectors.
// All model calls go through llm_client — no direct provider calls here.

pub mod classifier;
pub mod extractor;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod vectorizer;

#[cfg(test)]
pub(crate) mod testing;
