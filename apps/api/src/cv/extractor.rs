//! Structured extraction — one chat-completion round trip per uploaded CV.
//!
//! Text documents are inlined into the prompt; everything else is attached as a
//! base64 data URI. The reply must be a single JSON object decoding to
//! `StructuredResume`. Every failure on this path (transport, non-2xx, empty
//! reply, bad JSON) collapses into `AppError::Extraction`; the detail is logged
//! here and never returned to the caller.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{error, info, warn};

use crate::cv::classifier::DocumentKind;
use crate::cv::prompts::{CV_ATTACHMENT_PROMPT, CV_EXTRACTION_SYSTEM, CV_TEXT_PROMPT};
use crate::errors::AppError;
use crate::llm_client::{
    strip_json_fences, ChatMessage, ChatRequest, ContentPart, ImageUrl, LlmApi, LlmError,
    ResponseFormat, EXTRACTION_MODEL,
};
use crate::models::cv::{StructuredResume, UploadedDocument};

/// DOCX media type. Attached under `application/pdf`; the bytes are not converted.
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub struct Extractor {
    llm: Arc<dyn LlmApi>,
    /// Max characters of inlined text. 0 = unlimited.
    text_budget: usize,
}

impl Extractor {
    pub fn new(llm: Arc<dyn LlmApi>, text_budget: usize) -> Self {
        Self { llm, text_budget }
    }

    pub async fn extract(&self, document: &UploadedDocument) -> Result<StructuredResume, AppError> {
        let request = self.build_request(document);

        match self.request_structured(&request).await {
            Ok(resume) => {
                info!(
                    "Extracted CV {}: profile={}, experience={}, skills={}, projects={}",
                    document.name,
                    !resume.profile.trim().is_empty(),
                    resume.experience.len(),
                    resume.skills.len(),
                    resume.projects.len()
                );
                Ok(resume)
            }
            Err(LlmError::EmptyContent) => {
                error!("Extraction model returned empty content for {}", document.name);
                Err(AppError::Extraction(format!(
                    "empty or invalid AI response for {}",
                    document.name
                )))
            }
            Err(e) => {
                error!("CV extraction failed for {}: {e}", document.name);
                Err(AppError::Extraction(format!("{}: {e}", document.name)))
            }
        }
    }

    /// Builds the single chat-completion request for `document`.
    pub fn build_request(&self, document: &UploadedDocument) -> ChatRequest {
        ChatRequest {
            model: EXTRACTION_MODEL.to_string(),
            messages: vec![
                ChatMessage::system(CV_EXTRACTION_SYSTEM),
                ChatMessage::user(self.user_content(document)),
            ],
            response_format: Some(ResponseFormat::json_object()),
        }
    }

    fn user_content(&self, document: &UploadedDocument) -> Vec<ContentPart> {
        match DocumentKind::classify(&document.media_type) {
            DocumentKind::Text => {
                let decoded = String::from_utf8_lossy(&document.bytes);
                let (content, truncated) = truncate_chars(&decoded, self.text_budget);
                if truncated {
                    warn!(
                        "CV {} truncated to {} characters before extraction",
                        document.name, self.text_budget
                    );
                }
                let text = CV_TEXT_PROMPT
                    .replace("{media_type}", &document.media_type)
                    .replace("{content}", content);
                vec![ContentPart::Text { text }]
            }
            DocumentKind::Binary => vec![
                ContentPart::Text {
                    text: CV_ATTACHMENT_PROMPT.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: data_uri(&document.media_type, &document.bytes),
                    },
                },
            ],
        }
    }

    async fn request_structured(&self, request: &ChatRequest) -> Result<StructuredResume, LlmError> {
        let response = self.llm.complete(request).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        serde_json::from_str(strip_json_fences(text)).map_err(LlmError::Parse)
    }
}

/// Media type advertised for an attachment.
pub fn attachment_media_type(media_type: &str) -> &str {
    if media_type == DOCX_MEDIA_TYPE {
        "application/pdf"
    } else {
        media_type
    }
}

fn data_uri(media_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        attachment_media_type(media_type),
        BASE64.encode(bytes)
    )
}

/// Cuts `text` to at most `budget` characters on a char boundary.
fn truncate_chars(text: &str, budget: usize) -> (&str, bool) {
    if budget == 0 {
        return (text, false);
    }
    match text.char_indices().nth(budget) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}
