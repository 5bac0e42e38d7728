//! Axum route handlers for the CV API.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::info;

use crate::errors::AppError;
use crate::models::cv::UploadedDocument;
use crate::state::AppState;

/// Largest accepted upload (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Request body limit for the ingest route: the upload plus multipart framing.
pub const INGEST_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

const UPLOAD_FIELD: &str = "file";
const DEFAULT_FILENAME: &str = "cv";
const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// POST /cv/ingest
///
/// Accepts a multipart upload in field `file` and returns the embedded sections
/// as a downloadable, pretty-printed JSON attachment. The body is fully buffered.
pub async fn handle_ingest(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let document = read_upload(&mut multipart).await?;

    let sections = state.pipeline.process(&document).await?;

    let body = serde_json::to_vec_pretty(&sections)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize sections: {e}")))?;
    let filename = format!("cv-embeddings-{}.json", Utc::now().timestamp_millis());

    info!(
        "Returning {} sections ({} bytes) for {}",
        sections.len(),
        body.len(),
        document.name
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
            (header::CONTENT_LENGTH, body.len().to_string()),
        ],
        Body::from(body),
    )
        .into_response())
}

/// Reads the `file` field. Other fields are ignored.
async fn read_upload(multipart: &mut Multipart) -> Result<UploadedDocument, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let name = field
            .file_name()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_FILENAME)
            .to_string();
        let media_type = field
            .content_type()
            .unwrap_or(DEFAULT_MEDIA_TYPE)
            .to_string();
        let bytes = field.bytes().await.map_err(invalid_multipart)?;

        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::Validation(format!(
                "File exceeds the maximum size of {MAX_UPLOAD_BYTES} bytes"
            )));
        }

        return Ok(UploadedDocument {
            name,
            media_type,
            bytes,
        });
    }

    Err(AppError::Validation(format!(
        "Missing multipart field '{UPLOAD_FIELD}'"
    )))
}

fn invalid_multipart(e: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart upload: {}", e.body_text()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt; // for `oneshot`

    use crate::cv::pipeline::CvPipeline;
    use crate::cv::testing::{ChatReply, FakeLlm};
    use crate::cv::vectorizer::EmbeddingLimiter;
    use crate::errors::EXTRACTION_FAILED_MESSAGE;
    use crate::models::cv::{EmbeddedSection, SectionType};
    use crate::routes::build_router;

    use super::*;

    const BOUNDARY: &str = "cv-test-boundary";
    const REPLY: &str = r#"{"profile":"Senior Engineer","experience":[{"role":"Dev","company":"Tech","dates":"2020","description":"Shipped X"}],"skills":["Go","React"],"projects":[{"name":"Atlas","stack":"Rust","details":"CLI"}]}"#;

    fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::with_capacity(data.len() + 256);
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn ingest_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/cv/ingest")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn app(llm: &Arc<FakeLlm>) -> axum::Router {
        build_router(AppState {
            pipeline: Arc::new(CvPipeline::new(
                llm.clone(),
                0,
                EmbeddingLimiter::unbounded(),
            )),
        })
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_ingest_returns_json_attachment() {
        let llm = Arc::new(FakeLlm::replying(REPLY));
        let body = multipart_body("file", "cv.md", "text/markdown", b"# CV");

        let response = app(&llm).oneshot(ingest_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers().clone();
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename=\"cv-embeddings-"));
        assert!(disposition.ends_with(".json\""));

        let bytes = body_bytes(response).await;
        assert_eq!(
            headers[header::CONTENT_LENGTH].to_str().unwrap(),
            bytes.len().to_string()
        );

        let sections: Vec<EmbeddedSection> = serde_json::from_slice(&bytes).unwrap();
        let kinds: Vec<SectionType> = sections.iter().map(|s| s.metadata.section).collect();
        assert_eq!(
            kinds,
            vec![
                SectionType::Profile,
                SectionType::Skills,
                SectionType::Experience,
                SectionType::Project
            ]
        );
        assert!(sections.iter().all(|s| s.metadata.source == "cv.md"));
    }

    #[tokio::test]
    async fn test_response_body_round_trips() {
        let llm = Arc::new(FakeLlm::replying(REPLY));
        let body = multipart_body("file", "cv.pdf", "application/pdf", b"%PDF-1.7");

        let response = app(&llm).oneshot(ingest_request(body)).await.unwrap();
        let bytes = body_bytes(response).await;

        let parsed: Vec<EmbeddedSection> = serde_json::from_slice(&bytes).unwrap();
        let reserialized = serde_json::to_vec_pretty(&parsed).unwrap();
        assert_eq!(reserialized, bytes);

        // Pretty-printed, not compact.
        assert!(String::from_utf8(bytes).unwrap().contains("\n  {"));
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected_before_extraction() {
        let llm = Arc::new(FakeLlm::replying(REPLY));
        let data = vec![b'a'; MAX_UPLOAD_BYTES + 1];
        let body = multipart_body("file", "cv.txt", "text/plain", &data);

        let response = app(&llm).oneshot(ingest_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(llm.chat_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_body_over_transport_limit_is_rejected() {
        let llm = Arc::new(FakeLlm::replying(REPLY));
        let data = vec![b'a'; INGEST_BODY_LIMIT + 1];
        let body = multipart_body("file", "cv.txt", "text/plain", &data);

        let response = app(&llm).oneshot(ingest_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(llm.chat_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_field_is_rejected() {
        let llm = Arc::new(FakeLlm::replying(REPLY));
        let body = multipart_body("resume", "cv.md", "text/markdown", b"# CV");

        let response = app(&llm).oneshot(ingest_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_extraction_failure_does_not_leak_detail() {
        let llm = Arc::new(FakeLlm::with_reply(ChatReply::Reject {
            status: 401,
            message: "invalid api key sk-secret".to_string(),
        }));
        let body = multipart_body("file", "cv.md", "text/markdown", b"# CV");

        let response = app(&llm).oneshot(ingest_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let text = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(!text.contains("sk-secret"));
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["error"]["code"], "EXTRACTION_FAILED");
        assert_eq!(json["error"]["message"], EXTRACTION_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_empty_model_reply_is_client_error() {
        let llm = Arc::new(FakeLlm::with_reply(ChatReply::Empty));
        let body = multipart_body("file", "cv.md", "text/markdown", b"# CV");

        let response = app(&llm).oneshot(ingest_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_server_error() {
        let llm = Arc::new(FakeLlm::replying(REPLY).failing_embedding_containing("Atlas"));
        let body = multipart_body("file", "cv.md", "text/markdown", b"# CV");

        let response = app(&llm).oneshot(ingest_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let text = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(!text.contains("embedding backend down"));
    }
}
