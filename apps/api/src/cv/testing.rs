//! In-process `LlmApi` stand-in shared by the cv module tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::llm_client::{
    ChatRequest, ChatResponse, ContentPart, EmbeddingRequest, EmbeddingResponse, LlmApi,
    LlmError, MessageContent,
};

pub enum ChatReply {
    Content(String),
    Empty,
    Reject { status: u16, message: String },
}

pub struct FakeLlm {
    chat_reply: ChatReply,
    /// Embedding requests whose input contains this text fail with a 500.
    fail_embedding_containing: Option<String>,
    /// When set, earlier embedding calls take longer so completion order is reversed.
    reverse_completion_order: bool,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub embed_inputs: Mutex<Vec<String>>,
    embed_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeLlm {
    pub fn replying(content: &str) -> Self {
        Self::with_reply(ChatReply::Content(content.to_string()))
    }

    pub fn with_reply(chat_reply: ChatReply) -> Self {
        Self {
            chat_reply,
            fail_embedding_containing: None,
            reverse_completion_order: false,
            chat_requests: Mutex::new(Vec::new()),
            embed_inputs: Mutex::new(Vec::new()),
            embed_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn failing_embedding_containing(mut self, needle: &str) -> Self {
        self.fail_embedding_containing = Some(needle.to_string());
        self
    }

    pub fn with_reversed_completion(mut self) -> Self {
        self.reverse_completion_order = true;
        self
    }

    pub fn embed_count(&self) -> usize {
        self.embed_inputs.lock().unwrap().len()
    }

    /// Parts of the user message of the only recorded chat request.
    pub fn user_parts(&self) -> Vec<ContentPart> {
        let requests = self.chat_requests.lock().unwrap();
        assert_eq!(requests.len(), 1, "expected exactly one chat request");
        let user = requests[0]
            .messages
            .iter()
            .find(|m| m.role == "user")
            .expect("user message");
        match &user.content {
            MessageContent::Parts(parts) => parts.clone(),
            MessageContent::Text(text) => vec![ContentPart::Text { text: text.clone() }],
        }
    }
}

/// Deterministic vector derived from the input so tests can pair results with snippets.
pub fn fake_vector(input: &str) -> Vec<f32> {
    vec![input.chars().count() as f32, 0.5, -0.25]
}

#[async_trait]
impl LlmApi for FakeLlm {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        self.chat_requests.lock().unwrap().push(request.clone());
        let body = match &self.chat_reply {
            ChatReply::Content(content) => json!({"choices": [{"message": {"content": content}}]}),
            ChatReply::Empty => json!({"choices": [{"message": {"content": null}}]}),
            ChatReply::Reject { status, message } => {
                return Err(LlmError::Api {
                    status: *status,
                    message: message.clone(),
                })
            }
        };
        Ok(serde_json::from_value(body)?)
    }

    async fn embed(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse, LlmError> {
        let call = self.embed_calls.fetch_add(1, Ordering::SeqCst);
        self.embed_inputs.lock().unwrap().push(request.input.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = if self.reverse_completion_order {
            Duration::from_millis(100u64.saturating_sub(call as u64 * 10))
        } else {
            Duration::from_millis(10)
        };
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(needle) = &self.fail_embedding_containing {
            if request.input.contains(needle.as_str()) {
                return Err(LlmError::Api {
                    status: 500,
                    message: "embedding backend down".to_string(),
                });
            }
        }
        Ok(serde_json::from_value(
            json!({"data": [{"embedding": fake_vector(&request.input)}]}),
        )?)
    }
}
