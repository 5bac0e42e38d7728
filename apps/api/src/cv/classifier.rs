//! Document classification by declared media type.

/// Media types whose bytes are forwarded to the model as decoded text.
pub const TEXT_MEDIA_TYPES: [&str; 4] = [
    "text/html",
    "text/markdown",
    "text/plain",
    "application/json",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Machine-readable text, inlined into the prompt.
    Text,
    /// PDF, images, office formats: attached as a base64 data URI.
    Binary,
}

impl DocumentKind {
    pub fn classify(media_type: &str) -> Self {
        if is_text_media_type(media_type) {
            DocumentKind::Text
        } else {
            DocumentKind::Binary
        }
    }
}

/// Exact membership test against `TEXT_MEDIA_TYPES`. Unknown or empty types are binary.
pub fn is_text_media_type(media_type: &str) -> bool {
    TEXT_MEDIA_TYPES.contains(&media_type)
}
