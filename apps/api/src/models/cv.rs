use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A file received on the ingest endpoint. Lives for one request only.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

impl UploadedDocument {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction output
// ────────────────────────────────────────────────────────────────────────────

/// Structured résumé as returned by the extraction model.
///
/// Model output is untrusted: every field tolerates being absent, `null`, or of
/// the wrong shape. Missing arrays decode as empty, scalar fields are stringified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredResume {
    #[serde(default, deserialize_with = "lenient_string")]
    pub profile: String,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default, deserialize_with = "lenient_string_vec")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub projects: Vec<ProjectEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dates: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub stack: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub details: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Vectorization output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Profile,
    Skills,
    Experience,
    Project,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Profile => "profile",
            SectionType::Skills => "skills",
            SectionType::Experience => "experience",
            SectionType::Project => "project",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One embedded CV section. The response body is a JSON array of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedSection {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: SectionMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionMetadata {
    /// Original upload filename.
    pub source: String,
    pub section: SectionType,
    /// Snippet length in characters.
    pub original_length: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient decoding
// ────────────────────────────────────────────────────────────────────────────

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(scalar_to_string).collect();
            Some(parts.join(", "))
        }
        Value::Object(_) => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(value).unwrap_or_default())
}

fn lenient_string_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(scalar_to_string)
            .filter(|s| !s.trim().is_empty())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

/// Decodes an array of objects, dropping anything that is not an object.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}
