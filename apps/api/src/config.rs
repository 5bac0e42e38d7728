use anyhow::{Context, Result};

const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_TEXT_BUDGET: usize = 200_000;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub llm_base_url: String,
    /// Attempts per outbound call. 1 means no retry.
    pub llm_max_attempts: u32,
    pub llm_timeout_secs: u64,
    /// Max characters of a text CV forwarded to the extraction model. 0 disables truncation.
    pub extraction_text_budget: usize,
    /// Cap on in-flight embedding requests per CV. `None` means unbounded.
    pub embedding_concurrency: Option<usize>,
    pub port: u16,
    pub cors_origin: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            llm_base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string()),
            llm_max_attempts: parse_env("LLM_MAX_ATTEMPTS", 1u32)?.max(1),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120u64)?,
            extraction_text_budget: parse_env("EXTRACTION_TEXT_BUDGET", DEFAULT_TEXT_BUDGET)?,
            embedding_concurrency: optional_env::<usize>("EMBEDDING_CONCURRENCY")?
                .filter(|n| *n > 0),
            port: parse_env("PORT", 3000u16).context("PORT must be a valid port number")?,
            cors_origin: std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(optional_env(key)?.unwrap_or(default))
}

fn optional_env<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        _ => Ok(None),
    }
}
