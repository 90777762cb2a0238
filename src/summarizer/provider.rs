use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::{json, Value};

use crate::app::{DynlensError, Result};

use super::{ApiMode, SummaryOptions};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const OPENAI_HOST: &str = "https://api.openai.com/v1";
const GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";

/// One text-generation request against a remote backend. The backends differ
/// only in endpoint shape and envelope, so this is the whole surface; the
/// orchestrator owns prompting and decoding.
#[async_trait]
pub trait GenerateText: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Client for OpenAI and OpenAI-compatible endpoints, covering both the
/// `chat_completions` and `responses` API modes.
pub struct OpenAiClient {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    api_mode: ApiMode,
    use_json_format: bool,
    extra_headers: HeaderMap,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(opts: &SummaryOptions) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            url: resolve_url(&opts.base_url, opts.api_mode),
            api_key: opts.api_key.clone(),
            model: if opts.model.is_empty() {
                DEFAULT_OPENAI_MODEL.to_string()
            } else {
                opts.model.clone()
            },
            api_mode: opts.api_mode,
            use_json_format: opts.use_json_format,
            extra_headers: build_headers(&opts.extra_headers)?,
            timeout: Duration::from_secs(opts.timeout_seconds),
        })
    }
}

#[async_trait]
impl GenerateText for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = match self.api_mode {
            ApiMode::Responses => json!({
                "model": self.model,
                "temperature": 0.2,
                "input": prompt,
            }),
            ApiMode::ChatCompletions => {
                let mut payload = json!({
                    "model": self.model,
                    "temperature": 0.2,
                    "messages": [
                        {"role": "system", "content": "Return valid JSON only."},
                        {"role": "user", "content": prompt},
                    ],
                });
                if self.use_json_format {
                    payload["response_format"] = json!({"type": "json_object"});
                }
                payload
            }
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .headers(self.extra_headers.clone())
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?;
        response.error_for_status_ref()?;
        let data: Value = response.json().await?;

        match self.api_mode {
            ApiMode::ChatCompletions => data
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    DynlensError::Parse("chat response has no message content".to_string())
                }),
            ApiMode::Responses => {
                let text = extract_responses_text(&data);
                if text.is_empty() {
                    Err(DynlensError::Parse(
                        "responses envelope has no output text".to_string(),
                    ))
                } else {
                    Ok(text)
                }
            }
        }
    }
}

/// Client for the Gemini `generateContent` endpoint. `base_url` overrides the
/// host, which also makes the client testable against a local mock.
pub struct GeminiClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(opts: &SummaryOptions) -> Self {
        let model = if opts.model.is_empty() {
            DEFAULT_GEMINI_MODEL.to_string()
        } else {
            opts.model.clone()
        };
        let host = if opts.base_url.trim().is_empty() {
            GEMINI_HOST.to_string()
        } else {
            opts.base_url.trim().trim_end_matches('/').to_string()
        };
        Self {
            client: Client::new(),
            url: format!(
                "{host}/v1beta/models/{model}:generateContent?key={key}",
                key = opts.api_key
            ),
            timeout: Duration::from_secs(opts.timeout_seconds),
        }
    }
}

#[async_trait]
impl GenerateText for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {"temperature": 0.2},
        });

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?;
        response.error_for_status_ref()?;
        let data: Value = response.json().await?;

        data.pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DynlensError::Parse("gemini response has no text part".to_string()))
    }
}

/// Resolve the request URL for OpenAI-compatible endpoints. An explicit base
/// that already names the endpoint path is used as-is; otherwise the mode's
/// path is appended.
pub fn resolve_url(base_url: &str, mode: ApiMode) -> String {
    let path = match mode {
        ApiMode::ChatCompletions => "/chat/completions",
        ApiMode::Responses => "/responses",
    };

    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return format!("{OPENAI_HOST}{path}");
    }
    let lower = base.to_lowercase();
    if lower.ends_with("/chat/completions") || lower.ends_with("/responses") {
        return base.to_string();
    }
    format!("{base}{path}")
}

fn build_headers(extra: &std::collections::HashMap<String, String>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| DynlensError::Config(format!("invalid extra header name: {name}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| DynlensError::Config(format!("invalid extra header value for {name}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// The `responses` envelope carries text either as a convenience
/// `output_text` field or inside `output[].content[]` parts.
pub(crate) fn extract_responses_text(data: &Value) -> String {
    if let Some(text) = data.get("output_text").and_then(Value::as_str) {
        let text = text.trim();
        if !text.is_empty() {
            return text.to_string();
        }
    }

    let mut chunks: Vec<String> = Vec::new();
    for item in data
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        for part in item
            .get("content")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let ptype = part.get("type").and_then(Value::as_str).unwrap_or("");
            if matches!(ptype, "output_text" | "text") {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    let text = text.trim();
                    if !text.is_empty() {
                        chunks.push(text.to_string());
                    }
                }
            }
        }
    }
    chunks.join("\n")
}
