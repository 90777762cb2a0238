//! Provider-agnostic summary generation with citation mapping.
//!
//! The orchestrator builds one prompt per creator group, dispatches it to the
//! configured backend and decodes the sentence+references response. Every
//! failure path degrades to the deterministic local summarizer; a summary
//! request never fails the run.

pub mod citation;
pub mod local;
pub mod provider;

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::domain::post::truncate_chars;
use crate::domain::{CreatorGroup, Post, Provider, SummaryResult, SummarySentence};

use provider::{GeminiClient, GenerateText, OpenAiClient};

/// Request/response envelope used by OpenAI-compatible providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ApiMode {
    #[default]
    #[serde(rename = "chat_completions")]
    ChatCompletions,
    #[serde(rename = "responses")]
    Responses,
}

impl std::str::FromStr for ApiMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "chat_completions" => Ok(ApiMode::ChatCompletions),
            "responses" => Ok(ApiMode::Responses),
            other => Err(format!("unknown api mode: {other}")),
        }
    }
}

/// Full provider configuration for one summary request, passed explicitly so
/// repeated runs with different settings can't interfere.
#[derive(Debug, Clone)]
pub struct SummaryOptions {
    pub provider: Provider,
    pub api_mode: ApiMode,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub use_json_format: bool,
    pub extra_headers: HashMap<String, String>,
    pub max_items: usize,
    pub timeout_seconds: u64,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            provider: Provider::Local,
            api_mode: ApiMode::default(),
            model: String::new(),
            api_key: String::new(),
            base_url: String::new(),
            use_json_format: true,
            extra_headers: HashMap::new(),
            max_items: 80,
            timeout_seconds: 45,
        }
    }
}

/// A post as enumerated into the prompt: 1-based stable index plus the
/// single-line snippet shown to the model.
pub(crate) struct Enumerated<'a> {
    pub index: usize,
    pub post: &'a Post,
    pub snippet: String,
}

pub(crate) fn enumerate_sources(group: &CreatorGroup, max_items: usize) -> Vec<Enumerated<'_>> {
    let mut posts: Vec<&Post> = group.posts.iter().collect();
    posts.sort_by(|a, b| b.publish_time.cmp(&a.publish_time));

    posts
        .into_iter()
        .take(max_items.max(1))
        .enumerate()
        .map(|(i, post)| Enumerated {
            index: i + 1,
            snippet: snippet_of(post),
            post,
        })
        .collect()
}

fn snippet_of(post: &Post) -> String {
    let title = post.title.trim();
    let body = post.excerpt(120);
    if !title.is_empty() && !body.is_empty() {
        format!("{title} | {body}")
    } else if !title.is_empty() {
        title.to_string()
    } else if !body.is_empty() {
        body
    } else {
        "-".to_string()
    }
}

fn build_prompt(creator_name: &str, sources: &[Enumerated<'_>]) -> String {
    let lines: Vec<String> = sources
        .iter()
        .map(|src| {
            format!(
                "[{}] time={} | {}",
                src.index,
                src.post.publish_time.format("%Y-%m-%d %H:%M"),
                src.snippet
            )
        })
        .collect();

    format!(
        "You are summarizing recent feed posts from the creator \"{creator_name}\". \
         Given source posts with indices, return strict JSON only.\n\
         Required format:\n\
         {{\"summary\":[{{\"sentence\":\"...\",\"refs\":[1,2]}}]}}\n\
         Rules:\n\
         1) 3-8 concise sentences.\n\
         2) refs may only use the provided indices.\n\
         3) Keep statements factual and grounded in the sources.\n\
         4) Do not include markdown, comments, or extra fields.\n\
         Sources:\n{}",
        lines.join("\n")
    )
}

/// Summarize one creator group with the configured provider.
///
/// Infallible by contract: any provider failure (missing key, HTTP error,
/// timeout, undecodable response) falls back to the local summarizer and is
/// reported through the returned warning instead of an error.
pub async fn summarize(
    group: &CreatorGroup,
    opts: &SummaryOptions,
) -> (SummaryResult, Option<String>) {
    if opts.provider == Provider::Local || group.posts.is_empty() {
        return (local::summarize_locally(group, opts.max_items), None);
    }

    match generate_remote(group, opts).await {
        Ok(result) => (result, None),
        Err(reason) => {
            warn!(provider = %opts.provider, %reason, "summary provider failed, using local fallback");
            let warning = format!(
                "summary provider '{}' failed: {reason}; used local fallback",
                opts.provider
            );
            (local::summarize_locally(group, opts.max_items), Some(warning))
        }
    }
}

async fn generate_remote(
    group: &CreatorGroup,
    opts: &SummaryOptions,
) -> Result<SummaryResult, String> {
    if opts.api_key.trim().is_empty() {
        return Err("missing API key".to_string());
    }
    if opts.provider == Provider::CustomOpenAi && opts.base_url.trim().is_empty() {
        return Err("missing base_url for custom_openai".to_string());
    }

    let sources = enumerate_sources(group, opts.max_items);
    let prompt = build_prompt(&group.creator_name, &sources);

    let client: Box<dyn GenerateText> = match opts.provider {
        Provider::OpenAi | Provider::CustomOpenAi => {
            Box::new(OpenAiClient::new(opts).map_err(|e| redact(&e.to_string(), opts))?)
        }
        Provider::Gemini => Box::new(GeminiClient::new(opts)),
        Provider::Local => unreachable!("local provider handled by the caller"),
    };

    let raw = client
        .generate(&prompt)
        .await
        .map_err(|e| redact(&e.to_string(), opts))?;

    let rows = decode_summary(&raw)
        .ok_or_else(|| format!("unparseable response: {}", redact(&raw, opts)))?;

    let enumerated: Vec<&Post> = sources.iter().map(|s| s.post).collect();
    let sentences: Vec<SummarySentence> = rows
        .into_iter()
        .map(|row| SummarySentence {
            refs: citation::resolve(&row.refs, &enumerated),
            text: row.sentence,
        })
        .collect();

    Ok(SummaryResult {
        creator_id: group.creator_id.clone(),
        sentences,
        provider_used: opts.provider,
        generated_at: Utc::now(),
        source_count: sources.len(),
    })
}

/// Keep provider errors loggable: strip the API key and cap the length.
fn redact(text: &str, opts: &SummaryOptions) -> String {
    let mut text = text.to_string();
    if !opts.api_key.is_empty() {
        text = text.replace(&opts.api_key, "***");
    }
    truncate_chars(&text, 300)
}

struct RawSentence {
    sentence: String,
    refs: Vec<i64>,
}

/// Decode a provider reply into sentence rows. Tries the raw text as JSON,
/// then a fenced code block, then the outermost brace span. Returns None
/// when nothing yields at least one well-formed sentence; the caller treats
/// that as a provider failure.
fn decode_summary(raw: &str) -> Option<Vec<RawSentence>> {
    let value = parse_json_candidates(raw)?;
    let rows = value.get("summary")?.as_array()?;

    let sentences: Vec<RawSentence> = rows
        .iter()
        .filter_map(|row| {
            let sentence = row.get("sentence")?.as_str()?.trim().to_string();
            if sentence.is_empty() {
                return None;
            }
            let refs = row
                .get("refs")
                .and_then(Value::as_array)
                .map(|refs| refs.iter().filter_map(Value::as_i64).collect())
                .unwrap_or_default();
            Some(RawSentence { sentence, refs })
        })
        .collect();

    (!sentences.is_empty()).then_some(sentences)
}

fn parse_json_candidates(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if let Ok(value) = serde_json::from_str(raw) {
        return Some(value);
    }
    if let Some(block) = fenced_block(raw) {
        if let Ok(value) = serde_json::from_str(&block) {
            return Some(value);
        }
    }
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&raw[start..=end]) {
                return Some(value);
            }
        }
    }
    None
}

fn fenced_block(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let rest = &text[start + 3..];
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let end = rest.find("```")?;
    Some(rest[..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PostKind;
    use chrono::TimeZone;

    fn group(n: usize) -> CreatorGroup {
        let posts = (0..n)
            .map(|i| Post {
                id: format!("p{i}"),
                creator_id: "7".into(),
                creator_name: "upper".into(),
                kind: PostKind::Video,
                publish_time: Utc.timestamp_opt(50_000 - i as i64 * 60, 0).unwrap(),
                title: format!("title {i}"),
                body_text: "body".into(),
                url: String::new(),
            })
            .collect();
        CreatorGroup {
            creator_id: "7".into(),
            creator_name: "upper".into(),
            posts,
        }
    }

    #[test]
    fn test_enumerate_caps_and_orders_newest_first() {
        let g = group(5);
        let sources = enumerate_sources(&g, 3);
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].index, 1);
        assert_eq!(sources[0].post.id, "p0");
        assert!(sources[0].post.publish_time > sources[2].post.publish_time);
    }

    #[test]
    fn test_prompt_contains_indices_and_snippets() {
        let g = group(2);
        let sources = enumerate_sources(&g, 10);
        let prompt = build_prompt(&g.creator_name, &sources);
        assert!(prompt.contains("[1]"));
        assert!(prompt.contains("[2]"));
        assert!(prompt.contains("title 0 | body"));
        assert!(prompt.contains("upper"));
    }

    #[test]
    fn test_decode_strict_json() {
        let rows = decode_summary(r#"{"summary":[{"sentence":"s1","refs":[1,2]}]}"#).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sentence, "s1");
        assert_eq!(rows[0].refs, vec![1, 2]);
    }

    #[test]
    fn test_decode_fenced_json() {
        let raw = "Here you go:\n```json\n{\"summary\":[{\"sentence\":\"s\",\"refs\":[1]}]}\n```";
        assert_eq!(decode_summary(raw).unwrap().len(), 1);
    }

    #[test]
    fn test_decode_embedded_object() {
        let raw = "noise {\"summary\":[{\"sentence\":\"s\",\"refs\":[]}]} trailing";
        let rows = decode_summary(raw).unwrap();
        assert!(rows[0].refs.is_empty());
    }

    #[test]
    fn test_decode_keeps_sentences_without_refs() {
        let rows =
            decode_summary(r#"{"summary":[{"sentence":"no refs"},{"sentence":"x","refs":[1]}]}"#)
                .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].refs.is_empty());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_summary("total nonsense").is_none());
        assert!(decode_summary(r#"{"other": 1}"#).is_none());
        assert!(decode_summary(r#"{"summary": "not a list"}"#).is_none());
        assert!(decode_summary(r#"{"summary": []}"#).is_none());
        assert!(decode_summary(r#"{"summary":[{"refs":[1]}]}"#).is_none());
    }

    #[tokio::test]
    async fn test_missing_api_key_falls_back() {
        let opts = SummaryOptions {
            provider: Provider::OpenAi,
            ..Default::default()
        };
        let (result, warning) = summarize(&group(2), &opts).await;
        assert_eq!(result.provider_used, Provider::Local);
        assert_eq!(result.sentences.len(), 2);
        assert!(warning.unwrap().contains("missing API key"));
    }

    #[tokio::test]
    async fn test_custom_openai_requires_base_url() {
        let opts = SummaryOptions {
            provider: Provider::CustomOpenAi,
            api_key: "k".into(),
            ..Default::default()
        };
        let (result, warning) = summarize(&group(1), &opts).await;
        assert_eq!(result.provider_used, Provider::Local);
        assert!(warning.unwrap().contains("base_url"));
    }

    #[tokio::test]
    async fn test_empty_group_is_quietly_local() {
        let opts = SummaryOptions {
            provider: Provider::OpenAi,
            api_key: "k".into(),
            ..Default::default()
        };
        let (result, warning) = summarize(&group(0), &opts).await;
        assert_eq!(result.provider_used, Provider::Local);
        assert!(result.sentences.is_empty());
        assert!(warning.is_none());
    }

    #[test]
    fn test_redact_hides_api_key() {
        let opts = SummaryOptions {
            api_key: "sk-secret".into(),
            ..Default::default()
        };
        let out = redact("error calling https://x/?key=sk-secret now", &opts);
        assert!(!out.contains("sk-secret"));
        assert!(out.contains("***"));
    }
}
