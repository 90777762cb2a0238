use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary backend. `Local` doubles as the fallback marker: any failed
/// provider call ends up producing a `Local` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "custom_openai")]
    CustomOpenAi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Local => "local",
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
            Provider::CustomOpenAi => "custom_openai",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "local" => Ok(Provider::Local),
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            "custom_openai" => Ok(Provider::CustomOpenAi),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// One summary sentence with the ids of the posts it was derived from.
/// `refs` may be empty; it never contains an id outside the source group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarySentence {
    pub text: String,
    pub refs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SummaryResult {
    pub creator_id: String,
    pub sentences: Vec<SummarySentence>,
    pub provider_used: Provider,
    pub generated_at: DateTime<Utc>,
    /// How many posts were enumerated into the prompt (after the
    /// `max_items` cap).
    pub source_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_provider_round_trip() {
        for p in [
            Provider::Local,
            Provider::OpenAi,
            Provider::Gemini,
            Provider::CustomOpenAi,
        ] {
            assert_eq!(Provider::from_str(p.as_str()).unwrap(), p);
        }
    }

    #[test]
    fn test_provider_aliases() {
        assert_eq!(Provider::from_str("").unwrap(), Provider::Local);
        assert_eq!(Provider::from_str("none").unwrap(), Provider::Local);
        assert_eq!(Provider::from_str("OpenAI").unwrap(), Provider::OpenAi);
        assert!(Provider::from_str("claude").is_err());
    }
}
