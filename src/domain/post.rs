use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Broad content category of a dynamic, mapped from the upstream
/// `MAJOR_TYPE_*` discriminators. Anything unrecognized becomes `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostKind {
    Video,
    Pgc,
    Article,
    Other,
}

impl PostKind {
    pub fn from_major_type(major_type: &str) -> Self {
        match major_type {
            "MAJOR_TYPE_ARCHIVE" | "MAJOR_TYPE_UGC_SEASON" => PostKind::Video,
            "MAJOR_TYPE_PGC" => PostKind::Pgc,
            "MAJOR_TYPE_ARTICLE" => PostKind::Article,
            _ => PostKind::Other,
        }
    }

    /// Language-pack key for the human-readable label.
    pub fn label_key(&self) -> &'static str {
        match self {
            PostKind::Video => "kind_video",
            PostKind::Pgc => "kind_pgc",
            PostKind::Article => "kind_article",
            PostKind::Other => "kind_other",
        }
    }
}

/// One normalized feed item. Immutable once produced by the normalizer;
/// identity is `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub creator_id: String,
    pub creator_name: String,
    pub kind: PostKind,
    pub publish_time: DateTime<Utc>,
    pub title: String,
    pub body_text: String,
    pub url: String,
}

impl Post {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(untitled)"
        } else {
            &self.title
        }
    }

    /// Single-line excerpt of the body, truncated to at most `limit` chars.
    pub fn excerpt(&self, limit: usize) -> String {
        truncate_chars(&self.body_text.replace('\n', " "), limit)
    }
}

/// Char-boundary-safe truncation with a trailing ellipsis.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            PostKind::from_major_type("MAJOR_TYPE_ARCHIVE"),
            PostKind::Video
        );
        assert_eq!(PostKind::from_major_type("MAJOR_TYPE_PGC"), PostKind::Pgc);
        assert_eq!(
            PostKind::from_major_type("MAJOR_TYPE_ARTICLE"),
            PostKind::Article
        );
        assert_eq!(PostKind::from_major_type("MAJOR_TYPE_DRAW"), PostKind::Other);
        assert_eq!(PostKind::from_major_type(""), PostKind::Other);
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_chars("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_text() {
        let out = truncate_chars("abcdefghij", 8);
        assert_eq!(out, "abcde...");
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        // Must count chars, not bytes.
        let out = truncate_chars("你好世界你好世界你好", 8);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 8);
    }
}
