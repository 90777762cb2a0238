use chrono::Utc;

use crate::domain::{CreatorGroup, Provider, SummaryResult, SummarySentence};
use crate::i18n;

use super::enumerate_sources;

/// Deterministic, provider-free summary: one sentence per enumerated post
/// (newest first, capped at `max_items`), each citing exactly its own source.
/// Never fails, including for an empty group.
pub fn summarize_locally(group: &CreatorGroup, max_items: usize) -> SummaryResult {
    let sources = enumerate_sources(group, max_items);

    let sentences: Vec<SummarySentence> = sources
        .iter()
        .map(|src| SummarySentence {
            text: i18n::tf(
                "local_sentence",
                &[
                    (
                        "date",
                        src.post.publish_time.format("%Y-%m-%d").to_string(),
                    ),
                    ("kind", i18n::t(src.post.kind.label_key())),
                    ("snippet", src.snippet.clone()),
                ],
            ),
            refs: vec![src.post.id.clone()],
        })
        .collect();

    SummaryResult {
        creator_id: group.creator_id.clone(),
        source_count: sources.len(),
        sentences,
        provider_used: Provider::Local,
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Post, PostKind};
    use chrono::TimeZone;

    fn group(n: usize) -> CreatorGroup {
        let posts = (0..n)
            .map(|i| Post {
                id: format!("p{i}"),
                creator_id: "9".into(),
                creator_name: "up".into(),
                kind: PostKind::Video,
                publish_time: Utc.timestamp_opt(10_000 - i as i64, 0).unwrap(),
                title: format!("title {i}"),
                body_text: String::new(),
                url: String::new(),
            })
            .collect();
        CreatorGroup {
            creator_id: "9".into(),
            creator_name: "up".into(),
            posts,
        }
    }

    #[test]
    fn test_one_sentence_per_post_with_own_ref() {
        let result = summarize_locally(&group(3), 10);
        assert_eq!(result.provider_used, Provider::Local);
        assert_eq!(result.sentences.len(), 3);
        assert_eq!(result.source_count, 3);
        for (i, sentence) in result.sentences.iter().enumerate() {
            assert_eq!(sentence.refs, vec![format!("p{i}")]);
            assert!(sentence.text.contains(&format!("title {i}")));
        }
    }

    #[test]
    fn test_caps_at_max_items() {
        let result = summarize_locally(&group(10), 4);
        assert_eq!(result.sentences.len(), 4);
        assert_eq!(result.source_count, 4);
    }

    #[test]
    fn test_empty_group() {
        let result = summarize_locally(&group(0), 10);
        assert!(result.sentences.is_empty());
        assert_eq!(result.source_count, 0);
        assert_eq!(result.provider_used, Provider::Local);
    }
}
