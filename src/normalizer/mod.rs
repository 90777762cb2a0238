use std::collections::HashSet;

use chrono::{DateTime, Utc};
use html_escape::decode_html_entities;
use serde_json::Value;
use tracing::warn;

use crate::domain::{Post, PostKind};

/// Converts raw feed pages (untyped JSON) into [`Post`] records.
///
/// The upstream payload is treated as an untyped tree: anything that doesn't
/// fit the minimal required shape (an id, an author, a parseable publish
/// timestamp) drops that single item rather than failing the page.
#[derive(Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize one page worth of raw items. Order is preserved.
    pub fn normalize_page(&self, items: &[Value]) -> Vec<Post> {
        items
            .iter()
            .filter_map(|item| self.normalize_item(item))
            .collect()
    }

    /// Drop duplicate ids across pages, keeping the first occurrence (the
    /// feed is newest-first, so first wins).
    pub fn dedup(&self, posts: Vec<Post>) -> Vec<Post> {
        let mut seen = HashSet::new();
        posts
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect()
    }

    fn normalize_item(&self, item: &Value) -> Option<Post> {
        let id = item
            .get("id_str")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| item.get("id").map(stringify))
            .filter(|s| !s.is_empty());
        let Some(id) = id else {
            warn!("dropping feed item without an id");
            return None;
        };

        let modules = item.get("modules").cloned().unwrap_or(Value::Null);
        let author = modules.get("module_author").cloned().unwrap_or(Value::Null);
        let dynamic = modules
            .get("module_dynamic")
            .cloned()
            .unwrap_or(Value::Null);

        let creator_name = author
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let creator_id = author.get("mid").map(stringify).unwrap_or_default();

        let Some(publish_time) = extract_publish_time(item, &author) else {
            warn!("dropping feed item {id}: unparseable publish timestamp");
            return None;
        };

        let desc = text_of(dynamic.get("desc").unwrap_or(&Value::Null));
        let (major_type, major_title, major_detail) =
            extract_major(dynamic.get("major").unwrap_or(&Value::Null));
        let (add_title, add_detail) =
            extract_additional(dynamic.get("additional").unwrap_or(&Value::Null));

        let mut body_parts: Vec<String> = Vec::new();
        for part in [desc, major_detail, add_detail] {
            if !part.is_empty() && !body_parts.contains(&part) {
                body_parts.push(part);
            }
        }

        let title = if !major_title.is_empty() {
            major_title
        } else {
            add_title
        };

        Some(Post {
            url: format!("https://t.bilibili.com/{id}"),
            id,
            creator_id,
            creator_name,
            kind: PostKind::from_major_type(&major_type),
            publish_time,
            title,
            body_text: body_parts.join("\n"),
        })
    }
}

/// Upstream sends unix seconds, usually under `module_author.pub_ts`.
fn extract_publish_time(item: &Value, author: &Value) -> Option<DateTime<Utc>> {
    let ts = [author.get("pub_ts"), item.get("pub_ts")]
        .into_iter()
        .flatten()
        .find_map(as_i64)?;
    if ts <= 0 {
        return None;
    }
    DateTime::from_timestamp(ts, 0)
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Numbers and strings both appear for ids upstream; render either as text.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Best-effort text extraction from an arbitrary subtree, following the
/// upstream's assortment of text-bearing keys.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => decode_html_entities(s.trim()).to_string(),
        Value::Array(parts) => {
            let parts: Vec<String> = parts
                .iter()
                .map(text_of)
                .filter(|p| !p.is_empty())
                .collect();
            parts.join(" ")
        }
        Value::Object(map) => {
            for key in [
                "text",
                "desc",
                "summary",
                "content",
                "intro",
                "sub_title",
                "subtitle",
                "description",
            ] {
                if let Some(inner) = map.get(key) {
                    let out = text_of(inner);
                    if !out.is_empty() {
                        return out;
                    }
                }
            }
            if let Some(Value::Array(nodes)) = map.get("rich_text_nodes") {
                let parts: Vec<String> = nodes
                    .iter()
                    .filter_map(|n| {
                        let text = n.get("text").or_else(|| n.get("raw_text"))?;
                        let text = text_of(text);
                        (!text.is_empty()).then_some(text)
                    })
                    .collect();
                return parts.join(" ");
            }
            String::new()
        }
        _ => String::new(),
    }
}

const MAJOR_KEYS: [&str; 9] = [
    "archive",
    "ugc_season",
    "pgc",
    "article",
    "draw",
    "music",
    "common",
    "live",
    "opus",
];

fn extract_major(major: &Value) -> (String, String, String) {
    let major_type = major
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let (title, detail) = extract_titled(major, &MAJOR_KEYS);
    (major_type, title, detail)
}

fn extract_additional(additional: &Value) -> (String, String) {
    extract_titled(additional, &["ugc", "common", "article", "music", "live"])
}

fn extract_titled(value: &Value, keys: &[&str]) -> (String, String) {
    let mut title = String::new();
    let mut detail = String::new();
    for key in keys {
        let Some(obj) = value.get(key) else { continue };
        if title.is_empty() {
            if let Some(t) = obj.get("title").and_then(Value::as_str) {
                title = decode_html_entities(t.trim()).to_string();
            }
        }
        if detail.is_empty() {
            detail = text_of(obj);
        }
    }
    (title, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn video_item(id: &str, mid: u64, name: &str, ts: i64, title: &str) -> Value {
        json!({
            "id_str": id,
            "type": "DYNAMIC_TYPE_AV",
            "modules": {
                "module_author": {"mid": mid, "name": name, "pub_ts": ts},
                "module_dynamic": {
                    "desc": null,
                    "major": {
                        "type": "MAJOR_TYPE_ARCHIVE",
                        "archive": {"title": title, "desc": "a new upload"}
                    }
                }
            }
        })
    }

    #[test]
    fn test_normalize_video_item() {
        let n = Normalizer::new();
        let posts = n.normalize_page(&[video_item("99001", 42, "upper", 1717200000, "Ep 1")]);

        assert_eq!(posts.len(), 1);
        let p = &posts[0];
        assert_eq!(p.id, "99001");
        assert_eq!(p.creator_id, "42");
        assert_eq!(p.creator_name, "upper");
        assert_eq!(p.kind, PostKind::Video);
        assert_eq!(p.title, "Ep 1");
        assert_eq!(p.body_text, "a new upload");
        assert_eq!(p.url, "https://t.bilibili.com/99001");
        assert_eq!(p.publish_time.timestamp(), 1717200000);
    }

    #[test]
    fn test_unknown_major_type_maps_to_other() {
        let n = Normalizer::new();
        let item = json!({
            "id_str": "1",
            "modules": {
                "module_author": {"mid": 1, "name": "u", "pub_ts": 1000},
                "module_dynamic": {
                    "major": {"type": "MAJOR_TYPE_SOMETHING_NEW", "draw": {"items": []}}
                }
            }
        });
        let posts = n.normalize_page(&[item]);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].kind, PostKind::Other);
    }

    #[test]
    fn test_missing_fields_tolerated() {
        let n = Normalizer::new();
        let item = json!({
            "id_str": "2",
            "modules": {
                "module_author": {"mid": "77", "pub_ts": "2000"}
            }
        });
        let posts = n.normalize_page(&[item]);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].creator_id, "77");
        assert_eq!(posts[0].title, "");
        assert_eq!(posts[0].body_text, "");
    }

    #[test]
    fn test_bad_timestamp_drops_single_item() {
        let n = Normalizer::new();
        let good = video_item("3", 1, "u", 3000, "ok");
        let bad = json!({
            "id_str": "4",
            "modules": {"module_author": {"mid": 1, "name": "u", "pub_ts": "soon"}}
        });
        let posts = n.normalize_page(&[bad, good]);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "3");
    }

    #[test]
    fn test_rich_text_nodes_and_entities() {
        let n = Normalizer::new();
        let item = json!({
            "id_str": "5",
            "modules": {
                "module_author": {"mid": 1, "name": "u", "pub_ts": 4000},
                "module_dynamic": {
                    "desc": {"rich_text_nodes": [
                        {"text": "cats &amp; dogs"},
                        {"raw_text": "part two"}
                    ]}
                }
            }
        });
        let posts = n.normalize_page(&[item]);
        assert_eq!(posts[0].body_text, "cats & dogs part two");
    }

    #[test]
    fn test_dedup_idempotence() {
        let n = Normalizer::new();
        let page = [
            video_item("a", 1, "u", 1000, "t1"),
            video_item("b", 1, "u", 900, "t2"),
        ];

        let once = n.dedup(n.normalize_page(&page));
        let mut twice_raw = n.normalize_page(&page);
        twice_raw.extend(n.normalize_page(&page));
        let twice = n.dedup(twice_raw);

        let ids = |posts: &[Post]| posts.iter().map(|p| p.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&once), ids(&twice));
        assert_eq!(once.len(), 2);
    }
}
