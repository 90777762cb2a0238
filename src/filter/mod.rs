use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};

use crate::domain::{CreatorGroup, Post};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub time_from: Option<DateTime<Utc>>,
    pub time_to: Option<DateTime<Utc>>,
    /// Whitespace-separated terms; every term must match (AND semantics).
    pub keyword: String,
    /// When set, only posts from these creators survive.
    pub creator_ids: Option<HashSet<String>>,
    /// Group ordering by post count.
    pub sort: SortOrder,
}

/// Filter the post set and aggregate the survivors into per-creator groups.
///
/// Posts within a group are newest-first. Groups are ordered by count in the
/// requested direction, ties broken by `creator_id` ascending so the output
/// is deterministic.
pub fn apply(posts: &[Post], opts: &FilterOptions) -> Vec<CreatorGroup> {
    let terms: Vec<String> = opts
        .keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();

    let mut by_creator: BTreeMap<String, CreatorGroup> = BTreeMap::new();
    for post in posts {
        if !in_range(post.publish_time, opts.time_from, opts.time_to) {
            continue;
        }
        if !matches_keywords(post, &terms) {
            continue;
        }
        if let Some(wanted) = &opts.creator_ids {
            if !wanted.contains(&post.creator_id) {
                continue;
            }
        }

        by_creator
            .entry(post.creator_id.clone())
            .or_insert_with(|| CreatorGroup {
                creator_id: post.creator_id.clone(),
                creator_name: post.creator_name.clone(),
                posts: Vec::new(),
            })
            .posts
            .push(post.clone());
    }

    let mut groups: Vec<CreatorGroup> = by_creator.into_values().collect();
    for group in &mut groups {
        group.posts.sort_by(|a, b| b.publish_time.cmp(&a.publish_time));
    }

    groups.sort_by(|a, b| {
        let by_count = match opts.sort {
            SortOrder::Asc => a.count().cmp(&b.count()),
            SortOrder::Desc => b.count().cmp(&a.count()),
        };
        by_count.then_with(|| a.creator_id.cmp(&b.creator_id))
    });

    groups
}

fn in_range(
    ts: DateTime<Utc>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> bool {
    if let Some(from) = from {
        if ts < from {
            return false;
        }
    }
    if let Some(to) = to {
        if ts > to {
            return false;
        }
    }
    true
}

fn matches_keywords(post: &Post, terms: &[String]) -> bool {
    if terms.is_empty() {
        return true;
    }
    let haystack = format!("{} {} {}", post.title, post.body_text, post.creator_name)
        .to_lowercase();
    terms.iter().all(|term| haystack.contains(term))
}
