use chrono::{DateTime, Utc};

use crate::domain::Post;

/// All filtered posts belonging to one creator, newest first. Recomputed on
/// every filter pass, never persisted.
#[derive(Debug, Clone)]
pub struct CreatorGroup {
    pub creator_id: String,
    pub creator_name: String,
    pub posts: Vec<Post>,
}

impl CreatorGroup {
    pub fn count(&self) -> usize {
        self.posts.len()
    }

    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.posts.first().map(|p| p.publish_time)
    }
}
