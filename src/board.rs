use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of what a viewer sees: the signed-in user (if any) and one discussion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    #[serde(default)]
    pub current_user: Option<User>,
    pub discussion: Discussion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub created_user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub html_content: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discussion {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub posts: Vec<Post>,
}

impl Discussion {
    pub fn post(&self, post_id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    /// Index of the post within the discussion's sequence.
    pub fn position(&self, post_id: &str) -> Option<usize> {
        self.posts.iter().position(|p| p.id == post_id)
    }

    pub fn is_first_post(&self, post_id: &str) -> bool {
        self.position(post_id) == Some(0)
    }

    /// Drops the post from the local sequence. Returns the removed post, if it was present.
    pub fn remove_post(&mut self, post_id: &str) -> Option<Post> {
        let idx = self.position(post_id)?;
        Some(self.posts.remove(idx))
    }
}
