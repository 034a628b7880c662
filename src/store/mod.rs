// Storage seam - handlers only see these traits, never a concrete backend
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::db::models::{Post, PostChanges, User, UserChanges};

pub use memory::InMemoryStore;
pub use sqlite::{SqlitePostStore, SqliteUserStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Client-facing conflict messages, shared by every backend.
pub const USERNAME_TAKEN: &str = "username already exists";
pub const EMAIL_TAKEN: &str = "email has already been registered to an account";
pub const POST_EXISTS: &str = "post already exists";

/// Text/author/tag search. A post matches when any given criterion matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    pub title: Option<String>,
    pub body: Option<String>,
    pub author_id: Option<String>,
    pub tags: Vec<String>,
}

impl SearchCriteria {
    /// Blank text criteria are dropped; text is trimmed.
    pub fn new(
        title: Option<String>,
        body: Option<String>,
        author_id: Option<String>,
        tags: Vec<String>,
    ) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            title: clean(title),
            body: clean(body),
            author_id: clean(author_id),
            tags: tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.author_id.is_none()
            && self.tags.is_empty()
    }

    pub fn matches(&self, post: &Post) -> bool {
        if self.is_empty() {
            return true;
        }

        let title_hit = match (&self.title, &post.title) {
            (Some(needle), Some(title)) => contains_ignore_case(title, needle),
            _ => false,
        };
        let body_hit = self
            .body
            .as_deref()
            .is_some_and(|needle| contains_ignore_case(&post.body, needle));
        let author_hit = self.author_id.as_deref() == Some(post.author_id.as_str());
        let tag_hit = post.tags.iter().any(|tag| self.tags.contains(tag));

        title_hit || body_hit || author_hit || tag_hit
    }
}

// ASCII-only folding, the same as SQLite's LIKE
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostFilter {
    /// Posts carrying both latitude and longitude
    Geotagged,
    /// Direct replies to the given post id
    RepliesTo(String),
    Search(SearchCriteria),
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            PostFilter::Geotagged => post.coordinates().is_some(),
            PostFilter::RepliesTo(root) => post.reply_to.as_deref() == Some(root.as_str()),
            PostFilter::Search(criteria) => criteria.matches(post),
        }
    }
}

/// Post collection. `find` returns documents in insertion order.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert(&self, post: &Post) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Post>, StoreError>;

    async fn find(&self, filter: &PostFilter) -> Result<Vec<Post>, StoreError>;

    /// Returns false when no post has this id.
    async fn update(&self, id: &str, changes: &PostChanges) -> Result<bool, StoreError>;

    /// Returns the number of deleted posts (0 or 1).
    async fn delete(&self, id: &str) -> Result<u64, StoreError>;

    async fn delete_many(&self, filter: &PostFilter) -> Result<u64, StoreError>;
}

/// User collection. Username and email are unique; inserting a duplicate
/// yields `StoreError::Conflict`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Look a user up by username or email.
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError>;

    /// First user holding either the username or the email.
    async fn find_conflicting(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn update(&self, id: &str, changes: &UserChanges) -> Result<bool, StoreError>;

    /// Mark the user active and drop any pending PIN.
    async fn activate(&self, id: &str) -> Result<bool, StoreError>;
}

pub type DynPostStore = Arc<dyn PostStore>;
pub type DynUserStore = Arc<dyn UserStore>;
