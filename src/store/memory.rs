use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::db::models::{Post, PostChanges, User, UserChanges};
use crate::store::{
    PostFilter, PostStore, StoreError, UserStore, EMAIL_TAKEN, POST_EXISTS, USERNAME_TAKEN,
};

/// Process-local store backing both collections. Vector order is insertion
/// order.
#[derive(Default)]
pub struct InMemoryStore {
    posts: RwLock<Vec<Post>>,
    users: RwLock<Vec<User>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn insert(&self, post: &Post) -> Result<(), StoreError> {
        let mut posts = self.posts.write().await;
        if posts.iter().any(|p| p.id == post.id) {
            return Err(StoreError::Conflict(POST_EXISTS.into()));
        }
        posts.push(post.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Post>, StoreError> {
        let posts = self.posts.read().await;
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn find(&self, filter: &PostFilter) -> Result<Vec<Post>, StoreError> {
        let posts = self.posts.read().await;
        Ok(posts.iter().filter(|p| filter.matches(p)).cloned().collect())
    }

    async fn update(&self, id: &str, changes: &PostChanges) -> Result<bool, StoreError> {
        let mut posts = self.posts.write().await;
        match posts.iter_mut().find(|p| p.id == id) {
            Some(post) => {
                changes.apply_to(post, Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<u64, StoreError> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        Ok((before - posts.len()) as u64)
    }

    async fn delete_many(&self, filter: &PostFilter) -> Result<u64, StoreError> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|p| !filter.matches(p));
        Ok((before - posts.len()) as u64)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(USERNAME_TAKEN.into()));
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(EMAIL_TAKEN.into()));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.username == login || u.email == login)
            .cloned())
    }

    async fn find_conflicting(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn update(&self, id: &str, changes: &UserChanges) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;

        if let Some(email) = &changes.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Conflict(EMAIL_TAKEN.into()));
            }
        }

        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                changes.apply_to(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn activate(&self, id: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.active = true;
                user.pin_hash = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
