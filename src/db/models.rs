use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
    pub active: bool,
    /// bcrypt hash of the pending verification PIN
    pub pin_hash: Option<String>,
}

/// A post, or a reply when `reply_to` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: Option<String>,
    pub body: String,
    pub image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub author_id: String,
    pub tags: Vec<String>,
    pub reply_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new_post(author_id: &str, title: String, body: String) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            title: Some(title),
            body,
            image: None,
            latitude: None,
            longitude: None,
            author_id: author_id.to_string(),
            tags: Vec::new(),
            reply_to: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn new_reply(author_id: &str, reply_to: &str, body: String) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            title: None,
            body,
            image: None,
            latitude: None,
            longitude: None,
            author_id: author_id.to_string(),
            tags: Vec::new(),
            reply_to: Some(reply_to.to_string()),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// `(latitude, longitude)` when both are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.reply_to.is_some()
    }
}

/// Partial update of a post. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostChanges {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub tags: Option<Vec<String>>,
}

impl PostChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.image.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.tags.is_none()
    }

    pub fn apply_to(&self, post: &mut Post, updated_at: DateTime<Utc>) {
        if let Some(title) = &self.title {
            post.title = Some(title.clone());
        }
        if let Some(body) = &self.body {
            post.body = body.clone();
        }
        if let Some(image) = &self.image {
            post.image = Some(image.clone());
        }
        if let Some(latitude) = self.latitude {
            post.latitude = Some(latitude);
        }
        if let Some(longitude) = self.longitude {
            post.longitude = Some(longitude);
        }
        if let Some(tags) = &self.tags {
            post.tags = tags.clone();
        }
        post.updated_at = Some(updated_at);
    }
}

/// Partial update of a user profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(first_name) = &self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
    }
}
