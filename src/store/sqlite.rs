use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use crate::db::models::{Post, PostChanges, User, UserChanges};
use crate::state::DbPool;
use crate::store::{
    PostFilter, PostStore, SearchCriteria, StoreError, UserStore, EMAIL_TAKEN, POST_EXISTS,
    USERNAME_TAKEN,
};

const POST_COLUMNS: &str =
    "id, title, body, image, latitude, longitude, author_id, tags, reply_to, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, image, active, pin_hash";

pub struct SqlitePostStore {
    pool: DbPool,
}

impl SqlitePostStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    let tags_json: String = row.get(7)?;
    let tags = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        image: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
        author_id: row.get(6)?,
        tags,
        reply_to: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn search_clause(criteria: &SearchCriteria) -> (String, Vec<String>) {
    if criteria.is_empty() {
        return ("1 = 1".to_string(), Vec::new());
    }

    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(title) = &criteria.title {
        clauses.push("title LIKE ? ESCAPE '\\'".to_string());
        values.push(format!("%{}%", escape_like(title)));
    }
    if let Some(body) = &criteria.body {
        clauses.push("body LIKE ? ESCAPE '\\'".to_string());
        values.push(format!("%{}%", escape_like(body)));
    }
    if let Some(author_id) = &criteria.author_id {
        clauses.push("author_id = ?".to_string());
        values.push(author_id.clone());
    }
    if !criteria.tags.is_empty() {
        let placeholders = vec!["?"; criteria.tags.len()].join(", ");
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM json_each(posts.tags) WHERE json_each.value IN ({}))",
            placeholders
        ));
        values.extend(criteria.tags.iter().cloned());
    }

    (format!("({})", clauses.join(" OR ")), values)
}

fn filter_clause(filter: &PostFilter) -> (String, Vec<String>) {
    match filter {
        PostFilter::Geotagged => (
            "latitude IS NOT NULL AND longitude IS NOT NULL".to_string(),
            Vec::new(),
        ),
        PostFilter::RepliesTo(root) => ("reply_to = ?".to_string(), vec![root.clone()]),
        PostFilter::Search(criteria) => search_clause(criteria),
    }
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn insert(&self, post: &Post) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        let tags = serde_json::to_string(&post.tags)?;

        conn.execute(
            &format!(
                "INSERT INTO posts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                POST_COLUMNS
            ),
            params![
                post.id,
                post.title,
                post.body,
                post.image,
                post.latitude,
                post.longitude,
                post.author_id,
                tags,
                post.reply_to,
                post.created_at,
                post.updated_at,
            ],
        )
        .map_err(constraint_to_conflict)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Post>, StoreError> {
        let conn = self.pool.get()?;

        let post = conn
            .query_row(
                &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
                params![id],
                post_from_row,
            )
            .optional()?;

        Ok(post)
    }

    async fn find(&self, filter: &PostFilter) -> Result<Vec<Post>, StoreError> {
        let conn = self.pool.get()?;
        let (clause, values) = filter_clause(filter);

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts WHERE {} ORDER BY rowid",
            POST_COLUMNS, clause
        ))?;
        let posts = stmt
            .query_map(params_from_iter(values.iter()), post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    async fn update(&self, id: &str, changes: &PostChanges) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(title) = &changes.title {
            sets.push("title = ?");
            values.push(Box::new(title.clone()));
        }
        if let Some(body) = &changes.body {
            sets.push("body = ?");
            values.push(Box::new(body.clone()));
        }
        if let Some(image) = &changes.image {
            sets.push("image = ?");
            values.push(Box::new(image.clone()));
        }
        if let Some(latitude) = changes.latitude {
            sets.push("latitude = ?");
            values.push(Box::new(latitude));
        }
        if let Some(longitude) = changes.longitude {
            sets.push("longitude = ?");
            values.push(Box::new(longitude));
        }
        if let Some(tags) = &changes.tags {
            sets.push("tags = ?");
            values.push(Box::new(serde_json::to_string(tags)?));
        }
        sets.push("updated_at = ?");
        values.push(Box::new(Utc::now()));
        values.push(Box::new(id.to_string()));

        let rows = conn.execute(
            &format!("UPDATE posts SET {} WHERE id = ?", sets.join(", ")),
            params_from_iter(values.iter()),
        )?;

        Ok(rows > 0)
    }

    async fn delete(&self, id: &str) -> Result<u64, StoreError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        Ok(rows as u64)
    }

    async fn delete_many(&self, filter: &PostFilter) -> Result<u64, StoreError> {
        let conn = self.pool.get()?;
        let (clause, values) = filter_clause(filter);

        let rows = conn.execute(
            &format!("DELETE FROM posts WHERE {}", clause),
            params_from_iter(values.iter()),
        )?;

        Ok(rows as u64)
    }
}

pub struct SqliteUserStore {
    pool: DbPool,
}

impl SqliteUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn find_one(&self, clause: &str, values: &[&str]) -> Result<Option<User>, StoreError> {
        let conn = self.pool.get()?;

        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE {} LIMIT 1", USER_COLUMNS, clause),
                params_from_iter(values.iter()),
                user_from_row,
            )
            .optional()?;

        Ok(user)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        image: row.get(6)?,
        active: row.get(7)?,
        pin_hash: row.get(8)?,
    })
}

/// Maps unique-constraint failures to a fixed message keyed on the column.
/// SQLite's own text names the schema and never reaches clients.
fn constraint_to_conflict(err: rusqlite::Error) -> StoreError {
    let rusqlite::Error::SqliteFailure(e, msg) = &err else {
        return StoreError::Sql(err);
    };
    if e.code != rusqlite::ErrorCode::ConstraintViolation {
        return StoreError::Sql(err);
    }

    let detail = msg.as_deref().unwrap_or_default();
    let message = if detail.contains("users.email") {
        EMAIL_TAKEN
    } else if detail.contains("users.username") {
        USERNAME_TAKEN
    } else if detail.contains("posts.id") {
        POST_EXISTS
    } else {
        tracing::warn!("Unexpected constraint violation: {}", detail);
        "record already exists"
    };
    StoreError::Conflict(message.to_string())
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let conn = self.pool.get()?;

        conn.execute(
            &format!(
                "INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                USER_COLUMNS
            ),
            params![
                user.id,
                user.username,
                user.email,
                user.password_hash,
                user.first_name,
                user.last_name,
                user.image,
                user.active,
                user.pin_hash,
            ],
        )
        .map_err(constraint_to_conflict)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.find_one("id = ?1", &[id])
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        self.find_one("username = ?1 OR email = ?1", &[login])
    }

    async fn find_conflicting(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        self.find_one("username = ?1 OR email = ?2", &[username, email])
    }

    async fn update(&self, id: &str, changes: &UserChanges) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;

        let rows = conn
            .execute(
                "UPDATE users SET
                   first_name = COALESCE(?2, first_name),
                   last_name = COALESCE(?3, last_name),
                   email = COALESCE(?4, email)
                 WHERE id = ?1",
                params![id, changes.first_name, changes.last_name, changes.email],
            )
            .map_err(constraint_to_conflict)?;

        Ok(rows > 0)
    }

    async fn activate(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "UPDATE users SET active = 1, pin_hash = NULL WHERE id = ?1",
            params![id],
        )?;

        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint_failure(detail: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
            Some(detail.to_string()),
        )
    }

    #[test]
    fn constraint_failures_get_fixed_messages() {
        let conflict = |detail| match constraint_to_conflict(constraint_failure(detail)) {
            StoreError::Conflict(msg) => msg,
            other => panic!("expected conflict, got {:?}", other),
        };
        assert_eq!(conflict("UNIQUE constraint failed: users.email"), EMAIL_TAKEN);
        assert_eq!(conflict("UNIQUE constraint failed: users.username"), USERNAME_TAKEN);
        assert_eq!(conflict("UNIQUE constraint failed: posts.id"), POST_EXISTS);
        assert_eq!(conflict("NOT NULL constraint failed: x.y"), "record already exists");
    }

    #[test]
    fn other_sqlite_errors_stay_sql_errors() {
        assert!(matches!(
            constraint_to_conflict(rusqlite::Error::InvalidQuery),
            StoreError::Sql(_)
        ));
    }

    #[test]
    fn like_patterns_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn empty_search_selects_everything() {
        let (clause, values) = search_clause(&SearchCriteria::default());
        assert_eq!(clause, "1 = 1");
        assert!(values.is_empty());
    }

    #[test]
    fn search_binds_one_value_per_tag() {
        let criteria = SearchCriteria::new(
            Some("x".into()),
            None,
            None,
            vec!["a".into(), "b".into()],
        );
        let (clause, values) = search_clause(&criteria);
        assert!(clause.contains("json_each"));
        assert_eq!(values, vec!["%x%", "a", "b"]);
    }
}
