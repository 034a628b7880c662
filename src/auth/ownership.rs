use crate::db::models::{Post, User};
use crate::error::{AppError, AppResult};
use crate::extractors::AuthUser;

/// Something that belongs to exactly one user.
pub trait Owned {
    fn owner_id(&self) -> &str;
}

impl Owned for Post {
    fn owner_id(&self) -> &str {
        &self.author_id
    }
}

/// A profile belongs to its own account.
impl Owned for User {
    fn owner_id(&self) -> &str {
        &self.id
    }
}

/// Single ownership check shared by every update/delete path.
pub fn authorize<R: Owned + ?Sized>(resource: &R, actor: &AuthUser) -> AppResult<()> {
    if resource.owner_id() == actor.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You can only modify your own content".into(),
        ))
    }
}
