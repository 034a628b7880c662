use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::authorize;
use crate::db::models::{User, UserChanges};
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiJson, AuthUser};
use crate::routes::{is_valid_email, non_blank};
use crate::state::AppState;
use crate::store::EMAIL_TAKEN;

// --- View structs ---

/// Public profile; never carries the password or PIN hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
    pub active: bool,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            image: user.image,
            active: user.active,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/{id}", get(get_user).put(update_user))
        .route("/updateuser/{id}", put(update_user))
}

// --- Handlers ---

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserView>> {
    let user = state
        .users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(user.into()))
}

async fn update_user(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<Value>> {
    let changes = UserChanges {
        first_name: non_blank(req.first_name),
        last_name: non_blank(req.last_name),
        email: non_blank(req.email),
    };

    if changes.is_empty() {
        return Err(AppError::BadRequest(
            "Provide at least one field to update".into(),
        ));
    }
    if let Some(email) = &changes.email {
        if !is_valid_email(email) {
            return Err(AppError::BadRequest("Email format is invalid".into()));
        }
    }

    let user = state
        .users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    authorize(&user, &actor)?;

    if let Some(email) = &changes.email {
        let taken = state
            .users
            .find_by_login(email)
            .await?
            .is_some_and(|holder| holder.id != user.id && &holder.email == email);
        if taken {
            return Err(AppError::Conflict(EMAIL_TAKEN.into()));
        }
    }

    if !state.users.update(&user.id, &changes).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    tracing::info!(user_id = %user.id, "Updated user profile");

    Ok(Json(json!({ "message": "User updated" })))
}
