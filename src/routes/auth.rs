use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::pin::{generate_pin, verify_pin};
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiJson, AuthUser};
use crate::routes::{is_valid_email, non_blank};
use crate::state::AppState;
use crate::store::{EMAIL_TAKEN, USERNAME_TAKEN};

// --- Requests / responses ---

#[derive(Deserialize)]
pub struct LoginRequest {
    pub login: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

#[derive(Deserialize)]
pub struct CompleteRegistrationRequest {
    pub pin: Option<String>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/authenticate", get(authenticate))
        .route("/registeruser", post(register_user))
        .route("/initialregisteruser", post(initial_register_user))
        .route("/completeregisteruser/{id}", post(complete_register_user))
}

// --- Handlers ---

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (Some(login), Some(password)) = (non_blank(req.login), req.password) else {
        return Err(AppError::BadRequest(
            "Not all login fields were filled in".into(),
        ));
    };
    if password.is_empty() {
        return Err(AppError::BadRequest(
            "Not all login fields were filled in".into(),
        ));
    }

    let user = state
        .users
        .find_by_login(&login)
        .await?
        .ok_or_else(|| AppError::InvalidCredentials("Invalid credentials".into()))?;

    if !verify_password(&password, &user.password_hash) {
        return Err(AppError::InvalidCredentials("Invalid credentials".into()));
    }
    if !user.active {
        return Err(AppError::InvalidCredentials(
            "Account has not been verified".into(),
        ));
    }

    let token = state.tokens.issue(&user)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
        email: user.email,
    }))
}

async fn authenticate(user: AuthUser) -> Json<Value> {
    Json(json!({
        "message": "Successfully authenticated",
        "userId": user.id,
    }))
}

async fn register_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let user = new_account(&state, req, false).await?;
    state.users.insert(&user).await?;
    tracing::info!(user_id = %user.id, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "userId": user.id,
        })),
    ))
}

/// First step of the PIN flow: send the PIN, then store the inactive account.
/// A failed delivery leaves nothing behind, so the same username and email
/// can be retried.
async fn initial_register_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let mut user = new_account(&state, req, true).await?;

    let (pin, pin_hash) = generate_pin(state.config.auth.bcrypt_cost)?;
    user.pin_hash = Some(pin_hash);

    state
        .pins
        .deliver(&user, &pin)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to deliver verification PIN: {}", e)))?;

    state.users.insert(&user).await?;
    tracing::info!(user_id = %user.id, "Registration pending PIN verification");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Verification PIN sent",
            "userId": user.id,
        })),
    ))
}

async fn complete_register_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CompleteRegistrationRequest>,
) -> AppResult<Json<Value>> {
    let user = state
        .users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if user.active {
        return Err(AppError::Conflict("Registration already completed".into()));
    }

    // Accounts that never had a PIN issued activate without one
    if let Some(pin_hash) = &user.pin_hash {
        let pin = non_blank(req.pin).ok_or_else(|| AppError::BadRequest("PIN is required".into()))?;
        if !verify_pin(&pin, pin_hash) {
            return Err(AppError::BadRequest("Incorrect PIN".into()));
        }
    }

    if !state.users.activate(&user.id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    tracing::info!(user_id = %user.id, "Registration completed");

    Ok(Json(json!({ "message": "Registration complete" })))
}

/// Validates a registration request and checks uniqueness. The returned user
/// is not stored yet.
async fn new_account(state: &AppState, req: RegisterRequest, pending: bool) -> AppResult<User> {
    let (Some(username), Some(password), Some(first_name), Some(last_name), Some(email)) = (
        non_blank(req.username),
        req.password.filter(|p| !p.is_empty()),
        non_blank(req.first_name),
        non_blank(req.last_name),
        non_blank(req.email),
    ) else {
        return Err(AppError::BadRequest("Missing some register fields".into()));
    };

    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("Email format is invalid".into()));
    }

    if let Some(existing) = state.users.find_conflicting(&username, &email).await? {
        let message = if existing.username == username {
            USERNAME_TAKEN
        } else {
            EMAIL_TAKEN
        };
        return Err(AppError::Conflict(message.into()));
    }

    let password_hash = hash_password(&password, state.config.auth.bcrypt_cost)?;

    Ok(User {
        id: uuid::Uuid::now_v7().to_string(),
        username,
        email,
        password_hash,
        first_name,
        last_name,
        image: non_blank(req.image),
        active: !pending,
        pin_hash: None,
    })
}
