use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::authorize;
use crate::db::models::{Post, PostChanges};
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiJson, AuthUser};
use crate::routes::non_blank;
use crate::state::AppState;
use crate::threads::{self, ReplyView};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReplyRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub original_post_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateReplyRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/createreply", post(create_reply))
        .route("/posts/{id}/getreplies", get(get_replies))
        .route("/updatereply/{id}", put(update_reply))
}

async fn create_reply(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateReplyRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let (Some(body), Some(original_post_id)) = (non_blank(req.body), non_blank(req.original_post_id))
    else {
        return Err(AppError::BadRequest(
            "Not all necessary fields are present".into(),
        ));
    };

    let target = threads::reply_target(state.posts.as_ref(), &original_post_id).await?;

    let mut reply = Post::new_reply(&user.id, &target.id, body);
    reply.title = non_blank(req.title);
    reply.image = non_blank(req.image);

    state.posts.insert(&reply).await?;
    tracing::info!(reply_id = %reply.id, reply_to = %target.id, "Created reply");

    Ok((StatusCode::CREATED, Json(json!({ "postId": reply.id }))))
}

async fn get_replies(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<ReplyView>>> {
    let replies = threads::get_replies(state.posts.as_ref(), &id).await?;
    Ok(Json(replies))
}

async fn update_reply(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateReplyRequest>,
) -> AppResult<Json<Value>> {
    let changes = PostChanges {
        title: non_blank(req.title),
        body: non_blank(req.body),
        image: non_blank(req.image),
        ..Default::default()
    };
    if changes.is_empty() {
        return Err(AppError::BadRequest("No fields provided".into()));
    }

    let reply = state
        .posts
        .find_by_id(&id)
        .await?
        .filter(Post::is_reply)
        .ok_or_else(|| AppError::NotFound("Reply not found".into()))?;
    authorize(&reply, &user)?;

    if !state.posts.update(&reply.id, &changes).await? {
        return Err(AppError::NotFound("Reply not found".into()));
    }
    tracing::info!(reply_id = %reply.id, "Updated reply");

    Ok(Json(json!({ "message": "Reply updated" })))
}
