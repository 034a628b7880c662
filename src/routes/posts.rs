use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::authorize;
use crate::db::models::{Post, PostChanges};
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiJson, AuthUser};
use crate::geo::{filter_nearby, FeatureCollection, ProximityQuery};
use crate::routes::{check_location, clean_tags, non_blank};
use crate::state::AppState;
use crate::store::{PostFilter, SearchCriteria};
use crate::threads;

// --- View structs ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub title: Option<String>,
    pub body: String,
    pub image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub author_id: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            body: post.body,
            image: post.image,
            latitude: post.latitude,
            longitude: post.longitude,
            author_id: post.author_id,
            tags: post.tags,
            reply_to: post.reply_to,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

// --- Requests ---

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPostsRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub author_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct LocalPostsRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance: Option<f64>,
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub tags: Option<Vec<String>>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/createpost", post(create_post))
        .route("/searchposts", post(search_posts))
        .route("/getlocalposts", post(local_posts))
        .route("/getpins", get(pins))
        .route("/posts/{id}", get(get_post))
        .route("/updatepost/{id}", put(update_post))
        .route("/deletepost/{id}", delete(delete_post))
}

// --- Handlers ---

async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let (Some(title), Some(body)) = (non_blank(req.title), non_blank(req.body)) else {
        return Err(AppError::BadRequest(
            "Not all necessary fields are present".into(),
        ));
    };
    check_location(req.latitude, req.longitude)?;

    let mut post = Post::new_post(&user.id, title, body);
    post.image = non_blank(req.image);
    post.latitude = req.latitude;
    post.longitude = req.longitude;
    post.tags = clean_tags(req.tags);

    state.posts.insert(&post).await?;
    tracing::info!(post_id = %post.id, author_id = %user.id, "Created post");

    Ok((StatusCode::CREATED, Json(json!({ "postId": post.id }))))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PostView>> {
    let post = state
        .posts
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".into()))?;

    Ok(Json(post.into()))
}

async fn search_posts(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SearchPostsRequest>,
) -> AppResult<Json<Vec<PostView>>> {
    let criteria = SearchCriteria::new(req.title, req.body, req.author_id, req.tags);
    let posts = state.posts.find(&PostFilter::Search(criteria)).await?;

    Ok(Json(posts.into_iter().map(PostView::from).collect()))
}

/// Geo-tagged posts within `distance` of the query point, newest first.
async fn local_posts(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LocalPostsRequest>,
) -> AppResult<Json<Vec<PostView>>> {
    let (Some(latitude), Some(longitude), Some(distance)) =
        (req.latitude, req.longitude, req.distance)
    else {
        return Err(AppError::BadRequest(
            "Not all necessary fields are present".into(),
        ));
    };
    let query = ProximityQuery::new(latitude, longitude, distance)?;

    let candidates = state.posts.find(&PostFilter::Geotagged).await?;
    let nearby = filter_nearby(candidates, &query);

    Ok(Json(nearby.into_iter().rev().map(PostView::from).collect()))
}

async fn pins(State(state): State<AppState>) -> AppResult<Json<FeatureCollection>> {
    let posts = state.posts.find(&PostFilter::Geotagged).await?;
    Ok(Json(FeatureCollection::from_posts(&posts)))
}

async fn update_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePostRequest>,
) -> AppResult<Json<Value>> {
    let changes = PostChanges {
        title: non_blank(req.title),
        body: non_blank(req.body),
        image: non_blank(req.image),
        latitude: req.latitude,
        longitude: req.longitude,
        tags: req.tags.map(clean_tags),
    };
    if changes.is_empty() {
        return Err(AppError::BadRequest("No fields provided".into()));
    }

    let post = state
        .posts
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".into()))?;
    authorize(&post, &user)?;

    // The stored location must stay a complete pair after the update
    check_location(
        changes.latitude.or(post.latitude),
        changes.longitude.or(post.longitude),
    )?;

    if !state.posts.update(&post.id, &changes).await? {
        return Err(AppError::NotFound("Post not found".into()));
    }
    tracing::info!(post_id = %post.id, "Updated post");

    Ok(Json(json!({ "message": "Post updated" })))
}

async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let post = state
        .posts
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".into()))?;
    authorize(&post, &user)?;

    threads::delete_thread(state.posts.as_ref(), &post).await?;

    Ok(StatusCode::NO_CONTENT)
}
