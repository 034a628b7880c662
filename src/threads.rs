// Reply threads: one level of replies hanging off a top-level post
use serde::Serialize;

use crate::db::models::Post;
use crate::error::{AppError, AppResult};
use crate::store::{PostFilter, PostStore};

/// Reduced projection of a reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    pub id: String,
    pub author_id: String,
    pub body: String,
    pub image: Option<String>,
}

impl From<Post> for ReplyView {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            author_id: post.author_id,
            body: post.body,
            image: post.image,
        }
    }
}

/// Replies to `root_id` in creation order. Fails with NotFound, without
/// reading any replies, when the root does not exist.
pub async fn get_replies(posts: &dyn PostStore, root_id: &str) -> AppResult<Vec<ReplyView>> {
    if posts.find_by_id(root_id).await?.is_none() {
        return Err(AppError::NotFound("Post not found".into()));
    }

    let replies = posts
        .find(&PostFilter::RepliesTo(root_id.to_string()))
        .await?;

    Ok(replies.into_iter().map(ReplyView::from).collect())
}

/// Deletes the direct replies of `root` and then `root` itself, returning
/// how many documents were removed. Not transactional: if the second step
/// fails the replies stay deleted.
pub async fn delete_thread(posts: &dyn PostStore, root: &Post) -> AppResult<u64> {
    let replies = posts
        .delete_many(&PostFilter::RepliesTo(root.id.clone()))
        .await?;

    let deleted = posts.delete(&root.id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound(
            "Could not delete - post does not exist".into(),
        ));
    }

    tracing::info!(post_id = %root.id, replies, "Deleted post thread");
    Ok(replies + deleted)
}

/// Resolves the target of a new reply. Only top-level posts can be replied to.
pub async fn reply_target(posts: &dyn PostStore, target_id: &str) -> AppResult<Post> {
    let target = posts
        .find_by_id(target_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Original post does not exist".into()))?;

    if target.is_reply() {
        return Err(AppError::BadRequest(
            "Replies can only be made to top-level posts".into(),
        ));
    }

    Ok(target)
}
