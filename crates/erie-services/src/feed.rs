//! # Feed
//!
//! Posts, reels, likes and comments. Author name, handle and avatar are
//! copied onto the post when it is published.

use erie_core::validation;
use erie_core::{
    new_id, AppError, MediaType, Post, PostComment, PostKind, Result, User, ValidationError,
};
use tracing::{debug, info};

use crate::context::AppContext;

/// Attached media, usually a data URL.
#[derive(Debug, Clone)]
pub struct Media {
    pub url: String,
    pub media_type: MediaType,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub content: String,
    pub media: Option<Media>,
    pub kind: PostKind,
}

async fn author(ctx: &AppContext, user_id: &str) -> Result<User> {
    ctx.store
        .users()
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", user_id))
}

/// A post needs text or media; a reel needs media.
pub async fn publish(ctx: &AppContext, author_id: &str, post: NewPost) -> Result<Post> {
    let content = post.content.trim().to_string();
    let media = post.media.filter(|m| !m.url.trim().is_empty());
    match (&post.kind, &media) {
        (PostKind::Reel, None) => return Err(ValidationError::EmptyContent("reel media").into()),
        (PostKind::Feed, None) if content.is_empty() => {
            return Err(ValidationError::EmptyContent("post").into())
        }
        _ => {}
    }

    let author = author(ctx, author_id).await?;
    let post = Post {
        id: new_id(),
        user_id: author.id,
        user_name: author.name,
        user_username: author.username,
        user_avatar: author.avatar,
        content,
        media_url: media.as_ref().map(|m| m.url.clone()),
        media_type: media.map(|m| m.media_type),
        likes: Vec::new(),
        comments: Vec::new(),
        timestamp: ctx.clock.now(),
        kind: post.kind,
    };
    ctx.store.posts().upsert(post.clone()).await?;
    info!(post_id = %post.id, author_id, kind = ?post.kind, "post published");
    Ok(post)
}

/// Adds the like if absent, removes it otherwise.
pub async fn toggle_like(ctx: &AppContext, post_id: &str, user_id: &str) -> Result<Post> {
    let post = ctx
        .store
        .posts()
        .update(post_id, |post| {
            match post.likes.iter().position(|id| id == user_id) {
                Some(i) => {
                    post.likes.remove(i);
                }
                None => post.likes.push(user_id.to_string()),
            }
        })
        .await?
        .ok_or_else(|| AppError::not_found("Post", post_id))?;
    debug!(post_id, user_id, likes = post.likes.len(), "like toggled");
    Ok(post)
}

pub async fn add_comment(
    ctx: &AppContext,
    post_id: &str,
    author_id: &str,
    content: &str,
) -> Result<PostComment> {
    let content = validation::validate_content("comment", content)?;
    let author = author(ctx, author_id).await?;
    let comment = PostComment {
        id: new_id(),
        user_id: author.id,
        user_name: author.name,
        content,
        timestamp: ctx.clock.now(),
    };
    let appended = comment.clone();
    ctx.store
        .posts()
        .update(post_id, move |post| post.comments.push(appended))
        .await?
        .ok_or_else(|| AppError::not_found("Post", post_id))?;
    Ok(comment)
}

/// Posts of one kind, newest first.
pub async fn list(ctx: &AppContext, kind: PostKind) -> Result<Vec<Post>> {
    let mut posts = ctx.store.posts().find_by(|p| p.kind == kind).await?;
    posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(posts)
}

/// Everything one user published, newest first.
pub async fn posts_by(ctx: &AppContext, user_id: &str) -> Result<Vec<Post>> {
    let mut posts = ctx.store.posts().find_by(|p| p.user_id == user_id).await?;
    posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(posts)
}
