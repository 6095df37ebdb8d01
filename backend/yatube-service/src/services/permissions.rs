/// Ownership checks for authored content
///
/// Every mutation of a post goes through these helpers so the rule
/// "only the author may change a post" lives in one place.
use crate::error::{AppError, Result};
use crate::models::{Post, UserId};

/// Check if a user authored a post
pub fn ensure_post_author(user_id: UserId, post: &Post) -> Result<()> {
    if post.author_id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You don't have permission to modify this post".to_string(),
        ))
    }
}

/// Only the author can update their own posts
pub fn check_post_update(user_id: UserId, post: &Post) -> Result<()> {
    ensure_post_author(user_id, post)
}

/// Only the author can delete their own posts
pub fn check_post_deletion(user_id: UserId, post: &Post) -> Result<()> {
    ensure_post_author(user_id, post)
}
