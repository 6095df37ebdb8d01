use crate::error::{AppError, Result};
use crate::metrics::COMMENTS_CREATED;
use crate::models::{Comment, NewComment, PostId, UserId};
use crate::repository::ContentRepository;
use std::sync::Arc;
use tracing::info;

/// Comment authoring. Comments are immutable once written.
#[derive(Clone)]
pub struct CommentService {
    repo: Arc<dyn ContentRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_comment(
        &self,
        author_id: UserId,
        post_id: PostId,
        text: &str,
    ) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("text: this field is required".to_string()));
        }

        if self.repo.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }

        let comment = self
            .repo
            .create_comment(NewComment {
                post_id,
                author_id,
                text: text.to_string(),
            })
            .await?;

        COMMENTS_CREATED.inc();
        info!(comment_id = comment.id, post_id, author_id, "Comment created");
        Ok(comment)
    }

    /// Comments of a post, oldest first
    pub async fn post_comments(&self, post_id: PostId) -> Result<Vec<Comment>> {
        if self.repo.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }
        self.repo.list_comments(post_id).await
    }
}
