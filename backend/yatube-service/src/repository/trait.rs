use crate::error::Result;
use crate::models::{
    Comment, FollowStats, Group, GroupId, NewComment, NewGroup, NewPost, NewUser, Post,
    PostChanges, PostFilter, PostId, User, UserId,
};

/// Persistence interface for all Yatube entities.
/// Both PostgresContentRepository and MemoryContentRepository implement this.
///
/// Listings are always ordered newest first (`created_at DESC, id DESC`).
#[async_trait::async_trait]
pub trait ContentRepository: Send + Sync {
    // ============= Users =============

    /// Insert a user; `Conflict` when the username is taken
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    // ============= Groups =============

    /// Insert a group; `Conflict` when the slug is taken
    async fn create_group(&self, group: NewGroup) -> Result<Group>;

    async fn get_group(&self, group_id: GroupId) -> Result<Option<Group>>;

    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>>;

    // ============= Posts =============

    async fn create_post(&self, post: NewPost) -> Result<Post>;

    async fn get_post(&self, post_id: PostId) -> Result<Option<Post>>;

    /// Overwrite a post atomically, only if it is still authored by `author_id`.
    /// Returns None when no such post exists.
    async fn update_post(
        &self,
        post_id: PostId,
        author_id: UserId,
        changes: PostChanges,
    ) -> Result<Option<Post>>;

    /// Delete a post (and its comments) authored by `author_id`.
    /// Returns true if a row was removed.
    async fn delete_post(&self, post_id: PostId, author_id: UserId) -> Result<bool>;

    /// One page of posts plus the total number of posts matching the filter
    /// Returns: (posts, total_count)
    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Post>, i64)>;

    // ============= Comments =============

    async fn create_comment(&self, comment: NewComment) -> Result<Comment>;

    /// Comments of a post, oldest first
    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>>;

    // ============= Follow graph =============

    /// Idempotent insert; returns true if a new edge was written
    async fn create_follow(&self, follower_id: UserId, followee_id: UserId) -> Result<bool>;

    /// Idempotent delete; returns true if an edge was removed
    async fn delete_follow(&self, follower_id: UserId, followee_id: UserId) -> Result<bool>;

    async fn is_following(&self, follower_id: UserId, followee_id: UserId) -> Result<bool>;

    async fn follow_stats(&self, user_id: UserId) -> Result<FollowStats>;

    /// Health check (optional)
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
