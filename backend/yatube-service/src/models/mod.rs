/// Data models for yatube-service
///
/// This module defines structures for:
/// - User: registered account, author of posts and comments
/// - Group: topical category a post may belong to
/// - Post: text entry with optional group and image
/// - Comment: immutable reply attached to a post
/// - Follow: directed edge between two users
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type UserId = i64;
pub type GroupId = i64;
pub type PostId = i64;
pub type CommentId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: GroupId,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: PostId,
    pub text: String,
    /// Media key relative to the media root, e.g. `posts/<uuid>.png`
    pub image: Option<String>,
    pub author_id: UserId,
    pub group_id: Option<GroupId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Follow {
    pub follower_id: UserId,
    pub followee_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for users. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// Validated insert payload for posts
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: UserId,
    pub text: String,
    pub group_id: Option<GroupId>,
    pub image: Option<String>,
}

/// Validated overwrite of an existing post.
///
/// `image: None` keeps the stored image.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<GroupId>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: PostId,
    pub author_id: UserId,
    pub text: String,
}

/// Which posts a listing is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(GroupId),
    Author(UserId),
    /// Posts whose author is followed by the given user
    FollowedBy(UserId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FollowStats {
    pub followers: i64,
    pub following: i64,
}
