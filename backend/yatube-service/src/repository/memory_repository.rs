//! Process-local repository
//!
//! Mirrors the PostgreSQL schema rules (unique usernames and slugs, foreign
//! keys, unique follow pairs, cascading comment deletes) behind one lock so
//! every operation is atomic. Used for local development and tests.

use super::ContentRepository;
use crate::error::{AppError, Result};
use crate::models::{
    Comment, CommentId, Follow, FollowStats, Group, GroupId, NewComment, NewGroup, NewPost,
    NewUser, Post, PostChanges, PostFilter, PostId, User, UserId,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct MemoryState {
    last_user_id: UserId,
    last_group_id: GroupId,
    last_post_id: PostId,
    last_comment_id: CommentId,
    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
    posts: BTreeMap<PostId, Post>,
    comments: BTreeMap<CommentId, Comment>,
    follows: BTreeMap<(UserId, UserId), Follow>,
}

impl MemoryState {
    fn require_user(&self, user_id: UserId) -> Result<()> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("user {}", user_id)))
        }
    }

    fn require_group(&self, group_id: Option<GroupId>) -> Result<()> {
        match group_id {
            Some(id) if !self.groups.contains_key(&id) => {
                Err(AppError::NotFound(format!("group {}", id)))
            }
            _ => Ok(()),
        }
    }

    fn followees_of(&self, user_id: UserId) -> HashSet<UserId> {
        self.follows
            .keys()
            .filter(|(follower, _)| *follower == user_id)
            .map(|(_, followee)| *followee)
            .collect()
    }
}

fn next_id(last: &mut i64) -> i64 {
    *last += 1;
    *last
}

#[derive(Default)]
pub struct MemoryContentRepository {
    state: RwLock<MemoryState>,
}

impl MemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "username {} is taken",
                user.username
            )));
        }

        let id = next_id(&mut state.last_user_id);
        let created = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        let mut state = self.state.write().await;
        if state.groups.values().any(|g| g.slug == group.slug) {
            return Err(AppError::Conflict(format!("slug {} is taken", group.slug)));
        }

        let id = next_id(&mut state.last_group_id);
        let created = Group {
            id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        state.groups.insert(id, created.clone());
        Ok(created)
    }

    async fn get_group(&self, group_id: GroupId) -> Result<Option<Group>> {
        Ok(self.state.read().await.groups.get(&group_id).cloned())
    }

    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let mut state = self.state.write().await;
        state.require_user(post.author_id)?;
        state.require_group(post.group_id)?;
        if post.text.trim().is_empty() {
            return Err(AppError::Validation("post text is required".into()));
        }

        let id = next_id(&mut state.last_post_id);
        let now = Utc::now();
        let created = Post {
            id,
            text: post.text,
            image: post.image,
            author_id: post.author_id,
            group_id: post.group_id,
            created_at: now,
            updated_at: now,
        };
        state.posts.insert(id, created.clone());

        debug!(post_id = id, author_id = created.author_id, "Created post in memory");
        Ok(created)
    }

    async fn get_post(&self, post_id: PostId) -> Result<Option<Post>> {
        Ok(self.state.read().await.posts.get(&post_id).cloned())
    }

    async fn update_post(
        &self,
        post_id: PostId,
        author_id: UserId,
        changes: PostChanges,
    ) -> Result<Option<Post>> {
        let mut state = self.state.write().await;
        state.require_group(changes.group_id)?;

        let Some(post) = state
            .posts
            .get_mut(&post_id)
            .filter(|p| p.author_id == author_id)
        else {
            return Ok(None);
        };

        post.text = changes.text;
        post.group_id = changes.group_id;
        if let Some(image) = changes.image {
            post.image = Some(image);
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: PostId, author_id: UserId) -> Result<bool> {
        let mut state = self.state.write().await;
        let owned = state
            .posts
            .get(&post_id)
            .map(|p| p.author_id == author_id)
            .unwrap_or(false);
        if !owned {
            return Ok(false);
        }

        state.posts.remove(&post_id);
        state.comments.retain(|_, c| c.post_id != post_id);
        Ok(true)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Post>, i64)> {
        let state = self.state.read().await;

        let followees = match filter {
            PostFilter::FollowedBy(user_id) => state.followees_of(user_id),
            _ => HashSet::new(),
        };

        let mut matching: Vec<&Post> = state
            .posts
            .values()
            .filter(|p| match filter {
                PostFilter::All => true,
                PostFilter::Group(group_id) => p.group_id == Some(group_id),
                PostFilter::Author(author_id) => p.author_id == author_id,
                PostFilter::FollowedBy(user_id) => {
                    p.author_id != user_id && followees.contains(&p.author_id)
                }
            })
            .collect();

        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let mut state = self.state.write().await;
        state.require_user(comment.author_id)?;
        if !state.posts.contains_key(&comment.post_id) {
            return Err(AppError::NotFound(format!("post {}", comment.post_id)));
        }
        if comment.text.trim().is_empty() {
            return Err(AppError::Validation("comment text is required".into()));
        }

        let id = next_id(&mut state.last_comment_id);
        let created = Comment {
            id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created_at: Utc::now(),
        };
        state.comments.insert(id, created.clone());
        Ok(created)
    }

    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        // BTreeMap iteration is id order, which is creation order
        Ok(state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn create_follow(&self, follower_id: UserId, followee_id: UserId) -> Result<bool> {
        let mut state = self.state.write().await;
        state.require_user(follower_id)?;
        state.require_user(followee_id)?;
        if follower_id == followee_id {
            return Err(AppError::Validation("users cannot follow themselves".into()));
        }

        if state.follows.contains_key(&(follower_id, followee_id)) {
            return Ok(false);
        }

        state.follows.insert(
            (follower_id, followee_id),
            Follow {
                follower_id,
                followee_id,
                created_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn delete_follow(&self, follower_id: UserId, followee_id: UserId) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.follows.remove(&(follower_id, followee_id)).is_some())
    }

    async fn is_following(&self, follower_id: UserId, followee_id: UserId) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.follows.contains_key(&(follower_id, followee_id)))
    }

    async fn follow_stats(&self, user_id: UserId) -> Result<FollowStats> {
        let state = self.state.read().await;
        let mut stats = FollowStats::default();
        for (follower, followee) in state.follows.keys() {
            if *followee == user_id {
                stats.followers += 1;
            }
            if *follower == user_id {
                stats.following += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(repo: &MemoryContentRepository, name: &str) -> User {
        repo.create_user(NewUser {
            username: name.to_string(),
            email: format!("{}@mail.com", name),
            password_hash: "hash".to_string(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let repo = MemoryContentRepository::new();
        user(&repo, "leo").await;
        let err = repo
            .create_user(NewUser {
                username: "leo".into(),
                email: "other@mail.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn follow_pair_is_unique() {
        let repo = MemoryContentRepository::new();
        let a = user(&repo, "a").await;
        let b = user(&repo, "b").await;

        assert!(repo.create_follow(a.id, b.id).await.unwrap());
        assert!(!repo.create_follow(a.id, b.id).await.unwrap());
        assert_eq!(repo.follow_stats(b.id).await.unwrap().followers, 1);
    }

    #[tokio::test]
    async fn deleting_post_removes_its_comments() {
        let repo = MemoryContentRepository::new();
        let a = user(&repo, "a").await;
        let post = repo
            .create_post(NewPost {
                author_id: a.id,
                text: "hello".into(),
                group_id: None,
                image: None,
            })
            .await
            .unwrap();
        repo.create_comment(NewComment {
            post_id: post.id,
            author_id: a.id,
            text: "first".into(),
        })
        .await
        .unwrap();

        assert!(repo.delete_post(post.id, a.id).await.unwrap());
        assert!(repo.list_comments(post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_breaks_timestamp_ties_by_id() {
        let repo = MemoryContentRepository::new();
        let a = user(&repo, "a").await;
        for n in 0..3 {
            repo.create_post(NewPost {
                author_id: a.id,
                text: format!("post {}", n),
                group_id: None,
                image: None,
            })
            .await
            .unwrap();
        }

        let (posts, total) = repo.list_posts(PostFilter::All, 10, 0).await.unwrap();
        assert_eq!(total, 3);
        let ids: Vec<PostId> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
