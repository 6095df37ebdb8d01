//! Listings: index, group, profile, follow feed and post detail.
//!
//! All listings are newest first and paginated with [`PageRequest`]; a page
//! past the end is empty rather than an error.

use crate::config::PaginationConfig;
use crate::error::{AppError, Result};
use crate::models::{Comment, Group, Post, PostFilter, PostId, User, UserId};
use crate::repository::ContentRepository;
use crate::services::pagination::{Page, PageRequest};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct GroupListing {
    pub group: Group,
    pub posts: Page<Post>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub author: User,
    /// Whether the viewer follows `author`; false for anonymous viewers
    pub following: bool,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts: Page<Post>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub author: User,
    pub author_post_count: u64,
    pub comments: Vec<Comment>,
}

#[derive(Clone)]
pub struct FeedService {
    repo: Arc<dyn ContentRepository>,
    pagination: PaginationConfig,
}

impl FeedService {
    pub fn new(repo: Arc<dyn ContentRepository>, pagination: PaginationConfig) -> Self {
        Self { repo, pagination }
    }

    /// All posts
    pub async fn index(&self, page: Option<u32>) -> Result<Page<Post>> {
        let request = self.request(page, self.pagination.page_size)?;
        self.list(PostFilter::All, request).await
    }

    /// Posts of one group; `NotFound` for an unknown slug
    pub async fn group_posts(&self, slug: &str, page: Option<u32>) -> Result<GroupListing> {
        let group = self
            .repo
            .get_group_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("group '{}'", slug)))?;

        let request = self.request(page, self.pagination.page_size)?;
        let posts = self.list(PostFilter::Group(group.id), request).await?;
        Ok(GroupListing { group, posts })
    }

    /// Author page with follow state relative to `viewer`
    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<UserId>,
        page: Option<u32>,
    ) -> Result<ProfileView> {
        let author = self.require_author(username).await?;

        let request = self.request(page, self.pagination.profile_page_size)?;
        let posts = self.list(PostFilter::Author(author.id), request).await?;

        let following = match viewer {
            Some(viewer_id) if viewer_id != author.id => {
                self.repo.is_following(viewer_id, author.id).await?
            }
            _ => false,
        };
        let stats = self.repo.follow_stats(author.id).await?;

        Ok(ProfileView {
            author,
            following,
            followers_count: stats.followers,
            following_count: stats.following,
            posts,
        })
    }

    /// Posts by everyone `user_id` follows. Own posts never appear.
    pub async fn follow_feed(&self, user_id: UserId, page: Option<u32>) -> Result<Page<Post>> {
        let request = self.request(page, self.pagination.page_size)?;
        self.list(PostFilter::FollowedBy(user_id), request).await
    }

    /// One post with its comments; the post must be authored by `username`
    pub async fn post_detail(&self, username: &str, post_id: PostId) -> Result<PostDetail> {
        let author = self.require_author(username).await?;

        let post = self
            .repo
            .get_post(post_id)
            .await?
            .filter(|post| post.author_id == author.id)
            .ok_or_else(|| {
                AppError::NotFound(format!("post {} by '{}'", post_id, username))
            })?;

        let (_, author_post_count) = self
            .repo
            .list_posts(PostFilter::Author(author.id), 0, 0)
            .await?;
        let comments = self.repo.list_comments(post.id).await?;

        Ok(PostDetail {
            post,
            author,
            author_post_count: author_post_count.max(0) as u64,
            comments,
        })
    }

    fn request(&self, page: Option<u32>, page_size: u32) -> Result<PageRequest> {
        PageRequest::new(page, page_size, self.pagination.max_page_size)
    }

    async fn list(&self, filter: PostFilter, request: PageRequest) -> Result<Page<Post>> {
        let (posts, count) = self
            .repo
            .list_posts(filter, request.limit(), request.offset())
            .await?;

        debug!(
            ?filter,
            page = request.page,
            returned = posts.len(),
            total = count,
            "Listing assembled"
        );
        Ok(Page::new(posts, count, request))
    }

    async fn require_author(&self, username: &str) -> Result<User> {
        self.repo
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))
    }
}
