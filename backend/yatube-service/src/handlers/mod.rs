/// HTTP handlers for yatube-service
///
/// This module contains handlers for:
/// - Posts: create, read, update, delete with optional base64 image
/// - Comments: list and add comments on a post
/// - Listings: index, group, profile, follow feed and post detail
/// - Follow: follow and unfollow authors
/// - Auth: account sign-up
/// - Health: liveness and readiness probes
pub mod auth;
pub mod comments;
pub mod follow;
pub mod health;
pub mod listings;
pub mod posts;

use crate::cache::ListingCache;
use crate::config::PaginationConfig;
use crate::repository::ContentRepository;
use crate::services::{
    CommentService, FeedService, FollowService, MediaStorage, PostService, UserService,
};
use actix_web::web;
use serde::Deserialize;
use std::sync::Arc;

/// Shared state handed to every handler through `web::Data`
pub struct AppState {
    pub repo: Arc<dyn ContentRepository>,
    pub cache: Arc<ListingCache>,
    pub posts: PostService,
    pub comments: CommentService,
    pub feed: FeedService,
    pub follow: FollowService,
    pub users: UserService,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn ContentRepository>,
        cache: Arc<ListingCache>,
        media: MediaStorage,
        max_upload_bytes: usize,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            posts: PostService::new(repo.clone(), media, max_upload_bytes, cache.clone()),
            comments: CommentService::new(repo.clone()),
            feed: FeedService::new(repo.clone(), pagination),
            follow: FollowService::new(repo.clone(), cache.clone()),
            users: UserService::new(repo.clone()),
            repo,
            cache,
        }
    }
}

/// `?page=` query. Anything that is not a positive integer means page 1.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .unwrap_or(1)
            .max(1)
    }
}

/// Register all `/api/v1` routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health::health))
            .route("/health/live", web::get().to(health::liveness))
            .route("/health/ready", web::get().to(health::readiness))
            .route("/auth/signup", web::post().to(auth::signup))
            .service(
                web::resource("/posts")
                    .route(web::get().to(listings::index))
                    .route(web::post().to(posts::create_post)),
            )
            .service(
                web::resource("/posts/{post_id}")
                    .route(web::get().to(posts::get_post))
                    .route(web::put().to(posts::update_post))
                    .route(web::patch().to(posts::partial_update_post))
                    .route(web::delete().to(posts::delete_post)),
            )
            .service(
                web::resource("/posts/{post_id}/comments")
                    .route(web::get().to(comments::list_comments))
                    .route(web::post().to(comments::add_comment)),
            )
            .route("/groups/{slug}/posts", web::get().to(listings::group_posts))
            .route("/profiles/{username}", web::get().to(listings::profile))
            .route(
                "/profiles/{username}/posts/{post_id}",
                web::get().to(listings::post_detail),
            )
            .service(
                web::resource("/profiles/{username}/follow")
                    .route(web::post().to(follow::follow))
                    .route(web::delete().to(follow::unfollow)),
            )
            .route("/follow", web::get().to(listings::follow_feed)),
    );
}
