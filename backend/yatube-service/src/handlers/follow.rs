use crate::error::Result;
use crate::handlers::AppState;
use crate::middleware::UserId;
use actix_web::{web, HttpResponse};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub username: String,
    pub following: bool,
    /// Whether this request changed the follow graph
    pub changed: bool,
}

/// Follow an author. Repeated follows and self-follows succeed without effect.
pub async fn follow(
    state: web::Data<AppState>,
    user_id: UserId,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let author = state.users.get_by_username(&username).await?;
    let changed = state.follow.follow(user_id.0, author.id).await?;

    Ok(HttpResponse::Ok().json(FollowResponse {
        following: state.follow.is_following(user_id.0, author.id).await?,
        username: author.username,
        changed,
    }))
}

/// Unfollow an author; a no-op when not following
pub async fn unfollow(
    state: web::Data<AppState>,
    user_id: UserId,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let author = state.users.get_by_username(&username).await?;
    let changed = state.follow.unfollow(user_id.0, author.id).await?;

    Ok(HttpResponse::Ok().json(FollowResponse {
        username: author.username,
        following: false,
        changed,
    }))
}
