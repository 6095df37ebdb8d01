use crate::error::Result;
use crate::handlers::AppState;
use crate::middleware::UserId;
use crate::models::PostId;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

/// Comments of a post, oldest first
pub async fn list_comments(
    state: web::Data<AppState>,
    post_id: web::Path<PostId>,
) -> Result<HttpResponse> {
    let comments = state.comments.post_comments(post_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comments))
}

pub async fn add_comment(
    state: web::Data<AppState>,
    user_id: UserId,
    post_id: web::Path<PostId>,
    req: web::Json<CommentRequest>,
) -> Result<HttpResponse> {
    let comment = state
        .comments
        .create_comment(user_id.0, post_id.into_inner(), &req.text)
        .await?;
    Ok(HttpResponse::Created().json(comment))
}
