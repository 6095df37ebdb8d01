/// Post handlers - REST endpoints for post CRUD
use crate::error::{AppError, Result};
use crate::handlers::AppState;
use crate::middleware::UserId;
use crate::models::{GroupId, PostId};
use crate::services::{ImageUpload, PostForm};
use actix_web::{web, HttpResponse};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer};

/// Image carried inline in a JSON body
#[derive(Debug, Deserialize)]
pub struct ImagePayload {
    pub filename: String,
    /// Standard base64 of the file contents
    pub data: String,
}

impl ImagePayload {
    pub fn decode(self) -> Result<ImageUpload> {
        let data = STANDARD.decode(self.data.trim()).map_err(|_| {
            AppError::InvalidImage(format!("{}: image data is not valid base64", self.filename))
        })?;
        Ok(ImageUpload {
            filename: self.filename,
            data,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub image: Option<ImagePayload>,
}

impl PostRequest {
    fn into_form(self) -> Result<PostForm> {
        Ok(PostForm {
            text: self.text,
            group_id: self.group_id,
            image: self.image.map(ImagePayload::decode).transpose()?,
        })
    }
}

/// PATCH body; absent fields keep their stored values, `"group_id": null` clears the group
#[derive(Debug, Deserialize)]
pub struct PatchPostRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub group_id: Option<Option<GroupId>>,
    #[serde(default)]
    pub image: Option<ImagePayload>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Option<GroupId>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<GroupId>::deserialize(deserializer).map(Some)
}

/// Create a new post
pub async fn create_post(
    state: web::Data<AppState>,
    user_id: UserId,
    req: web::Json<PostRequest>,
) -> Result<HttpResponse> {
    let form = req.into_inner().into_form()?;
    let post = state.posts.create_post(user_id.0, form).await?;
    Ok(HttpResponse::Created().json(post))
}

/// Get a post by ID
pub async fn get_post(
    state: web::Data<AppState>,
    post_id: web::Path<PostId>,
) -> Result<HttpResponse> {
    let post = state.posts.get_post(post_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Replace text and group of a post
pub async fn update_post(
    state: web::Data<AppState>,
    user_id: UserId,
    post_id: web::Path<PostId>,
    req: web::Json<PostRequest>,
) -> Result<HttpResponse> {
    let form = req.into_inner().into_form()?;
    let post = state
        .posts
        .edit_post(post_id.into_inner(), user_id.0, form)
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Update only the fields present in the body
pub async fn partial_update_post(
    state: web::Data<AppState>,
    user_id: UserId,
    post_id: web::Path<PostId>,
    req: web::Json<PatchPostRequest>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let req = req.into_inner();
    let existing = state.posts.get_post(post_id).await?;

    let form = PostForm {
        text: req.text.unwrap_or(existing.text),
        group_id: req.group_id.unwrap_or(existing.group_id),
        image: req.image.map(ImagePayload::decode).transpose()?,
    };

    let post = state.posts.edit_post(post_id, user_id.0, form).await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Delete a post and its comments
pub async fn delete_post(
    state: web::Data<AppState>,
    user_id: UserId,
    post_id: web::Path<PostId>,
) -> Result<HttpResponse> {
    state
        .posts
        .delete_post(post_id.into_inner(), user_id.0)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
