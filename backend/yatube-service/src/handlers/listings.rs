/// Listing handlers: index, group, profile, follow feed and post detail
///
/// Index, group and profile pages are served through the listing cache as
/// pre-serialized JSON. The follow feed is per user and always computed.
use crate::cache::{ListingCache, ListingKey};
use crate::error::{AppError, Result};
use crate::handlers::{AppState, PageQuery};
use crate::middleware::{MaybeUserId, UserId};
use crate::models::PostId;
use actix_web::{web, HttpResponse};
use bytes::Bytes;
use serde::Serialize;
use std::future::Future;

async fn cached_json<T, F, Fut>(
    cache: &ListingCache,
    key: String,
    load: F,
) -> Result<HttpResponse>
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let body = cache
        .get_or_load(key, || async move {
            let value = load().await?;
            Ok::<_, AppError>(Bytes::from(serde_json::to_vec(&value)?))
        })
        .await?;

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

/// All posts, newest first
pub async fn index(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = query.page();
    cached_json(&state.cache, ListingKey::index(page), || {
        state.feed.index(Some(page))
    })
    .await
}

pub async fn group_posts(
    state: web::Data<AppState>,
    slug: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let slug = slug.into_inner();
    let page = query.page();
    cached_json(&state.cache, ListingKey::group(&slug, page), || {
        state.feed.group_posts(&slug, Some(page))
    })
    .await
}

/// Author page; follow state depends on the viewer, so the viewer is part of the cache key
pub async fn profile(
    state: web::Data<AppState>,
    viewer: MaybeUserId,
    username: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let username = username.into_inner();
    let page = query.page();
    cached_json(
        &state.cache,
        ListingKey::profile(&username, viewer.0, page),
        || state.feed.profile(&username, viewer.0, Some(page)),
    )
    .await
}

pub async fn post_detail(
    state: web::Data<AppState>,
    path: web::Path<(String, PostId)>,
) -> Result<HttpResponse> {
    let (username, post_id) = path.into_inner();
    let detail = state.feed.post_detail(&username, post_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Posts by authors the caller follows
pub async fn follow_feed(
    state: web::Data<AppState>,
    user_id: UserId,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let feed = state.feed.follow_feed(user_id.0, Some(query.page())).await?;
    Ok(HttpResponse::Ok().json(feed))
}
