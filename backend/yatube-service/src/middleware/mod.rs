/// Request identity extraction
///
/// Authentication happens upstream; the gateway forwards the authenticated
/// user id in the `x-user-id` header. Handlers take [`UserId`] when a caller
/// must be identified and [`MaybeUserId`] when anonymous access is allowed.
use crate::error::AppError;
use crate::models;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::{ready, Ready};

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub models::UserId);

/// Caller that may be anonymous
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaybeUserId(pub Option<models::UserId>);

fn header_user_id(req: &HttpRequest) -> Result<Option<models::UserId>, AppError> {
    let header_value = match req.headers().get(USER_ID_HEADER) {
        Some(value) => value,
        None => return Ok(None),
    };

    let value = header_value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid x-user-id header".into()))?;

    value
        .trim()
        .parse::<models::UserId>()
        .map(Some)
        .map_err(|_| AppError::Unauthorized("Invalid x-user-id header value".into()))
}

impl FromRequest for UserId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(header_user_id(req).and_then(|id| {
            id.map(UserId)
                .ok_or_else(|| AppError::Unauthorized("Missing x-user-id header".into()))
        }))
    }
}

impl FromRequest for MaybeUserId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(header_user_id(req).map(MaybeUserId))
    }
}
