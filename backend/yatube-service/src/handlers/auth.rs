use crate::error::Result;
use crate::handlers::AppState;
use crate::services::SignupForm;
use actix_web::{web, HttpResponse};

/// Register a new account
pub async fn signup(
    state: web::Data<AppState>,
    payload: web::Json<SignupForm>,
) -> Result<HttpResponse> {
    let user = state.users.register(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}
