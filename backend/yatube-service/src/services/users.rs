/// User registration and lookup
use crate::error::{AppError, Result};
use crate::models::{NewUser, User};
use crate::repository::ContentRepository;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::info;
use validator::{Validate, ValidationError};

#[derive(Clone, Deserialize, Validate)]
pub struct SignupForm {
    #[validate(
        length(min = 1, max = 150),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Letters, digits and `@ . + - _` only
fn validate_username(username: &str) -> std::result::Result<(), ValidationError> {
    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("username_charset"))
    }
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(rand::thread_rng());

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AppError::Internal("Failed to hash password".to_string()))
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn ContentRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }

    /// Create an account; `Conflict` when the username is taken
    pub async fn register(&self, form: SignupForm) -> Result<User> {
        let form = SignupForm {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password,
        };
        form.validate()?;

        if self.repo.get_user_by_username(&form.username).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "username '{}' is already taken",
                form.username
            )));
        }

        let password_hash = hash_password(&form.password)?;
        let user = self
            .repo
            .create_user(NewUser {
                username: form.username,
                email: form.email,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        self.repo
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))
    }
}
