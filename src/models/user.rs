use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub profile_picture: Option<String>,
    pub is_active: bool,
    /// Staff users hold every bookshelf permission and may manage groups.
    pub is_staff: bool,
    pub groups: Vec<String>,
    pub date_joined: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150))]
    #[serde(deserialize_with = "crate::models::trimmed")]
    pub username: String,
    #[validate(email)]
    #[serde(deserialize_with = "crate::models::trimmed")]
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[validate(length(max = 30))]
    #[serde(default, deserialize_with = "crate::models::trimmed_opt")]
    pub first_name: Option<String>,
    #[validate(length(max = 30))]
    #[serde(default, deserialize_with = "crate::models::trimmed_opt")]
    pub last_name: Option<String>,
    #[validate(length(max = 500))]
    #[serde(default, deserialize_with = "crate::models::trimmed_opt")]
    pub bio: Option<String>,
    #[validate(length(max = 255))]
    #[serde(default, deserialize_with = "crate::models::trimmed_opt")]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Profile edits. `id`, `username` and `date_joined` are read-only and ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(email)]
    #[serde(default, deserialize_with = "crate::models::trimmed_opt")]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    #[serde(default, deserialize_with = "crate::models::trimmed_opt")]
    pub first_name: Option<String>,
    #[validate(length(max = 30))]
    #[serde(default, deserialize_with = "crate::models::trimmed_opt")]
    pub last_name: Option<String>,
    #[validate(length(max = 500))]
    #[serde(default, deserialize_with = "crate::models::trimmed_opt")]
    pub bio: Option<String>,
    #[validate(length(max = 255))]
    #[serde(default, deserialize_with = "crate::models::trimmed_opt")]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub profile_picture: Option<String>,
    pub followers_count: u64,
    pub following_count: u64,
    pub date_joined: DateTime<Utc>,
}

impl UserResponse {
    pub fn new(user: User, followers_count: u64, following_count: u64) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: Some(user.email),
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            profile_picture: user.profile_picture,
            followers_count,
            following_count,
            date_joined: user.date_joined,
        }
    }

    /// Public view of another user's profile.
    pub fn without_email(mut self) -> Self {
        self.email = None;
        self
    }
}

/// Compact author reference embedded in posts and comments.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self { id: user.id, username: user.username.clone() }
    }
}

/// Actor reference embedded in notifications.
#[derive(Debug, Clone, Serialize)]
pub struct ActorSummary {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for ActorSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Usernames allow letters, digits and `@ . + - _`.
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() || username.chars().count() > 150 {
        return Err(AppError::ValidationError("Username must be between 1 and 150 characters".to_string()));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || "@.+-_".contains(c)) {
        return Err(AppError::ValidationError(
            "Username may contain only letters, numbers, and @/./+/-/_ characters".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str, username: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::ValidationError(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::ValidationError("This password is entirely numeric.".to_string()));
    }
    if !username.is_empty() && password.to_lowercase().contains(&username.to_lowercase()) {
        return Err(AppError::ValidationError("The password is too similar to the username.".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("a.b+c-d@e").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(151)).is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("s3cure-pass", "alice").is_ok());
        assert!(validate_password("short1", "alice").is_err());
        assert!(validate_password("1234567890", "alice").is_err());
        assert!(validate_password("alice-is-great", "alice").is_err());
    }

    #[test]
    fn test_register_request_validation() {
        let request = RegisterRequest {
            username: "bob".to_string(),
            email: "not-an-email".to_string(),
            password: "pw".to_string(),
            password_confirm: "pw".to_string(),
            first_name: None,
            last_name: None,
            bio: Some("b".repeat(501)),
            profile_picture: None,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("bio"));
    }
}
