use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthService;
use crate::config::AdminBootstrap;
use crate::db::repository::{FollowRepository, UserRepository};
use crate::models::user::{
    validate_password, validate_username, LoginRequest, RegisterRequest, UpdateProfileRequest, UserResponse,
    UserSummary,
};
use crate::models::{NotificationVerb, TargetType, User};
use crate::services::NotificationService;
use crate::{AppError, Result};

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    follow_repo: Arc<dyn FollowRepository>,
    notifications: Arc<NotificationService>,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        follow_repo: Arc<dyn FollowRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self { user_repo, follow_repo, notifications }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        self.user_repo.get_user_by_id(user_id).await
    }

    pub async fn require_user(&self, user_id: Uuid) -> Result<User> {
        self.user_repo
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn to_response(&self, user: User) -> Result<UserResponse> {
        let followers = self.follow_repo.get_follower_ids(user.id).await?.len() as u64;
        let following = self.follow_repo.get_following_ids(user.id).await?.len() as u64;
        Ok(UserResponse::new(user, followers, following))
    }

    pub async fn register(&self, request: RegisterRequest, auth_service: &AuthService) -> Result<(UserResponse, String)> {
        request.validate()?;
        validate_username(&request.username)?;
        if request.password != request.password_confirm {
            return Err(AppError::ValidationError("Password fields didn't match.".to_string()));
        }
        validate_password(&request.password, &request.username)?;

        if self.user_repo.get_user_by_username(&request.username).await?.is_some() {
            return Err(AppError::ValidationError("A user with that username already exists.".to_string()));
        }
        if self.user_repo.get_user_by_email(&request.email).await?.is_some() {
            return Err(AppError::ValidationError("A user with that email already exists.".to_string()));
        }

        let password_hash = auth_service.hash_password(&request.password)?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: request.username,
            email: request.email,
            password_hash,
            first_name: request.first_name.unwrap_or_default(),
            last_name: request.last_name.unwrap_or_default(),
            bio: request.bio.unwrap_or_default(),
            profile_picture: request.profile_picture.filter(|p| !p.is_empty()),
            is_active: true,
            is_staff: false,
            groups: Vec::new(),
            date_joined: now,
            updated_at: now,
        };

        let created = self.user_repo.create_user(&user).await?;
        tracing::info!("👤 ACCOUNTS: Registered user {} ({})", created.username, created.id);
        let token = auth_service.generate_token(created.id, &created.username)?;
        Ok((self.to_response(created).await?, token))
    }

    pub async fn login(&self, request: LoginRequest, auth_service: &AuthService) -> Result<(UserResponse, String)> {
        let user = self.authenticate(&request.username, &request.password, auth_service).await?;
        let token = auth_service.generate_token(user.id, &user.username)?;
        tracing::info!("🔑 ACCOUNTS: {} logged in", user.username);
        Ok((self.to_response(user).await?, token))
    }

    /// Credential check shared by the JSON login and the blog's login form.
    pub async fn authenticate(&self, username: &str, password: &str, auth_service: &AuthService) -> Result<User> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AppError::ValidationError("Must include username and password.".to_string()));
        }
        let user = match self.user_repo.get_user_by_username(username.trim()).await? {
            Some(user) if auth_service.verify_password(password, &user.password_hash)? => user,
            _ => {
                tracing::warn!("🔒 ACCOUNTS: Failed login for {}", username);
                return Err(AppError::ValidationError("Invalid credentials".to_string()));
            }
        };
        if !user.is_active {
            return Err(AppError::ValidationError("User account is disabled".to_string()));
        }
        Ok(user)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserResponse> {
        let user = self.require_user(user_id).await?;
        self.to_response(user).await
    }

    pub async fn get_public_profile(&self, user_id: Uuid) -> Result<UserResponse> {
        Ok(self.get_profile(user_id).await?.without_email())
    }

    pub async fn update_profile(&self, user_id: Uuid, request: UpdateProfileRequest) -> Result<UserResponse> {
        request.validate()?;
        let mut user = self.require_user(user_id).await?;

        if let Some(email) = request.email {
            if let Some(existing) = self.user_repo.get_user_by_email(&email).await? {
                if existing.id != user.id {
                    return Err(AppError::ValidationError("A user with that email already exists.".to_string()));
                }
            }
            user.email = email;
        }
        if let Some(first_name) = request.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = request.last_name {
            user.last_name = last_name;
        }
        if let Some(bio) = request.bio {
            user.bio = bio;
        }
        if let Some(picture) = request.profile_picture {
            user.profile_picture = Some(picture).filter(|p| !p.is_empty());
        }

        let updated = self.user_repo.update_user(&user).await?;
        tracing::info!("👤 ACCOUNTS: Profile updated for {}", updated.username);
        self.to_response(updated).await
    }

    pub async fn follow(&self, follower_id: Uuid, target_id: Uuid) -> Result<User> {
        let target = self.require_user(target_id).await?;
        if follower_id == target_id {
            return Err(AppError::ValidationError("You cannot follow yourself.".to_string()));
        }
        if !self.follow_repo.add_follow(follower_id, target_id).await? {
            return Err(AppError::ValidationError(format!("You are already following {}.", target.username)));
        }
        self.notifications
            .notify(target_id, follower_id, NotificationVerb::Follow, TargetType::User, follower_id)
            .await?;
        tracing::info!("➕ ACCOUNTS: {} now follows {}", follower_id, target.username);
        Ok(target)
    }

    pub async fn unfollow(&self, follower_id: Uuid, target_id: Uuid) -> Result<User> {
        let target = self.require_user(target_id).await?;
        if follower_id == target_id {
            return Err(AppError::ValidationError("You cannot unfollow yourself.".to_string()));
        }
        if !self.follow_repo.remove_follow(follower_id, target_id).await? {
            return Err(AppError::ValidationError(format!("You are not following {}.", target.username)));
        }
        tracing::info!("➖ ACCOUNTS: {} unfollowed {}", follower_id, target.username);
        Ok(target)
    }

    pub async fn followers(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        self.require_user(user_id).await?;
        let ids = self.follow_repo.get_follower_ids(user_id).await?;
        Ok(self.user_repo.get_users_by_ids(&ids).await?.iter().map(UserSummary::from).collect())
    }

    pub async fn following(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        self.require_user(user_id).await?;
        let ids = self.follow_repo.get_following_ids(user_id).await?;
        Ok(self.user_repo.get_users_by_ids(&ids).await?.iter().map(UserSummary::from).collect())
    }

    /// Creates the configured staff account, or promotes an existing user of that name.
    pub async fn ensure_staff_user(&self, admin: &AdminBootstrap, auth_service: &AuthService) -> Result<User> {
        if let Some(mut existing) = self.user_repo.get_user_by_username(&admin.username).await? {
            if !existing.is_staff {
                existing.is_staff = true;
                existing = self.user_repo.update_user(&existing).await?;
                tracing::info!("🛡️ ACCOUNTS: Promoted {} to staff", existing.username);
            }
            return Ok(existing);
        }

        validate_username(&admin.username)?;
        if let Some(other) = self.user_repo.get_user_by_email(&admin.email).await? {
            tracing::error!("❌ ACCOUNTS: Staff email {} already belongs to {}", admin.email, other.username);
            return Err(AppError::ValidationError("A user with that email already exists.".to_string()));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: admin.username.clone(),
            email: admin.email.clone(),
            password_hash: auth_service.hash_password(&admin.password)?,
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            profile_picture: None,
            is_active: true,
            is_staff: true,
            groups: Vec::new(),
            date_joined: now,
            updated_at: now,
        };
        let created = self.user_repo.create_user(&user).await?;
        tracing::info!("🛡️ ACCOUNTS: Created staff user {}", created.username);
        Ok(created)
    }
}
