pub mod jwt;
pub mod middleware;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::JwtService;
use crate::{AppError, Result};

/// Token payload. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }
}

pub struct AuthService {
    jwt: JwtService,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(jwt_secret: String, token_ttl_hours: i64) -> Self {
        Self {
            jwt: JwtService::new(jwt_secret),
            token_ttl: Duration::hours(token_ttl_hours),
        }
    }

    pub fn generate_token(&self, user_id: Uuid, username: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        self.jwt.encode_token(&claims)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        self.jwt.decode_token(token)
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
    }

    /// A malformed stored hash verifies as false rather than erroring.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Stored password hash could not be parsed: {}", e);
                return Ok(false);
            }
        };
        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let auth = AuthService::new("secret".to_string(), 1);
        let user_id = Uuid::new_v4();
        let token = auth.generate_token(user_id, "alice").unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.user_id(), user_id);
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issuer = AuthService::new("one".to_string(), 1);
        let verifier = AuthService::new("two".to_string(), 1);
        let token = issuer.generate_token(Uuid::new_v4(), "bob").unwrap();
        assert!(matches!(verifier.verify_token(&token), Err(AppError::AuthError(_))));
    }

    #[test]
    fn test_password_hashing() {
        let auth = AuthService::new("secret".to_string(), 1);
        let hash = auth.hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(auth.verify_password("correct horse", &hash).unwrap());
        assert!(!auth.verify_password("wrong horse", &hash).unwrap());
        assert!(!auth.verify_password("anything", "not-a-hash").unwrap());
    }
}
