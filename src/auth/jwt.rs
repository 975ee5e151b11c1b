// JWT token handling (HS256)
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::Claims;
use crate::{AppError, Result};

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn encode_token(&self, claims: &Claims) -> Result<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to encode token: {}", e)))
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::AuthError("Token has expired".to_string()),
                _ => AppError::AuthError("Invalid token".to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtService::new("secret".to_string());
        let issued = Utc::now().timestamp() - 7200;
        let claims = Claims { sub: Uuid::new_v4(), username: "old".to_string(), iat: issued, exp: issued + 60 };
        let token = service.encode_token(&claims).unwrap();
        match service.decode_token(&token) {
            Err(AppError::AuthError(msg)) => assert_eq!(msg, "Token has expired"),
            other => panic!("expected expiry error, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_rejected() {
        let service = JwtService::new("secret".to_string());
        assert!(service.decode_token("not.a.jwt").is_err());
    }
}
