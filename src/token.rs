//! Manage json web tokens.

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::{Role, User};

/// Default token lifetime in seconds (24 hours).
pub const DEFAULT_LIFETIME: u64 = 60 * 60 * 24;

/// Decode failures, distinguished so callers can tell "session expired"
/// from "please log in again".
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Pieces of information asserted on a session token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    /// Expiration time, seconds since the Unix epoch.
    pub exp: u64,
}

/// Manage JWT tokens.
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: u64,
}

impl TokenManager {
    /// Create a new [`TokenManager`] signing with `secret`.
    pub fn new(secret: &str, lifetime: Option<u64>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: lifetime.unwrap_or(DEFAULT_LIFETIME),
        }
    }

    /// Create a new signed bearer token for `user`.
    pub fn create(&self, user: &User) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            exp: Utc::now().timestamp() as u64 + self.lifetime,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| TokenError::Invalid)
    }

    /// Decode and check a token.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "alice@tiffin.dev".into(),
            role: Role::MessOwner,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_decode() {
        let manager = TokenManager::new("test-secret", None);
        let user = user();

        let token = manager.create(&user).unwrap();
        let claims = manager.decode(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, Role::MessOwner);
        assert!(claims.exp > Utc::now().timestamp() as u64);
    }

    #[test]
    fn test_decode_rejects_other_secret() {
        let token = TokenManager::new("test-secret", None)
            .create(&user())
            .unwrap();

        assert_eq!(
            TokenManager::new("another-secret", None).decode(&token),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_decode_rejects_malformed_token() {
        let manager = TokenManager::new("test-secret", None);
        assert_eq!(manager.decode("not-a-token"), Err(TokenError::Invalid));
    }

    #[test]
    fn test_decode_distinguishes_expired() {
        let manager = TokenManager::new("test-secret", None);
        let user = user();

        // Encode an already-dead token by hand: expiry far enough in the
        // past to clear the default decoding leeway.
        let claims = Claims {
            sub: user.id,
            email: user.email,
            role: user.role,
            exp: (Utc::now().timestamp() - 3600) as u64,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(manager.decode(&token), Err(TokenError::Expired));
    }
}
