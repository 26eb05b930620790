use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::{user, UserRole};
use crate::errors::ServiceError;

/// Claims carried by the session cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // user id
    pub role: UserRole,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

/// Claims of an emailed password reset link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetClaims {
    pub reset_password: i32,
    pub exp: i64,
}

/// Issues and verifies HS256 tokens signed with the application secret
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    session_ttl_secs: i64,
    reset_ttl_secs: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("reset_ttl_secs", &self.reset_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, session_ttl_secs: u64, reset_ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            session_ttl_secs: session_ttl_secs as i64,
            reset_ttl_secs: reset_ttl_secs as i64,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(&cfg.secret_key, cfg.session_ttl_secs, cfg.reset_token_ttl_secs)
    }

    pub fn issue_session(&self, user: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.id.to_string(),
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.session_ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ServiceError::JwtError(e.to_string()))
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, ServiceError> {
        self.decode::<SessionClaims>(token)
    }

    pub fn issue_reset_token(&self, user_id: i32) -> Result<String, ServiceError> {
        let claims = ResetClaims {
            reset_password: user_id,
            exp: Utc::now().timestamp() + self.reset_ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ServiceError::JwtError(e.to_string()))
    }

    /// Returns the user id named by a valid, unexpired reset token
    pub fn verify_reset_token(&self, token: &str) -> Result<i32, ServiceError> {
        self.decode::<ResetClaims>(token)
            .map(|claims| claims.reset_password)
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, token: &str) -> Result<T, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<T>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ServiceError::JwtError("token expired".into()),
                _ => ServiceError::JwtError("invalid token".into()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn user() -> user::Model {
        user::Model {
            id: 7,
            username: "amina".into(),
            email: "amina@lab.test".into(),
            password_hash: String::new(),
            role: UserRole::Staff,
            is_active: true,
            last_seen: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn session_round_trip() {
        let tokens = TokenService::new("unit-test-secret", 3600, 600);
        let token = tokens.issue_session(&user()).unwrap();
        let claims = tokens.verify_session(&token).unwrap();
        assert_eq!(claims.user_id(), Some(7));
        assert_eq!(claims.role, UserRole::Staff);
    }

    #[test]
    fn tokens_from_other_secret_are_rejected() {
        let ours = TokenService::new("unit-test-secret", 3600, 600);
        let theirs = TokenService::new("someone-else", 3600, 600);
        let token = theirs.issue_reset_token(7).unwrap();
        assert_matches!(ours.verify_reset_token(&token), Err(ServiceError::JwtError(_)));
    }

    #[test]
    fn reset_token_names_user() {
        let tokens = TokenService::new("unit-test-secret", 3600, 600);
        let token = tokens.issue_reset_token(42).unwrap();
        assert_eq!(tokens.verify_reset_token(&token).unwrap(), 42);
    }

    #[test]
    fn expired_reset_token_is_rejected() {
        let tokens = TokenService::new("unit-test-secret", 3600, 600);
        let claims = ResetClaims {
            reset_password: 42,
            exp: Utc::now().timestamp() - 60,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &tokens.encoding).unwrap();
        assert_matches!(
            tokens.verify_reset_token(&token),
            Err(ServiceError::JwtError(msg)) if msg == "token expired"
        );
    }

    #[test]
    fn session_token_is_not_a_reset_token() {
        let tokens = TokenService::new("unit-test-secret", 3600, 600);
        let session = tokens.issue_session(&user()).unwrap();
        assert!(tokens.verify_reset_token(&session).is_err());
    }
}
